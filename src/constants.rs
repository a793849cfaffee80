//! Constants for the `stk` application.

use nu_ansi_term::Color;

/// Branch metadata store, relative to the git directory.
pub(crate) const STK_STORE_FILE_NAME: &str = ".stk_store.toml";
/// Repository configuration, relative to the git directory.
pub(crate) const STK_CONFIG_FILE_NAME: &str = ".stk_config.toml";
/// Paused operation, relative to the git directory. Absent when nothing is paused.
pub(crate) const STK_CONTINUATION_FILE_NAME: &str = ".stk_continuation.toml";

/// Remote used when the config does not name one.
pub(crate) const DEFAULT_REMOTE: &str = "origin";

pub(crate) const COLORS: [Color; 6] = [
    Color::Blue,
    Color::Cyan,
    Color::Green,
    Color::Red,
    Color::Yellow,
    Color::Purple,
];

pub(crate) const FILLED_CIRCLE: char = '●';
pub(crate) const EMPTY_CIRCLE: char = '○';
pub(crate) const BOTTOM_LEFT_BOX: char = '└';
pub(crate) const LEFT_FORK_BOX: char = '├';
pub(crate) const VERTICAL_BOX: char = '│';
pub(crate) const HORIZONTAL_BOX: char = '─';
