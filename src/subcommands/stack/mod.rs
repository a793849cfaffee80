//! Subcommands pertaining to stack management.

mod create;
pub use create::CreateCmd;

mod track;
pub use track::{TrackCmd, UntrackCmd};

mod restack;
pub use restack::{AbortCmd, ContinueCmd, RestackCmd};

mod commit;
pub use commit::{AddCmd, CommitCmd, SquashCmd};

mod reparent;
pub use reparent::MoveCmd;

mod delete;
pub use delete::{DeleteCmd, UnbranchCmd};

mod rename;
pub use rename::RenameCmd;
