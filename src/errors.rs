//! Errors for the `stk` engine.

use crate::continuation::ContinuationFrame;
use nu_ansi_term::Color;
use thiserror::Error;

/// The error taxonomy of the `stk` engine.
#[derive(Error, Debug)]
pub enum StError {
    /// A precondition the caller should have ensured does not hold.
    #[error("{}", .0)]
    PreconditionsFailed(String),
    /// A stack operation was attempted while a restack is paused.
    #[error(
        "A restack is paused on a conflict. Resolve it and run `{}`, or run `{}` to give up.",
        Color::Green.paint("stk continue"),
        Color::Red.paint("stk abort")
    )]
    BlockedDuringRebase,
    /// The backend stopped on a conflict. The frame needed to resume has been persisted.
    #[error(
        "Hit a conflict while restacking `{}`. Resolve the conflicts, stage them with `git add`, then run `{}`.",
        Color::Blue.paint(.0.current_branch().unwrap_or_default()),
        Color::Green.paint("stk continue")
    )]
    RebaseConflict(ContinuationFrame),
    /// The branch has no metadata in the store.
    #[error("Branch `{}` is not tracked with `stk`. Track it first with `stk track`.", Color::Blue.paint(.0))]
    UntrackedBranch(String),
    /// The backend failed in a way that is not a conflict.
    #[error("git failed: {}", .0)]
    ExitFailed(String),
    /// A [git2::Error] occurred.
    #[error("libgit2 error: {}", .0)]
    Git2Error(#[from] git2::Error),
    /// An [std::io::Error] occurred.
    #[error("io error: {}", .0)]
    IoError(#[from] std::io::Error),
    /// A persisted file could not be decoded.
    #[error("failed to decode persisted state: {}", .0)]
    DecodeError(#[from] toml::de::Error),
    /// State could not be encoded for persistence.
    #[error("failed to encode state: {}", .0)]
    EncodeError(#[from] toml::ser::Error),
    /// An [inquire::InquireError] occurred.
    #[error("inquire error: {}", .0)]
    InquireError(#[from] inquire::InquireError),
}

impl StError {
    /// Returns `true` if the error is a resumable conflict rather than a failure.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::RebaseConflict(_))
    }

    /// Shorthand for [StError::PreconditionsFailed].
    pub(crate) fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionsFailed(msg.into())
    }
}

/// A [Result] with [StError] as the error type.
pub type StResult<T> = Result<T, StError>;
