//! Subcommands that talk to the remote.

mod submit_status;
pub use submit_status::SubmitStatusCmd;
