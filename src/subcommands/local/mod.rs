//! Subcommands that read or configure local state without rewriting history.

mod init;
pub use init::InitCmd;

mod log;
pub use log::LogCmd;

mod status;
pub use status::StatusCmd;

mod checkout;
pub use checkout::CheckoutCmd;

mod metaedit;
pub use metaedit::MetaeditCmd;
