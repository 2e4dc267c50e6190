//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod assign;
pub mod init;
pub mod list;
pub mod restore;
pub mod watch;

pub use assign::run_assign;
pub use init::{run_config, run_init};
pub use list::run_list;
pub use restore::run_restore;
pub use watch::run_watch;
