//! Command line interface

pub mod dump;
pub mod error;
pub mod progress;

pub use dump::{run_dump, Cli, DumpSummary};
pub use error::CliError;
pub use progress::SpinnerProgress;
