pub mod commands;
pub mod output;

pub use commands::{CliArgs, Commands, RunArgs, SweepArgs};
pub use output::{OutputFormat, OutputFormatter};
