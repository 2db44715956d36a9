//! fsload - concurrent filesystem load generator
//!
//! Runs a fixed population of asynchronous actors against a single target
//! directory for a bounded time. Each actor repeatedly performs one kind of
//! file operation on randomly chosen files, coordinating through a shared
//! registry of live file names so that no two actors touch the same file at
//! once. When the run ends every file it produced is removed.
//!
//! # Core Concepts
//!
//! - **Registry**: the lock-protected set of names currently at rest and
//!   eligible for claiming
//! - **Claim**: removing a name from the registry, which grants the claimant
//!   exclusive use of the file until it releases or retires the name
//! - **Actors**: creators, deleters, metadata mutators, readers and writers,
//!   each sleeping a jittered period between cycles
//!
//! # Example Usage
//!
//! ```no_run
//! use fsload::{Simulation, SimulationConfig};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), fsload::SimulationError> {
//! let mut config = SimulationConfig::new("/mnt/scratch");
//! config.runtime = Duration::from_secs(60);
//!
//! let report = Simulation::run(config, CancellationToken::new()).await?;
//! println!("Created {} files", report.operations.created);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`config`]: run parameters, defaults and environment overrides
//! - [`fs`]: operations on the target directory
//! - [`simulation`]: registry, actors, controller and report
//! - [`cli`]: argument parsing and output formatting for the binary

pub mod cli;
pub mod config;
pub mod fs;
pub mod simulation;
pub mod util;

pub use config::{
    ActorCounts, ByteRange, ConfigError, Jitter, MetadataReleasePolicy, SimulationConfig,
};
pub use fs::{FsError, TargetDir};
pub use simulation::{
    Actor, ActorContext, ActorError, ActorKind, CycleOutcome, Registry, Simulation,
    SimulationError, SimulationReport, SimulationState, StopReason,
};
pub use util::{init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
