use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::fs::FsError;
use crate::simulation::controller::SimulationState;

/// Errors that end an actor's loop
///
/// Per-cycle failures that the actor can absorb (vanished files, chmod
/// errors, failed creates and writes) never become an `ActorError`.
#[derive(Debug, Error)]
pub enum ActorError {
    /// Reading a claimed file failed
    #[error("Failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The blocking I/O task panicked or was cancelled
    #[error("I/O task failed: {0}")]
    Join(String),
}

/// Errors surfaced by the simulation controller
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Target directory error: {0}")]
    Fs(#[from] FsError),

    #[error("Invalid simulation state transition from {from:?} to {to:?}")]
    InvalidState {
        from: SimulationState,
        to: SimulationState,
    },

    #[error("Failed to change working directory to {path}: {source}")]
    ChangeDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
