//! Concurrent actor model over a shared registry of live files
//!
//! - [`registry`]: the lock-protected set of names eligible for claiming
//! - [`actor`]: the generic actor loop and the five actor behaviours
//! - [`controller`]: spawning, timing and tearing down a run
//! - [`report`]: operation counters and the final run report

pub mod actor;
pub mod controller;
pub mod error;
pub mod names;
pub mod registry;
pub mod report;

pub use actor::{Actor, ActorContext, ActorKind, CycleOutcome};
pub use controller::{Simulation, SimulationState};
pub use error::{ActorError, SimulationError};
pub use names::NameGenerator;
pub use registry::Registry;
pub use report::{OperationCounts, OperationStats, SimulationReport, StopReason, TeardownSummary};
