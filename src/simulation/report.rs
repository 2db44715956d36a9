//! Run statistics and the final report handed back to callers

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::SimulationConfig;

/// Counters shared by every actor of one simulation
#[derive(Debug, Default)]
pub struct OperationStats {
    created: AtomicU64,
    create_failures: AtomicU64,
    deleted: AtomicU64,
    metadata_changed: AtomicU64,
    reads: AtomicU64,
    bytes_read: AtomicU64,
    read_failures: AtomicU64,
    writes: AtomicU64,
    bytes_written: AtomicU64,
    write_failures: AtomicU64,
    retired: AtomicU64,
    idle_cycles: AtomicU64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl OperationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_created(&self, bytes: u64) {
        bump(&self.created, 1);
        bump(&self.bytes_written, bytes);
    }

    pub fn record_create_failure(&self) {
        bump(&self.create_failures, 1);
    }

    pub fn record_deleted(&self) {
        bump(&self.deleted, 1);
    }

    pub fn record_metadata_changed(&self) {
        bump(&self.metadata_changed, 1);
    }

    pub fn record_read(&self, bytes: u64) {
        bump(&self.reads, 1);
        bump(&self.bytes_read, bytes);
    }

    pub fn record_read_failure(&self) {
        bump(&self.read_failures, 1);
    }

    pub fn record_write(&self, bytes: u64) {
        bump(&self.writes, 1);
        bump(&self.bytes_written, bytes);
    }

    pub fn record_write_failure(&self) {
        bump(&self.write_failures, 1);
    }

    pub fn record_retired(&self) {
        bump(&self.retired, 1);
    }

    pub fn record_idle(&self) {
        bump(&self.idle_cycles, 1);
    }

    pub fn snapshot(&self) -> OperationCounts {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        OperationCounts {
            created: load(&self.created),
            create_failures: load(&self.create_failures),
            deleted: load(&self.deleted),
            metadata_changed: load(&self.metadata_changed),
            reads: load(&self.reads),
            bytes_read: load(&self.bytes_read),
            read_failures: load(&self.read_failures),
            writes: load(&self.writes),
            bytes_written: load(&self.bytes_written),
            write_failures: load(&self.write_failures),
            retired: load(&self.retired),
            idle_cycles: load(&self.idle_cycles),
        }
    }
}

/// Point-in-time copy of [`OperationStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OperationCounts {
    pub created: u64,
    pub create_failures: u64,
    pub deleted: u64,
    pub metadata_changed: u64,
    pub reads: u64,
    pub bytes_read: u64,
    /// Reads that failed and ended their actor
    pub read_failures: u64,
    pub writes: u64,
    /// Bytes written by creators and writers together
    pub bytes_written: u64,
    pub write_failures: u64,
    /// Names dropped from the registry without deleting through a deleter
    pub retired: u64,
    pub idle_cycles: u64,
}

/// Why the simulation left the Running state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The configured runtime elapsed
    RuntimeElapsed,
    /// The caller's shutdown token fired
    Interrupted,
    /// `stop` was called directly
    Requested,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::RuntimeElapsed => write!(f, "runtime elapsed"),
            StopReason::Interrupted => write!(f, "interrupted"),
            StopReason::Requested => write!(f, "stop requested"),
        }
    }
}

/// What teardown removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TeardownSummary {
    /// Names drained from the registry
    pub drained: usize,
    /// Drained names whose file was actually deleted
    pub removed_tracked: usize,
    /// Untracked files removed by the directory sweep
    pub swept: usize,
}

/// Summary of a finished simulation
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    #[serde(serialize_with = "crate::config::serialize_secs")]
    pub elapsed: Duration,
    pub stop_reason: StopReason,
    pub config: SimulationConfig,
    pub operations: OperationCounts,
    pub teardown: TeardownSummary,
    /// Actors that terminated early because of an error or panic
    pub failed_actors: usize,
}

impl SimulationReport {
    /// Whole seconds the simulation ran for
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed.as_secs()
    }
}
