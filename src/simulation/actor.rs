//! Actors and their shared control loop
//!
//! Every actor runs the same loop: sleep a jittered interval, then perform
//! one cycle of its [`ActorKind`]. A cycle claims a name from the registry
//! (creators generate a fresh one instead), does its filesystem I/O with the
//! registry unlocked, and then either releases the name back or retires it.
//!
//! Blocking I/O runs on the tokio blocking pool through the context's
//! [`TaskTracker`], so the controller can abort actors at any await point
//! and still wait for every started syscall to finish before it cleans up.

use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace, warn};

use crate::config::{ActorCounts, ByteRange, MetadataReleasePolicy, SimulationConfig};
use crate::fs::TargetDir;
use crate::simulation::error::ActorError;
use crate::simulation::names::NameGenerator;
use crate::simulation::registry::Registry;
use crate::simulation::report::OperationStats;

/// The closed set of actor behaviours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Creator,
    Deleter,
    MetadataMutator,
    Reader,
    Writer,
}

impl ActorKind {
    pub const ALL: [ActorKind; 5] = [
        ActorKind::Creator,
        ActorKind::Deleter,
        ActorKind::MetadataMutator,
        ActorKind::Reader,
        ActorKind::Writer,
    ];

    /// How many actors of this kind `counts` asks for
    pub fn count_in(self, counts: &ActorCounts) -> usize {
        match self {
            ActorKind::Creator => counts.creators,
            ActorKind::Deleter => counts.deleters,
            ActorKind::MetadataMutator => counts.metadata_mutators,
            ActorKind::Reader => counts.readers,
            ActorKind::Writer => counts.writers,
        }
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActorKind::Creator => "creator",
            ActorKind::Deleter => "deleter",
            ActorKind::MetadataMutator => "metadata-mutator",
            ActorKind::Reader => "reader",
            ActorKind::Writer => "writer",
        };
        f.write_str(name)
    }
}

/// Result of a single actor cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing to claim
    Idle,
    /// A new file was created and registered
    Created(String),
    /// Creation failed; nothing was registered
    CreateFailed,
    /// The claimed file was deleted and its name dropped
    Deleted(String),
    /// The claimed name went back into the registry
    Released(String),
    /// The claimed name was dropped without going back into the registry
    Retired(String),
}

/// State shared by all actors of one simulation
#[derive(Debug)]
pub struct ActorContext {
    config: Arc<SimulationConfig>,
    dir: TargetDir,
    registry: Registry,
    names: NameGenerator,
    stats: OperationStats,
    io: TaskTracker,
}

impl ActorContext {
    pub fn new(config: Arc<SimulationConfig>, dir: TargetDir) -> Self {
        Self {
            config,
            dir,
            registry: Registry::new(),
            names: NameGenerator::new(),
            stats: OperationStats::new(),
            io: TaskTracker::new(),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn dir(&self) -> &TargetDir {
        &self.dir
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn stats(&self) -> &OperationStats {
        &self.stats
    }

    /// Tracker for blocking I/O started by actors
    pub fn io(&self) -> &TaskTracker {
        &self.io
    }

    /// Runs `op` against the target directory on the blocking pool
    async fn blocking<F, T>(&self, op: F) -> Result<T, ActorError>
    where
        F: FnOnce(&TargetDir) -> T + Send + 'static,
        T: Send + 'static,
    {
        let dir = self.dir.clone();
        self.io
            .spawn_blocking(move || op(&dir))
            .await
            .map_err(|e| ActorError::Join(e.to_string()))
    }
}

fn sample_bytes(range: ByteRange) -> u64 {
    rand::thread_rng().gen_range(range.min..=range.max)
}

/// One concurrent unit performing one kind of operation repeatedly
#[derive(Debug)]
pub struct Actor {
    kind: ActorKind,
    id: usize,
    ctx: Arc<ActorContext>,
}

impl Actor {
    pub fn new(kind: ActorKind, id: usize, ctx: Arc<ActorContext>) -> Self {
        Self { kind, id, ctx }
    }

    /// `sleep_period` scaled by a factor drawn uniformly from the jitter range
    ///
    /// Saturates at `Duration::MAX` instead of overflowing.
    pub fn next_delay(&self) -> Duration {
        let config = self.ctx.config();
        let jitter = config.jitter;
        let factor = if jitter.min >= jitter.max {
            jitter.min
        } else {
            rand::thread_rng().gen_range(jitter.min..=jitter.max)
        };
        Duration::try_from_secs_f64(config.sleep_period.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }

    /// Runs cycles until the task is aborted
    ///
    /// Only an unrecoverable cycle error ends the loop.
    pub async fn run(self) -> Result<(), ActorError> {
        debug!(actor = %self.kind, id = self.id, "Actor started");
        loop {
            tokio::time::sleep(self.next_delay()).await;
            let outcome = self.cycle().await?;
            trace!(actor = %self.kind, id = self.id, ?outcome, "Cycle finished");
        }
    }

    /// Performs one operation of this actor's kind, without sleeping first
    pub async fn cycle(&self) -> Result<CycleOutcome, ActorError> {
        match self.kind {
            ActorKind::Creator => self.create().await,
            ActorKind::Deleter => self.delete().await,
            ActorKind::MetadataMutator => self.change_metadata().await,
            ActorKind::Reader => self.read().await,
            ActorKind::Writer => self.write().await,
        }
    }

    fn claim(&self) -> Option<String> {
        let claimed = self.ctx.registry().claim_random();
        if claimed.is_none() {
            self.ctx.stats().record_idle();
        }
        claimed
    }

    fn release(&self, name: String) -> CycleOutcome {
        self.ctx.registry().release(name.clone());
        CycleOutcome::Released(name)
    }

    fn retire(&self, name: String) -> CycleOutcome {
        self.ctx.stats().record_retired();
        CycleOutcome::Retired(name)
    }

    async fn create(&self) -> Result<CycleOutcome, ActorError> {
        let name = self.ctx.names.next_name();
        let len = sample_bytes(self.ctx.config().create_bytes);

        let file = name.clone();
        let result = self
            .ctx
            .blocking(move |dir| {
                let result = dir.create_random(&file, len);
                // An existing file with this name is not ours to delete
                if let Err(e) = &result {
                    if e.kind() != io::ErrorKind::AlreadyExists {
                        let _ = dir.remove_quiet(&file);
                    }
                }
                result
            })
            .await?;

        match result {
            Ok(()) => {
                self.ctx.stats().record_created(len);
                self.ctx.registry().insert(name.clone());
                debug!(actor = %self.kind, id = self.id, file = %name, bytes = len, "Created file");
                Ok(CycleOutcome::Created(name))
            }
            Err(e) => {
                self.ctx.stats().record_create_failure();
                warn!(actor = %self.kind, id = self.id, file = %name, "Failed to create file: {}", e);
                Ok(CycleOutcome::CreateFailed)
            }
        }
    }

    async fn delete(&self) -> Result<CycleOutcome, ActorError> {
        let Some(name) = self.claim() else {
            return Ok(CycleOutcome::Idle);
        };

        let file = name.clone();
        match self.ctx.blocking(move |dir| dir.remove_quiet(&file)).await? {
            Ok(true) => debug!(actor = %self.kind, id = self.id, file = %name, "Deleted file"),
            Ok(false) => debug!(actor = %self.kind, id = self.id, file = %name, "File already gone"),
            Err(e) => debug!(actor = %self.kind, id = self.id, file = %name, "Failed to delete file: {}", e),
        }
        self.ctx.stats().record_deleted();
        Ok(CycleOutcome::Deleted(name))
    }

    async fn change_metadata(&self) -> Result<CycleOutcome, ActorError> {
        let Some(name) = self.claim() else {
            return Ok(CycleOutcome::Idle);
        };

        let file = name.clone();
        let (chmod, exists) = self
            .ctx
            .blocking(move |dir| {
                let chmod = dir.make_owner_rwx(&file);
                (chmod, dir.exists(&file))
            })
            .await?;

        match chmod {
            Ok(()) => {
                self.ctx.stats().record_metadata_changed();
                debug!(actor = %self.kind, id = self.id, file = %name, "Changed permissions");
            }
            Err(e) => {
                debug!(actor = %self.kind, id = self.id, file = %name, "Failed to change permissions: {}", e)
            }
        }

        match self.ctx.config().metadata_release {
            MetadataReleasePolicy::Always => Ok(self.release(name)),
            MetadataReleasePolicy::IfExists if exists => Ok(self.release(name)),
            MetadataReleasePolicy::IfExists => Ok(self.retire(name)),
        }
    }

    async fn read(&self) -> Result<CycleOutcome, ActorError> {
        let Some(name) = self.claim() else {
            return Ok(CycleOutcome::Idle);
        };

        let len = sample_bytes(self.ctx.config().read_bytes);
        let file = name.clone();
        match self.ctx.blocking(move |dir| dir.read_prefix(&file, len)).await? {
            Ok(read) => {
                self.ctx.stats().record_read(read);
                debug!(actor = %self.kind, id = self.id, file = %name, bytes = read, "Read file");
                Ok(self.release(name))
            }
            // The name stays claimed; the teardown sweep removes any leftover file
            Err(source) => {
                self.ctx.stats().record_read_failure();
                Err(ActorError::Read { name, source })
            }
        }
    }

    async fn write(&self) -> Result<CycleOutcome, ActorError> {
        let Some(name) = self.claim() else {
            return Ok(CycleOutcome::Idle);
        };

        let len = sample_bytes(self.ctx.config().write_bytes);
        let file = name.clone();
        let result = self
            .ctx
            .blocking(move |dir| {
                let result = dir.rewrite_random(&file, len);
                if result.is_err() {
                    let _ = dir.remove_quiet(&file);
                }
                result
            })
            .await?;

        match result {
            Ok(()) => {
                self.ctx.stats().record_write(len);
                debug!(actor = %self.kind, id = self.id, file = %name, bytes = len, "Rewrote file");
                Ok(self.release(name))
            }
            Err(e) => {
                self.ctx.stats().record_write_failure();
                debug!(actor = %self.kind, id = self.id, file = %name, "Write failed, deleted file: {}", e);
                Ok(self.retire(name))
            }
        }
    }
}
