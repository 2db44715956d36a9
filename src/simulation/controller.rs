//! Simulation lifecycle
//!
//! A [`Simulation`] moves through `Idle → Running → Stopping → Terminated`.
//! Starting spawns one tokio task per configured actor. Stopping aborts those
//! tasks wherever they are, waits for any blocking I/O they had in flight,
//! and then reconciles: every name left in the registry is deleted and the
//! directory is swept for files nobody tracks any more (claimed by an actor
//! that died mid-cycle, or left over from before the run).

use chrono::{DateTime, Local};
use serde::Serialize;
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SimulationConfig;
use crate::fs::{FsError, TargetDir};
use crate::simulation::actor::{Actor, ActorContext, ActorKind};
use crate::simulation::error::{ActorError, SimulationError};
use crate::simulation::registry::Registry;
use crate::simulation::report::{SimulationReport, StopReason, TeardownSummary};

/// Upper bound on the run timer, roughly thirty years
const MAX_RUNTIME: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// Lifecycle state of a [`Simulation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationState {
    Idle,
    Running,
    Stopping,
    Terminated,
}

struct ActorHandle {
    kind: ActorKind,
    id: usize,
    handle: JoinHandle<Result<(), ActorError>>,
}

/// Everything that only exists while the simulation is running
struct Run {
    ctx: Arc<ActorContext>,
    actors: Vec<ActorHandle>,
    started_at: DateTime<Local>,
    started: Instant,
    deadline: tokio::time::Instant,
}

/// Owns the registry and the actors of one simulation run
pub struct Simulation {
    config: Arc<SimulationConfig>,
    state: SimulationState,
    run: Option<Run>,
}

impl Simulation {
    /// Creates an idle simulation after validating `config`
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            state: SimulationState::Idle,
            run: None,
        })
    }

    /// Creates, starts and runs a simulation until its runtime elapses or
    /// `shutdown` is cancelled, then tears it down
    pub async fn run(
        config: SimulationConfig,
        shutdown: CancellationToken,
    ) -> Result<SimulationReport, SimulationError> {
        let mut simulation = Simulation::new(config)?;
        simulation.start()?;
        let reason = simulation.wait(&shutdown).await;
        simulation.stop_with(reason).await
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Shared actor state, available while running
    pub fn context(&self) -> Option<&Arc<ActorContext>> {
        self.run.as_ref().map(|run| &run.ctx)
    }

    /// The live-name registry, available while running
    pub fn registry(&self) -> Option<&Registry> {
        self.context().map(|ctx| ctx.registry())
    }

    /// When the simulation entered the Running state
    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.run.as_ref().map(|run| run.started_at)
    }

    fn transition(&mut self, to: SimulationState) -> Result<(), SimulationError> {
        use SimulationState::*;

        let allowed = matches!(
            (self.state, to),
            (Idle, Running) | (Running, Stopping) | (Stopping, Terminated)
        );
        if !allowed {
            return Err(SimulationError::InvalidState {
                from: self.state,
                to,
            });
        }
        debug!("Simulation state {:?} -> {:?}", self.state, to);
        self.state = to;
        Ok(())
    }

    /// Opens the target directory and spawns every configured actor
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails if the simulation is not idle, if the directory is missing, not
    /// a directory, or not empty (unless `allow_non_empty`), or if the
    /// working directory cannot be changed.
    pub fn start(&mut self) -> Result<(), SimulationError> {
        if self.state != SimulationState::Idle {
            return Err(SimulationError::InvalidState {
                from: self.state,
                to: SimulationState::Running,
            });
        }

        let dir = TargetDir::open(&self.config.directory)?;
        if !self.config.allow_non_empty && !dir.is_empty()? {
            return Err(FsError::NotEmpty(dir.path().to_path_buf()).into());
        }
        if self.config.change_dir {
            env::set_current_dir(dir.path()).map_err(|source| SimulationError::ChangeDir {
                path: dir.path().to_path_buf(),
                source,
            })?;
            debug!("Changed working directory to {}", dir.path().display());
        }

        let started = Instant::now();
        let deadline = run_deadline(started, self.config.runtime);

        let ctx = Arc::new(ActorContext::new(Arc::clone(&self.config), dir));
        let mut actors = Vec::with_capacity(self.config.actors.total());
        for kind in ActorKind::ALL {
            for id in 0..kind.count_in(&self.config.actors) {
                let actor = Actor::new(kind, id, Arc::clone(&ctx));
                let handle = tokio::spawn(async move {
                    let result = actor.run().await;
                    if let Err(e) = &result {
                        error!(actor = %kind, id, "Actor terminated: {}", e);
                    }
                    result
                });
                actors.push(ActorHandle { kind, id, handle });
            }
        }

        self.run = Some(Run {
            ctx,
            actors,
            started_at: Local::now(),
            started,
            deadline,
        });
        self.transition(SimulationState::Running)?;

        info!(
            dir = %self.config.directory.display(),
            actors = self.config.actors.total(),
            runtime_secs = self.config.runtime.as_secs_f64(),
            "Simulation running"
        );
        Ok(())
    }

    /// Waits until the runtime elapses or `shutdown` is cancelled
    ///
    /// Returns immediately with [`StopReason::Requested`] when not running.
    pub async fn wait(&self, shutdown: &CancellationToken) -> StopReason {
        let Some(run) = self.run.as_ref() else {
            return StopReason::Requested;
        };

        tokio::select! {
            _ = tokio::time::sleep_until(run.deadline) => {
                info!("Simulation runtime elapsed");
                StopReason::RuntimeElapsed
            }
            _ = shutdown.cancelled() => {
                info!("Simulation interrupted");
                StopReason::Interrupted
            }
        }
    }

    /// Halts every actor and cleans the directory
    pub async fn stop(&mut self) -> Result<SimulationReport, SimulationError> {
        self.stop_with(StopReason::Requested).await
    }

    /// Like [`stop`](Self::stop), recording `reason` in the report
    pub async fn stop_with(
        &mut self,
        reason: StopReason,
    ) -> Result<SimulationReport, SimulationError> {
        self.transition(SimulationState::Stopping)?;
        let Some(run) = self.run.take() else {
            return Err(SimulationError::InvalidState {
                from: SimulationState::Idle,
                to: SimulationState::Stopping,
            });
        };
        info!(%reason, "Terminating simulation");

        let failed_actors = halt_actors(run.actors).await;

        // Aborted actors may have left blocking I/O running; let it land
        // before reconciling so nothing appears after the sweep.
        run.ctx.io().close();
        run.ctx.io().wait().await;

        let operations = run.ctx.stats().snapshot();
        let teardown = teardown(Arc::clone(&run.ctx)).await;

        self.transition(SimulationState::Terminated)?;
        let report = SimulationReport {
            started_at: run.started_at,
            ended_at: Local::now(),
            elapsed: run.started.elapsed(),
            stop_reason: reason,
            config: (*self.config).clone(),
            operations,
            teardown,
            failed_actors,
        };
        info!(
            elapsed_secs = report.elapsed.as_secs_f64(),
            drained = teardown.drained,
            swept = teardown.swept,
            "Simulation terminated"
        );
        Ok(report)
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        if let Some(run) = self.run.take() {
            warn!("Simulation dropped while running; aborting actors without cleanup");
            for actor in run.actors {
                actor.handle.abort();
            }
        }
    }
}

/// When a run started at `started` must stop
///
/// Runtimes too large to represent as an instant are clamped to
/// [`MAX_RUNTIME`], which in practice means "until interrupted".
fn run_deadline(started: Instant, runtime: Duration) -> tokio::time::Instant {
    let deadline = started
        .checked_add(runtime)
        .or_else(|| started.checked_add(MAX_RUNTIME))
        .unwrap_or(started);
    tokio::time::Instant::from_std(deadline)
}

/// Aborts every actor task and joins it, returning how many had failed
async fn halt_actors(actors: Vec<ActorHandle>) -> usize {
    for actor in &actors {
        actor.handle.abort();
    }

    let mut failed = 0;
    for actor in actors {
        match actor.handle.await {
            Ok(Ok(())) => {}
            // Already logged by the task itself
            Ok(Err(_)) => failed += 1,
            Err(e) if e.is_cancelled() => {
                debug!(actor = %actor.kind, id = actor.id, "Actor aborted")
            }
            Err(e) => {
                error!(actor = %actor.kind, id = actor.id, "Actor panicked: {}", e);
                failed += 1;
            }
        }
    }
    failed
}

/// Deletes every registered file, then sweeps the directory
async fn teardown(ctx: Arc<ActorContext>) -> TeardownSummary {
    let result = tokio::task::spawn_blocking(move || {
        let drained = ctx.registry().drain();
        let mut summary = TeardownSummary {
            drained: drained.len(),
            ..Default::default()
        };

        for name in &drained {
            match ctx.dir().remove_quiet(name) {
                Ok(true) => summary.removed_tracked += 1,
                Ok(false) => debug!(file = %name, "Tracked file already gone"),
                Err(e) => warn!(file = %name, "Failed to remove tracked file: {}", e),
            }
        }

        match ctx.dir().sweep() {
            Ok(swept) => summary.swept = swept,
            Err(e) => warn!("Directory sweep failed: {}", e),
        }
        summary
    })
    .await;

    match result {
        Ok(summary) => summary,
        Err(e) => {
            error!("Teardown task failed: {}", e);
            TeardownSummary::default()
        }
    }
}
