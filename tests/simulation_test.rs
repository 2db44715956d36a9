//! Simulation integration tests
//!
//! Drives whole runs and hand-stepped actor populations through the public
//! API against temporary directories.

use fsload::{
    Actor, ActorContext, ActorCounts, ActorKind, ByteRange, CycleOutcome, Jitter, Simulation,
    SimulationConfig, SimulationState, StopReason, TargetDir,
};
use serial_test::serial;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn small_config(dir: &TempDir) -> SimulationConfig {
    let mut config = SimulationConfig::new(dir.path());
    config.create_bytes = ByteRange::new(64, 4096);
    config.read_bytes = ByteRange::new(64, 4096);
    config.write_bytes = ByteRange::new(64, 4096);
    config.change_dir = false;
    config
}

fn file_count(dir: &TempDir) -> usize {
    fs::read_dir(dir.path()).unwrap().count()
}

#[tokio::test]
async fn test_one_of_each_for_two_seconds_leaves_directory_empty() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = small_config(&temp_dir);
    config.runtime = Duration::from_secs(2);
    config.sleep_period = Duration::from_millis(50);
    config.jitter = Jitter::new(0.5, 1.5);

    let report = Simulation::run(config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.stop_reason, StopReason::RuntimeElapsed);
    assert!(report.elapsed >= Duration::from_secs(2));
    assert!(report.operations.created > 0);
    assert_eq!(report.failed_actors, 0);
    assert_eq!(file_count(&temp_dir), 0);
}

#[tokio::test]
async fn test_default_pacing_run() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = small_config(&temp_dir);
    config.runtime = Duration::from_secs(2);

    let report = Simulation::run(config, CancellationToken::new())
        .await
        .unwrap();

    assert!(report.elapsed >= Duration::from_secs(2));
    assert!(report.ended_at >= report.started_at);
    assert_eq!(file_count(&temp_dir), 0);
}

#[tokio::test]
async fn test_busy_population_is_cleaned_up() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = small_config(&temp_dir);
    config.runtime = Duration::from_millis(800);
    config.sleep_period = Duration::from_millis(5);
    config.actors = ActorCounts {
        creators: 4,
        deleters: 1,
        metadata_mutators: 2,
        readers: 3,
        writers: 3,
    };

    let report = Simulation::run(config, CancellationToken::new())
        .await
        .unwrap();

    let ops = report.operations;
    assert!(ops.created > 0);
    assert!(ops.deleted <= ops.created);
    // Deleted and retired names never come back, so the drained set is bounded
    assert!(report.teardown.drained as u64 <= ops.created - ops.deleted);
    assert_eq!(file_count(&temp_dir), 0);
}

#[tokio::test]
async fn test_cancellation_stops_early() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = small_config(&temp_dir);
    config.runtime = Duration::from_secs(3600);
    config.sleep_period = Duration::from_millis(10);

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let report = Simulation::run(config, shutdown).await.unwrap();

    assert_eq!(report.stop_reason, StopReason::Interrupted);
    assert!(report.elapsed < Duration::from_secs(60));
    assert_eq!(file_count(&temp_dir), 0);
}

#[tokio::test]
async fn test_leftover_files_swept_when_allowed() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("stale-1"), "old").unwrap();
    fs::write(temp_dir.path().join("stale-2"), "old").unwrap();

    let mut config = small_config(&temp_dir);
    config.runtime = Duration::from_millis(200);
    config.actors = ActorCounts::uniform(0);
    config.allow_non_empty = true;

    let report = Simulation::run(config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.teardown.drained, 0);
    assert_eq!(report.teardown.swept, 2);
    assert_eq!(file_count(&temp_dir), 0);
}

#[tokio::test]
async fn test_subdirectories_survive_teardown() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir(temp_dir.path().join("keep")).unwrap();

    let mut config = small_config(&temp_dir);
    config.runtime = Duration::from_millis(200);
    config.sleep_period = Duration::from_millis(10);
    config.allow_non_empty = true;

    Simulation::run(config, CancellationToken::new())
        .await
        .unwrap();

    assert!(temp_dir.path().join("keep").is_dir());
    assert_eq!(file_count(&temp_dir), 1);
}

#[tokio::test]
#[serial]
async fn test_run_changes_working_directory() {
    let original = env::current_dir().unwrap();
    let temp_dir = TempDir::new().unwrap();

    let mut config = small_config(&temp_dir);
    config.change_dir = true;
    config.actors = ActorCounts::uniform(0);
    config.runtime = Duration::from_millis(50);

    let mut simulation = Simulation::new(config).unwrap();
    simulation.start().unwrap();
    let cwd = env::current_dir().unwrap();
    simulation.stop().await.unwrap();
    env::set_current_dir(&original).unwrap();

    assert_eq!(
        cwd.canonicalize().unwrap(),
        temp_dir.path().canonicalize().unwrap()
    );
    assert_eq!(simulation.state(), SimulationState::Terminated);
}

#[tokio::test]
async fn test_registry_visible_while_running() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = small_config(&temp_dir);
    config.runtime = Duration::from_secs(60);
    config.sleep_period = Duration::from_millis(5);
    config.actors = ActorCounts {
        creators: 2,
        deleters: 0,
        metadata_mutators: 0,
        readers: 0,
        writers: 0,
    };

    let mut simulation = Simulation::new(config).unwrap();
    simulation.start().unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let names = simulation.registry().unwrap().snapshot();
    assert!(!names.is_empty());
    for name in &names {
        assert!(temp_dir.path().join(name).is_file());
    }

    let report = simulation.stop().await.unwrap();
    assert!(report.teardown.drained >= names.len());
    assert_eq!(file_count(&temp_dir), 0);
}

#[tokio::test]
async fn test_read_failure_ends_only_that_reader() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = small_config(&temp_dir);
    config.runtime = Duration::from_secs(60);
    config.sleep_period = Duration::from_millis(2);
    config.actors = ActorCounts {
        creators: 1,
        deleters: 0,
        metadata_mutators: 0,
        readers: 4,
        writers: 0,
    };

    let mut simulation = Simulation::new(config).unwrap();
    simulation.start().unwrap();
    let ctx = Arc::clone(simulation.context().unwrap());

    // A registered name with no file behind it
    assert!(ctx.registry().insert("ghost".to_string()));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    while ctx.stats().snapshot().read_failures == 0 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "no reader claimed the missing file"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(!ctx.registry().contains("ghost"));

    // The creator is unaffected by the dead reader
    let created = ctx.stats().snapshot().created;
    let progress_deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while ctx.stats().snapshot().created <= created {
        assert!(
            tokio::time::Instant::now() < progress_deadline,
            "creator stopped producing files"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let report = simulation.stop().await.unwrap();

    assert_eq!(report.failed_actors, 1);
    assert_eq!(report.operations.read_failures, 1);
    assert_eq!(file_count(&temp_dir), 0);
}

fn stepped_context(temp_dir: &TempDir) -> Arc<ActorContext> {
    let mut config = small_config(temp_dir);
    config.create_bytes = ByteRange::exactly(100);
    let dir = TargetDir::open(temp_dir.path()).unwrap();
    Arc::new(ActorContext::new(Arc::new(config), dir))
}

#[tokio::test]
async fn test_created_file_is_claimable() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = stepped_context(&temp_dir);
    let creator = Actor::new(ActorKind::Creator, 0, Arc::clone(&ctx));

    let CycleOutcome::Created(name) = creator.cycle().await.unwrap() else {
        panic!("Expected a created file");
    };

    assert_eq!(fs::metadata(temp_dir.path().join(&name)).unwrap().len(), 100);
    assert_eq!(ctx.registry().len(), 1);
    assert_eq!(ctx.registry().claim_random(), Some(name));
}

#[tokio::test]
async fn test_empty_registry_cycles_are_idle() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = stepped_context(&temp_dir);

    for kind in [
        ActorKind::Deleter,
        ActorKind::MetadataMutator,
        ActorKind::Reader,
        ActorKind::Writer,
    ] {
        let actor = Actor::new(kind, 0, Arc::clone(&ctx));
        assert_eq!(actor.cycle().await.unwrap(), CycleOutcome::Idle);
    }

    assert!(ctx.registry().is_empty());
    assert_eq!(ctx.stats().snapshot().idle_cycles, 4);
    assert_eq!(file_count(&temp_dir), 0);
}

#[tokio::test]
async fn test_stepped_population_keeps_claims_exclusive() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = stepped_context(&temp_dir);

    let creator = Actor::new(ActorKind::Creator, 0, Arc::clone(&ctx));
    let mut created = HashSet::new();
    for _ in 0..20 {
        if let CycleOutcome::Created(name) = creator.cycle().await.unwrap() {
            assert!(created.insert(name), "Creator produced a duplicate name");
        }
    }
    assert_eq!(created.len(), 20);

    let workers: Vec<_> = [ActorKind::Reader, ActorKind::Writer, ActorKind::MetadataMutator]
        .into_iter()
        .map(|kind| Actor::new(kind, 0, Arc::clone(&ctx)))
        .collect();

    let handles: Vec<_> = workers
        .into_iter()
        .map(|actor| {
            tokio::spawn(async move {
                for _ in 0..25 {
                    let outcome = actor.cycle().await.unwrap();
                    assert!(matches!(outcome, CycleOutcome::Released(_)));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let mut names = ctx.registry().snapshot();
    names.sort();
    let mut expected: Vec<_> = created.into_iter().collect();
    expected.sort();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn test_writer_on_removed_file_retires_name() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = stepped_context(&temp_dir);
    let creator = Actor::new(ActorKind::Creator, 0, Arc::clone(&ctx));
    let writer = Actor::new(ActorKind::Writer, 0, Arc::clone(&ctx));

    let CycleOutcome::Created(name) = creator.cycle().await.unwrap() else {
        panic!("Expected a created file");
    };
    fs::remove_file(temp_dir.path().join(&name)).unwrap();

    assert_eq!(
        writer.cycle().await.unwrap(),
        CycleOutcome::Retired(name.clone())
    );
    assert!(!ctx.registry().contains(&name));
    assert!(!temp_dir.path().join(&name).exists());
    assert_eq!(ctx.stats().snapshot().write_failures, 1);
}

#[tokio::test]
async fn test_deleter_never_returns_name() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = stepped_context(&temp_dir);
    let creator = Actor::new(ActorKind::Creator, 0, Arc::clone(&ctx));
    let deleter = Actor::new(ActorKind::Deleter, 0, Arc::clone(&ctx));

    for _ in 0..3 {
        creator.cycle().await.unwrap();
    }
    for _ in 0..3 {
        assert!(matches!(
            deleter.cycle().await.unwrap(),
            CycleOutcome::Deleted(_)
        ));
    }

    assert!(ctx.registry().is_empty());
    assert_eq!(file_count(&temp_dir), 0);
    assert_eq!(deleter.cycle().await.unwrap(), CycleOutcome::Idle);
}
