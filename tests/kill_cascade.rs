//! Kill-hook cascades: when a process stops, everything named in its
//! `kill` hooks reaches `stopped` within a bounded time — directly if it
//! never started, via cancellation if it was running.

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use composer::CancellationToken;
use composer_test_utils::builders::{RegistryBuilder, ServiceBuilder};
use composer_test_utils::recorder::SnapshotRecorder;
use composer_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn stopping_cascades_to_ready_and_running_targets() -> TestResult {
    init_tracing();

    let recorder = Arc::new(SnapshotRecorder::new());
    // c is gated on b (which runs long), so it is still `ready` when a
    // stops; b is running by then. a's kill list names c first so the
    // cascade reaches it before b's stop releases c's gate.
    let processor = RegistryBuilder::new()
        .with(ServiceBuilder::new("a", "sleep 0.5").kill("c").kill("b"))
        .with(ServiceBuilder::new("b", "sleep 30"))
        .with(ServiceBuilder::new("c", "sleep 30").wait("b"))
        .observe(recorder.clone())
        .processor();

    let started = Instant::now();
    with_timeout(processor.clone().perform(CancellationToken::new())).await?;

    // Bounded: nowhere near the 30s sleeps.
    assert!(started.elapsed() < Duration::from_secs(10));

    // c never got to run; b was cancelled out of `running`.
    assert!(!recorder.ever_ran("c"), "c was force-stopped while ready");
    assert!(recorder.ever_ran("b"));

    let snapshot = processor.registry().snapshot();
    assert_eq!(snapshot.stopped.len(), 3);
    assert!(snapshot.ready.is_empty());
    assert!(snapshot.running.is_empty());

    Ok(())
}

#[tokio::test]
async fn cancellation_of_a_kill_target_does_not_shut_composer_down() -> TestResult {
    init_tracing();

    let processor = RegistryBuilder::new()
        .with(ServiceBuilder::new("a", "sleep 0.3").kill("b"))
        .with(ServiceBuilder::new("b", "sleep 30"))
        .processor();

    // b's run ends in a cancellation error; b is licensed to be killed,
    // so that error must not escalate.
    with_timeout(processor.clone().perform(CancellationToken::new())).await?;
    assert!(!processor.is_shutting_down());

    Ok(())
}
