//! Exactly-once global shutdown under concurrent triggers, and the
//! interrupt path: cancelling the root context winds everything down
//! without an error exit.

use std::error::Error;
use std::time::{Duration, Instant};

use composer::CancellationToken;
use composer_test_utils::builders::{RegistryBuilder, ServiceBuilder};
use composer_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn concurrent_triggers_shut_down_exactly_once() -> TestResult {
    init_tracing();

    let processor = RegistryBuilder::new()
        .with(ServiceBuilder::new("one", "sleep 30"))
        .with(ServiceBuilder::new("two", "sleep 30"))
        .processor();

    let runner = processor.clone();
    let perform = tokio::spawn(async move { runner.perform(CancellationToken::new()).await });

    tokio::time::sleep(Duration::from_millis(300)).await;

    // Simulate a signal and a propagated error racing each other.
    let first = {
        let processor = processor.clone();
        tokio::spawn(async move { processor.shutdown() })
    };
    let second = {
        let processor = processor.clone();
        tokio::spawn(async move { processor.shutdown() })
    };

    let performed = [first.await?, second.await?]
        .iter()
        .filter(|&&did| did)
        .count();
    assert_eq!(performed, 1, "the stop sequence must run exactly once");

    // Cancellations are not errors; the run winds down cleanly.
    with_timeout(perform).await??;

    let snapshot = processor.registry().snapshot();
    assert!(snapshot.ready.is_empty());
    assert!(snapshot.running.is_empty());
    assert_eq!(snapshot.stopped.len(), 2);

    Ok(())
}

#[tokio::test]
async fn root_cancellation_stops_running_processes() -> TestResult {
    init_tracing();

    let processor = RegistryBuilder::new()
        .with(ServiceBuilder::new("svc", "sleep 30"))
        .processor();

    let root = CancellationToken::new();
    let ctx = root.child_token();
    let runner = processor.clone();
    let perform = tokio::spawn(async move { runner.perform(ctx).await });

    tokio::time::sleep(Duration::from_millis(300)).await;

    // The interrupt path: cancel the root, then run the shutdown sequence.
    let started = Instant::now();
    root.cancel();
    processor.shutdown();

    with_timeout(perform).await??;
    assert!(started.elapsed() < Duration::from_secs(10));

    Ok(())
}
