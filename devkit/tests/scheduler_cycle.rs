//! Emit cycles: failure counting and DogStatsD output

use std::time::Duration;
use tokio::net::UdpSocket;

use sc_metrics_agent::emitter::Emitter;
use sc_metrics_agent::scheduler::{CycleOutcome, Scheduler};
use sc_metrics_devkit::fixtures::scanner;
use sc_metrics_devkit::source_stub::OP_JOBS;
use sc_metrics_devkit::{MockEntitySource, MockProvider};

fn admin() -> MockEntitySource {
    MockEntitySource::new().with_scanners(vec![scanner("1", "east", true)])
}

#[tokio::test]
async fn test_failed_updates_count_and_reset() {
    let source = admin().fail_on(OP_JOBS);
    let mut scheduler = Scheduler::new(
        MockProvider::new(source.clone()),
        Emitter::dry_run(Vec::new()),
        Duration::from_secs(60),
    );

    assert_eq!(
        scheduler.run_cycle().await.unwrap(),
        CycleOutcome::Failed { consecutive_failures: 1 }
    );
    assert_eq!(
        scheduler.run_cycle().await.unwrap(),
        CycleOutcome::Failed { consecutive_failures: 2 }
    );
    assert_eq!(scheduler.failed_updates(), 2);

    source.clear_failures();
    // 3 global scanner gauges, 3 zone gauges, 2 job gauges, failedUpdate
    assert_eq!(
        scheduler.run_cycle().await.unwrap(),
        CycleOutcome::Emitted { metrics: 9 }
    );
    assert_eq!(scheduler.failed_updates(), 0);
}

#[tokio::test]
async fn test_run_once_returns_after_first_cycle() {
    let source = admin();
    let mut scheduler = Scheduler::new(
        MockProvider::new(source.clone()),
        Emitter::dry_run(vec!["env:test".into()]),
        Duration::from_secs(3600),
    );

    tokio::time::timeout(Duration::from_secs(5), scheduler.run(true))
        .await
        .expect("run(once) should not wait for the next tick")
        .unwrap();
    assert_eq!(source.call_count(OP_JOBS), 1);
}

#[tokio::test]
async fn test_failure_gauge_sent_to_statsd() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let address = receiver.local_addr().unwrap().to_string();

    let source = admin().fail_on(OP_JOBS);
    let emitter = Emitter::statsd(&address, vec!["site:lab".into()]).await.unwrap();
    let mut scheduler = Scheduler::new(MockProvider::new(source.clone()), emitter, Duration::from_secs(60));

    scheduler.run_cycle().await.unwrap();
    let mut buf = [0u8; 2048];
    let n = receiver.recv(&mut buf).await.unwrap();
    assert_eq!(std::str::from_utf8(&buf[..n]).unwrap(), "tenablesc.failedUpdate:1|g|#site:lab");

    source.clear_failures();
    scheduler.run_cycle().await.unwrap();
    let n = receiver.recv(&mut buf).await.unwrap();
    let payload = std::str::from_utf8(&buf[..n]).unwrap();
    assert!(payload.contains("tenablesc.totalScannerCount:1|g|#site:lab"));
    assert!(payload.contains("tenablesc.totalScannerCount:1|g|#scanZone:no-associated-zone,site:lab"));
    assert!(payload.ends_with("tenablesc.failedUpdate:0|g|#site:lab"));
}
