//! Unit tests for QueueServer lifecycle, send outcomes and shutdown accounting

use super::*;
use crate::port::message_handler::mocks::MockMessageHandler;
use std::time::{Duration, Instant};

fn config(buffer_size: usize, worker_count: usize, retry_count: u32, delay_ms: u64) -> Config {
    Config::new(
        buffer_size,
        worker_count,
        retry_count,
        Duration::from_millis(delay_ms),
    )
    .unwrap()
}

fn server_with(config: Config, handler: &MockMessageHandler) -> QueueServer {
    QueueServer::with_handler(config, Arc::new(handler.clone()))
}

async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {}", what));
}

#[test]
fn test_from_settings_rejects_invalid_field() {
    let settings = ServerSettings {
        worker_count: 0,
        ..ServerSettings::default()
    };

    match QueueServer::from_settings(settings) {
        Err(err) => assert_eq!(err.field(), "worker_count"),
        Ok(_) => panic!("Expected ConfigError for worker_count"),
    }
}

#[test]
fn test_new_server_exposes_config() {
    let server = QueueServer::new(config(7, 2, 1, 5));

    assert_eq!(server.config().buffer_size(), 7);
    assert_eq!(server.config().worker_count(), 2);
    assert_eq!(server.lifecycle(), Lifecycle::Created);
    assert_eq!(server.active_workers(), 0);
    assert!(server.dropped_messages().is_empty());
}

#[test]
fn test_start_outside_runtime_reports_worker_index() {
    let server = QueueServer::new(config(1, 2, 0, 0));

    match server.start() {
        Err(StartError::WorkerSpawn { index, .. }) => assert_eq!(index, 0),
        other => panic!("Expected WorkerSpawn error, got {:?}", other),
    }
    assert_eq!(server.active_workers(), 0);
    assert_eq!(server.lifecycle(), Lifecycle::Created);

    // The failed attempt does not burn the one allowed start
    tokio_test::block_on(async {
        server.start().unwrap();
        assert_eq!(server.lifecycle(), Lifecycle::Running);
        assert_eq!(server.active_workers(), 2);
        server.shutdown().await;
    });
    assert_eq!(server.lifecycle(), Lifecycle::Closed);
}

#[tokio::test]
async fn test_start_twice_is_rejected() {
    let handler = MockMessageHandler::new_success();
    let server = server_with(config(2, 2, 0, 0), &handler);

    server.start().unwrap();
    assert_eq!(server.lifecycle(), Lifecycle::Running);
    assert_eq!(
        server.start(),
        Err(StartError::InvalidState(Lifecycle::Running))
    );

    server.shutdown().await;
    assert_eq!(
        server.start(),
        Err(StartError::InvalidState(Lifecycle::Closed))
    );
}

#[tokio::test]
async fn test_retry_exhausted_with_no_workers_running() {
    let handler = MockMessageHandler::new_success();
    let server = server_with(config(1, 1, 2, 10), &handler);

    assert!(server.send("first").await.is_ok());

    let started = Instant::now();
    for message in ["second", "third"] {
        match server.send(message).await {
            Err(SendError::RetryExhausted { message: m, attempts }) => {
                assert_eq!(m, message);
                assert_eq!(attempts, 2);
            }
            other => panic!("Expected RetryExhausted, got {:?}", other),
        }
    }
    assert!(started.elapsed() >= Duration::from_millis(40));

    // Rejected messages stay the caller's: nothing recorded as dropped
    assert!(server.dropped_messages().is_empty());
    assert_eq!(server.stats().accepted, 1);
    assert_eq!(server.stats().queued, 1);
}

#[tokio::test]
async fn test_zero_retries_fail_fast() {
    let handler = MockMessageHandler::new_success();
    let server = server_with(config(1, 1, 0, 1_000), &handler);

    server.send("fills").await.unwrap();

    let started = Instant::now();
    let err = server.send("rejected").await.unwrap_err();
    assert_eq!(
        err,
        SendError::RetryExhausted {
            message: "rejected".to_string(),
            attempts: 0,
        }
    );
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn test_immediate_shutdown_has_nothing_to_account_for() {
    let handler = MockMessageHandler::new_success();
    let server = server_with(config(5, 3, 3, 10), &handler);

    server.start().unwrap();
    server.shutdown().await;

    assert_eq!(server.lifecycle(), Lifecycle::Closed);
    assert_eq!(server.active_workers(), 0);
    assert!(server.dropped_messages().is_empty());
    assert!(server.drain_unprocessed().is_empty());
}

#[tokio::test]
async fn test_send_after_shutdown_is_queue_closed() {
    let handler = MockMessageHandler::new_success();
    let server = server_with(config(2, 1, 3, 10), &handler);

    server.start().unwrap();
    server.shutdown().await;

    match server.send("late").await {
        Err(SendError::QueueClosed { message }) => assert_eq!(message, "late"),
        other => panic!("Expected QueueClosed, got {:?}", other),
    }
    assert!(server.dropped_messages().is_empty());
    assert_eq!(server.stats().accepted, 0);
}

#[tokio::test]
async fn test_shutdown_without_start_keeps_buffer_for_drain() {
    let handler = MockMessageHandler::new_success();
    let server = server_with(config(3, 1, 0, 0), &handler);

    server.send("a").await.unwrap();
    server.send("b").await.unwrap();
    server.shutdown().await;

    assert_eq!(server.lifecycle(), Lifecycle::Closed);
    assert_eq!(server.drain_unprocessed(), vec!["a".to_string(), "b".to_string()]);
    assert!(server.drain_unprocessed().is_empty());
    assert_eq!(handler.call_count(), 0);
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let handler = MockMessageHandler::new_success();
    let server = server_with(config(2, 2, 0, 0), &handler);

    server.start().unwrap();
    server.shutdown().await;
    server.shutdown().await;

    assert_eq!(server.lifecycle(), Lifecycle::Closed);
    assert_eq!(server.active_workers(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_workers_process_sent_messages() {
    let handler = MockMessageHandler::new_success();
    let server = server_with(config(4, 2, 5, 5), &handler);
    server.start().unwrap();
    assert_eq!(server.active_workers(), 2);

    for i in 0..6 {
        server.send(format!("user_{}", i)).await.unwrap();
    }
    wait_until("all messages processed", || server.stats().processed == 6).await;

    server.shutdown().await;

    let mut handled = handler.handled();
    handled.sort();
    let expected: Vec<String> = (0..6).map(|i| format!("user_{}", i)).collect();
    assert_eq!(handled, expected);

    let stats = server.stats();
    assert_eq!(stats.accepted, 6);
    assert_eq!(stats.delivered, 6);
    assert_eq!(stats.failed, 0);
    assert!(stats.peak_queued <= 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_queue_during_shutdown_records_drop() {
    // One slow worker keeps shutdown in its join phase long enough for a
    // retrying sender to observe "full + stopping" before the seal.
    let handler = MockMessageHandler::new_delayed(Duration::from_millis(400));
    let server = Arc::new(server_with(config(1, 1, 50, 20), &handler));
    server.start().unwrap();

    server.send("in-flight").await.unwrap();
    wait_until("worker picks up first message", || server.stats().delivered == 1).await;
    server.send("buffered").await.unwrap();

    let retrying = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.send("late").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let shutting_down = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.shutdown().await })
    };

    match retrying.await.unwrap() {
        Err(SendError::ShutdownInProgress { message }) => assert_eq!(message, "late"),
        other => panic!("Expected ShutdownInProgress, got {:?}", other),
    }
    shutting_down.await.unwrap();

    assert_eq!(server.dropped_messages(), vec!["late".to_string()]);
    assert_eq!(server.drain_unprocessed(), vec!["buffered".to_string()]);
    assert_eq!(handler.handled(), vec!["in-flight".to_string()]);
    assert_eq!(server.stats().processed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_waits_for_in_flight_message() {
    let handler = MockMessageHandler::new_delayed(Duration::from_millis(150));
    let server = server_with(config(2, 1, 0, 0), &handler);
    server.start().unwrap();

    server.send("slow").await.unwrap();
    wait_until("worker picks up message", || server.stats().delivered == 1).await;

    server.shutdown().await;

    let stats = server.stats();
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.active_workers, 0);
    assert_eq!(stats.lifecycle, Lifecycle::Closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancelled_shutdown_then_shutdown_waits_for_workers() {
    let handler = MockMessageHandler::new_delayed(Duration::from_millis(300));
    let server = server_with(config(2, 1, 0, 0), &handler);
    server.start().unwrap();

    server.send("in-flight").await.unwrap();
    wait_until("worker picks up message", || server.stats().delivered == 1).await;

    let cancelled = tokio::time::timeout(Duration::from_millis(50), server.shutdown()).await;
    assert!(cancelled.is_err());
    assert_eq!(server.active_workers(), 1);
    assert_ne!(server.lifecycle(), Lifecycle::Closed);

    server.shutdown().await;

    let stats = server.stats();
    assert_eq!(stats.active_workers, 0);
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.lifecycle, Lifecycle::Closed);
}

#[tokio::test]
async fn test_stats_serialize_lifecycle() {
    let server = QueueServer::new(config(1, 1, 0, 0));
    let json = serde_json::to_value(server.stats()).unwrap();

    assert_eq!(json["lifecycle"], "CREATED");
    assert_eq!(json["accepted"], 0);
}
