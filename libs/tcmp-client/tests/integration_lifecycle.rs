//! Integration tests for heartbeat liveness and the close path

mod common;

use common::{connect, connect_with};
use serde_json::json;
use tcmp_client::{ConnectionOptions, ConnectionState, TransportEvent};
use std::time::Duration;

#[tokio::test]
async fn test_close_is_graceful_and_idempotent() {
    let test = connect();
    test.open().await;
    test.drain_events();

    test.connection.close();

    let cause = test.wait_closed().await.expect("no close notification");
    assert!(cause.is_none(), "normal close must carry no error");
    assert_eq!(test.transport.disconnect_codes(), vec![1000]);
    assert_eq!(test.transport.frames_of_type("bye").len(), 1);

    // A second close produces no further notification.
    test.connection.close();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(test.drain_events().is_empty());
}

#[tokio::test]
async fn test_queued_messages_discarded_on_close() {
    let test = connect();

    test.connection.send_message(json!({ "foo": 1 }));
    test.connection.send_message(json!({ "foo": 2 }));
    test.connection.close();

    let cause = test.wait_closed().await.expect("no close notification");
    assert!(cause.is_none());
    assert!(test.transport.frames_of_type("msg").is_empty());
    assert_eq!(test.transport.disconnect_codes(), vec![1000]);
}

#[tokio::test]
async fn test_session_ended_wraps_code_and_reason() {
    let test = connect();
    test.open().await;
    test.drain_events();

    test.emit(TransportEvent::SessionEnded {
        code: 4500,
        reason: "backend restart".to_string(),
    });

    let cause = test.wait_closed().await.expect("no close notification");
    let error = cause.expect("abnormal close must carry an error");
    assert_eq!(error.close_code(), Some(4500));
    assert!(error.to_string().contains("backend restart"));
}

#[tokio::test]
async fn test_session_ended_then_close_yields_one_notification() {
    let test = connect();
    test.open().await;
    test.drain_events();

    test.emit(TransportEvent::SessionEnded {
        code: 4500,
        reason: "backend restart".to_string(),
    });
    assert!(test.wait_closed().await.is_some());

    test.connection.close();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(test.drain_events().is_empty());
}

#[tokio::test]
async fn test_missed_heartbeats_close_with_3001() {
    let test = connect_with(ConnectionOptions {
        max_consecutive_missed_heartbeats: 3,
        ..ConnectionOptions::default()
    });

    test.emit(TransportEvent::SessionReady);
    assert!(
        test.wait_for(|| !test.transport.frames_of_type("hello").is_empty())
            .await
    );
    // Server negotiates a 50ms cadence in its welcome.
    test.deliver_json(json!({ "type": "welcome", "timeout": 50 }));
    assert!(test.wait_state(ConnectionState::Open).await);

    let cause = test.wait_closed().await.expect("no close notification");
    let error = cause.expect("heartbeat failure must carry an error");
    assert_eq!(error.close_code(), Some(3001));
}

#[tokio::test]
async fn test_on_time_heartbeats_keep_connection_open() {
    let test = connect_with(ConnectionOptions {
        max_consecutive_missed_heartbeats: 2,
        ..ConnectionOptions::default()
    });

    test.emit(TransportEvent::SessionReady);
    assert!(
        test.wait_for(|| !test.transport.frames_of_type("hello").is_empty())
            .await
    );
    test.deliver_json(json!({ "type": "welcome", "timeout": 200 }));
    assert!(test.wait_state(ConnectionState::Open).await);

    // Well inside the cadence for several intervals' worth of time.
    for _ in 0..12 {
        test.deliver(r#"{"type":"heartbeat"}"#);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert!(test.connection.is_open());
}

#[tokio::test]
async fn test_send_failure_closes_with_3003() {
    let test = connect();
    test.open().await;
    test.drain_events();

    test.transport.fail_sends(true);
    test.connection.send_message(json!({ "foo": 1 }));

    let cause = test.wait_closed().await.expect("no close notification");
    let error = cause.expect("send failure must carry an error");
    assert_eq!(error.close_code(), Some(3003));
}

#[tokio::test]
async fn test_send_after_close_is_silent_noop() {
    let test = connect();
    test.open().await;
    test.drain_events();

    test.connection.close();
    assert!(test.wait_closed().await.is_some());
    let frames_before = test.transport.sent_frames().len();

    test.connection.send_message(json!({ "foo": 1 }));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(test.transport.sent_frames().len(), frames_before);
    assert!(test.drain_events().is_empty());
}

#[tokio::test]
async fn test_shutdown_joins_event_loop() {
    let test = connect();
    test.open().await;

    let common::TestConnection { connection, .. } = test;
    connection.shutdown().await;
}
