//! Common test utilities for TCMP client integration tests

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tcmp_client::{
    Connection, ConnectionEvent, ConnectionOptions, ConnectionState, Headers, NotificationService,
    Result, TcmpError, Transport, TransportEvent,
};
use tokio::sync::mpsc;

/// Records every transport call; sends can be made to fail on demand
pub struct MockTransport {
    sent: Mutex<Vec<String>>,
    disconnects: Mutex<Vec<u16>>,
    connect_calls: AtomicUsize,
    fail_sends: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            disconnects: Mutex::new(Vec::new()),
            connect_calls: AtomicUsize::new(0),
            fail_sends: AtomicBool::new(false),
        })
    }

    /// All sent frames, decoded
    pub fn sent_frames(&self) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .map(|raw| serde_json::from_str(raw).unwrap())
            .collect()
    }

    /// Sent frames with the given `type` tag
    pub fn frames_of_type(&self, kind: &str) -> Vec<Value> {
        self.sent_frames()
            .into_iter()
            .filter(|frame| frame["type"] == kind)
            .collect()
    }

    pub fn disconnect_codes(&self) -> Vec<u16> {
        self.disconnects.lock().clone()
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::Acquire)
    }

    /// Make every subsequent send be rejected
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Release);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, _url: &str) -> Result<()> {
        self.connect_calls.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn send(&self, _channel: &str, _headers: &Headers, body: &str) -> Result<()> {
        if self.fail_sends.load(Ordering::Acquire) {
            return Err(TcmpError::Transport("send refused".to_string()));
        }
        self.sent.lock().push(body.to_string());
        Ok(())
    }

    fn disconnect(&self, code: u16) {
        self.disconnects.lock().push(code);
    }
}

/// Records session-ready subscriptions
pub struct MockNotifications {
    subscriptions: Mutex<Vec<(String, String)>>,
}

impl MockNotifications {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    pub fn subscriptions(&self) -> Vec<(String, String)> {
        self.subscriptions.lock().clone()
    }
}

#[async_trait]
impl NotificationService for MockNotifications {
    async fn subscribe(&self, topic: &str, channel: &str) -> Result<()> {
        self.subscriptions
            .lock()
            .push((topic.to_string(), channel.to_string()));
        Ok(())
    }
}

/// A connection wired to mock collaborators, with the transport event sender
/// held by the test
pub struct TestConnection {
    pub transport: Arc<MockTransport>,
    pub notifications: Arc<MockNotifications>,
    pub events: mpsc::UnboundedSender<TransportEvent>,
    pub connection: Connection,
}

pub fn connect_with(options: ConnectionOptions) -> TestConnection {
    let transport = MockTransport::new();
    let notifications = MockNotifications::new();
    let (events, events_rx) = mpsc::unbounded_channel();
    let connection = Connection::new(
        "wss://tcmp.example.com/session",
        options,
        Some("test-token".to_string()),
        transport.clone(),
        events_rx,
        notifications.clone(),
    );
    TestConnection {
        transport,
        notifications,
        events,
        connection,
    }
}

pub fn connect() -> TestConnection {
    connect_with(ConnectionOptions::default())
}

impl TestConnection {
    /// Inject a transport event
    pub fn emit(&self, event: TransportEvent) {
        self.events.send(event).unwrap();
    }

    /// Deliver a raw inbound frame
    pub fn deliver(&self, frame: &str) {
        self.emit(TransportEvent::Frame(frame.to_string()));
    }

    pub fn deliver_json(&self, frame: Value) {
        self.deliver(&frame.to_string());
    }

    /// Drive the handshake to completion: session-ready, then a `welcome`
    /// once the hello goes out.
    pub async fn open(&self) {
        self.emit(TransportEvent::SessionReady);
        assert!(
            self.wait_for(|| !self.transport.frames_of_type("hello").is_empty())
                .await,
            "hello was never sent"
        );
        self.deliver(r#"{"type":"welcome"}"#);
        assert!(
            self.wait_state(ConnectionState::Open).await,
            "connection never opened"
        );
    }

    /// Next public notification, polling up to two seconds
    pub async fn next_event(&self) -> Option<ConnectionEvent> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            if let Some(event) = self.connection.try_recv_event() {
                return Some(event);
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Drain notifications until a `Closed` arrives; returns its payload
    pub async fn wait_closed(&self) -> Option<Option<TcmpError>> {
        loop {
            match self.next_event().await? {
                ConnectionEvent::Closed(cause) => return Some(cause),
                _ => continue,
            }
        }
    }

    pub async fn wait_state(&self, state: ConnectionState) -> bool {
        self.wait_for(|| self.connection.state() == state).await
    }

    /// Poll a condition for up to two seconds
    pub async fn wait_for(&self, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            if condition() {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Collect every notification already delivered
    pub fn drain_events(&self) -> Vec<ConnectionEvent> {
        let mut drained = Vec::new();
        while let Some(event) = self.connection.try_recv_event() {
            drained.push(event);
        }
        drained
    }
}
