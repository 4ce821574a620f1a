//! Connection orchestrator
//!
//! Owns the transition engine, the welcome deadline, the heartbeat interval,
//! and the outgoing queue. A single event-loop task serializes all transport
//! events, application commands, and timer expirations, so no two handlers
//! ever run concurrently with respect to connection state or the queue.
//!
//! Every termination, whatever its trigger, funnels through one close
//! handler: it discards the queue, cancels both timers, and performs the
//! only transition into `Closed`. That makes `close()` idempotent and the
//! `Closed` notification fire exactly once.

use crate::core::close::{
    CloseEvent, CLOSE_HEARTBEATS_MISSED, CLOSE_HELLO_FAILED, CLOSE_NORMAL, CLOSE_SEND_FAILED,
    CLOSE_WELCOME_TIMEOUT,
};
use crate::core::config::ConnectionOptions;
use crate::core::connection_state::{permitted, AtomicConnectionState, ConnectionState};
use crate::core::heartbeat::HeartbeatMonitor;
use crate::core::message::ProtocolMessage;
use crate::core::queue::OutgoingQueue;
use crate::core::state::StateMachine;
use crate::traits::{json_headers, NotificationService, TcmpError, Transport, TransportEvent};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior, Sleep};
use tracing::{debug, info, warn};

/// Topic subscribed once during the handshake to learn the session is ready
const SESSION_READY_TOPIC: &str = "tcmp.session.ready";
/// Channel the session-ready subscription rides on
const SESSION_READY_CHANNEL: &str = "transport";

/// Conventional abnormal-closure code used when the transport's event stream
/// ends without a session-ended signal
const CLOSE_TRANSPORT_LOST: u16 = 1006;

/// Application-side commands funneled into the event loop
#[derive(Debug)]
enum Command {
    /// Send a `msg` frame (or enqueue it while connecting)
    Send(Value),
    /// Graceful shutdown
    Close,
}

/// Public notifications emitted by a [`Connection`]
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// The hello/welcome handshake completed
    Opened,
    /// A `msg` frame arrived while open
    Message(Value),
    /// A non-fatal error (malformed frame, `bad` frame, unknown type,
    /// transport complaint)
    Error(TcmpError),
    /// The connection reached `closed`; `None` iff the close was normal
    Closed(Option<TcmpError>),
}

/// A client connection to a TCMP server
///
/// Constructed in `connecting`; the handshake, heartbeats, and close
/// classification run on a dedicated task. Handles are cheap to use from any
/// task: commands are fire-and-forget and state reads hit an atomic mirror.
pub struct Connection {
    /// Atomic mirror of the event loop's authoritative state
    state: Arc<AtomicConnectionState>,
    /// Attributes carried by the `welcome` frame, remembered for the session
    /// layer
    session_attributes: Arc<Mutex<Option<Value>>>,
    /// Opaque identity tagging session-scoped requests
    identity: String,
    /// Command channel into the event loop
    command_tx: mpsc::UnboundedSender<Command>,
    /// Public notification channel
    event_rx: Receiver<ConnectionEvent>,
    /// Event-loop task handle
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl Connection {
    /// Construct a connection and begin connecting.
    ///
    /// `transport_events` is the receiving half of the channel the transport
    /// implementation feeds; the loop task takes ownership of it. Must be
    /// called within a tokio runtime.
    pub fn new(
        server_url: impl Into<String>,
        options: ConnectionOptions,
        token: Option<String>,
        transport: Arc<dyn Transport>,
        transport_events: mpsc::UnboundedReceiver<TransportEvent>,
        notifications: Arc<dyn NotificationService>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = unbounded();
        let state = Arc::new(AtomicConnectionState::new(ConnectionState::Connecting));
        let session_attributes = Arc::new(Mutex::new(None));
        let identity = options.identity.clone().unwrap_or_else(generate_identity);

        let mut machine = StateMachine::new(ConnectionState::Connecting, permitted);
        {
            let mirror = Arc::clone(&state);
            let events = event_tx.clone();
            machine.observe(move |next, payload: &Option<TcmpError>| {
                mirror.set(next);
                match next {
                    ConnectionState::Open => {
                        let _ = events.send(ConnectionEvent::Opened);
                    }
                    ConnectionState::Closed => {
                        let _ = events.send(ConnectionEvent::Closed(payload.clone()));
                    }
                    ConnectionState::Connecting => {}
                }
            });
        }

        let heartbeat_cadence = options.requested_heartbeat_timeout;
        let monitor = HeartbeatMonitor::new(options.max_consecutive_missed_heartbeats);

        let task = ConnectionTask {
            server_url: server_url.into(),
            token,
            identity: identity.clone(),
            options,
            machine,
            queue: OutgoingQueue::new(),
            monitor,
            heartbeat_cadence,
            welcome_deadline: None,
            heartbeat_ticks: None,
            transport,
            notifications,
            event_tx,
            session_attributes: Arc::clone(&session_attributes),
        };

        let task_handle = tokio::spawn(task.run(transport_events, command_rx));

        Self {
            state,
            session_attributes,
            identity,
            command_tx,
            event_rx,
            task_handle: Some(task_handle),
        }
    }

    /// Send an application message (fire-and-forget).
    ///
    /// Queued while connecting, sent immediately while open, silently dropped
    /// after close.
    pub fn send_message(&self, body: Value) {
        let _ = self.command_tx.send(Command::Send(body));
    }

    /// Gracefully close the connection. Idempotent.
    pub fn close(&self) {
        let _ = self.command_tx.send(Command::Close);
    }

    /// Current connection state
    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Check if the handshake has completed
    #[inline]
    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Check if the connection has terminated
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// The connection identity established at construction
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Attributes carried by the `welcome` frame, if any arrived
    pub fn session_attributes(&self) -> Option<Value> {
        self.session_attributes.lock().clone()
    }

    /// Try to receive a notification (non-blocking)
    pub fn try_recv_event(&self) -> Option<ConnectionEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive a notification (blocking)
    pub fn recv_event(
        &self,
    ) -> std::result::Result<ConnectionEvent, crossbeam_channel::RecvError> {
        self.event_rx.recv()
    }

    /// Close and wait for the event-loop task to finish.
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
    }
}

fn generate_identity() -> String {
    format!("{:032x}", rand::random::<u128>())
}

/// Everything the event-loop task owns exclusively
struct ConnectionTask {
    server_url: String,
    token: Option<String>,
    identity: String,
    options: ConnectionOptions,
    machine: StateMachine<ConnectionState, Option<TcmpError>>,
    queue: OutgoingQueue,
    monitor: HeartbeatMonitor,
    /// Effective heartbeat cadence; the requested value until the `welcome`
    /// negotiates a different one
    heartbeat_cadence: Duration,
    /// Single-shot handshake deadline; armed at session-ready
    welcome_deadline: Option<Pin<Box<Sleep>>>,
    /// Heartbeat miss intervals; armed only while open
    heartbeat_ticks: Option<Interval>,
    transport: Arc<dyn Transport>,
    notifications: Arc<dyn NotificationService>,
    event_tx: Sender<ConnectionEvent>,
    session_attributes: Arc<Mutex<Option<Value>>>,
}

/// One serialized occurrence in the event loop
enum LoopEvent {
    Transport(Option<TransportEvent>),
    Command(Option<Command>),
    WelcomeDeadline,
    HeartbeatInterval,
}

impl ConnectionTask {
    async fn run(
        mut self,
        mut transport_events: mpsc::UnboundedReceiver<TransportEvent>,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        if let Err(error) = self.transport.connect(&self.server_url).await {
            warn!("transport connect failed: {error}");
            self.emit(ConnectionEvent::Error(error));
        }

        while self.machine.state() != ConnectionState::Closed {
            let event = tokio::select! {
                event = transport_events.recv() => LoopEvent::Transport(event),
                command = commands.recv() => LoopEvent::Command(command),
                () = Self::welcome_expired(&mut self.welcome_deadline) => LoopEvent::WelcomeDeadline,
                () = Self::heartbeat_tick(&mut self.heartbeat_ticks) => LoopEvent::HeartbeatInterval,
            };

            match event {
                LoopEvent::Transport(Some(TransportEvent::Established)) => {
                    debug!("transport established");
                }
                LoopEvent::Transport(Some(TransportEvent::SessionReady)) => {
                    self.begin_handshake().await;
                }
                LoopEvent::Transport(Some(TransportEvent::Frame(raw))) => {
                    self.dispatch_frame(&raw).await;
                }
                LoopEvent::Transport(Some(TransportEvent::SessionEnded { code, reason })) => {
                    self.close_with(CloseEvent::new(code, reason));
                }
                LoopEvent::Transport(Some(TransportEvent::Error(info))) => {
                    warn!("transport error: {info}");
                    self.emit(ConnectionEvent::Error(TcmpError::Transport(info)));
                }
                LoopEvent::Transport(None) => {
                    self.close_with(CloseEvent::new(
                        CLOSE_TRANSPORT_LOST,
                        "transport event stream ended",
                    ));
                }
                LoopEvent::Command(Some(Command::Send(body))) => {
                    self.send_or_enqueue(ProtocolMessage::Msg { body }).await;
                }
                LoopEvent::Command(Some(Command::Close)) | LoopEvent::Command(None) => {
                    self.close_requested().await;
                }
                LoopEvent::WelcomeDeadline => {
                    self.close_with(CloseEvent::new(CLOSE_WELCOME_TIMEOUT, "welcome timeout"));
                }
                LoopEvent::HeartbeatInterval => {
                    if self.monitor.record_miss() {
                        self.close_with(CloseEvent::new(
                            CLOSE_HEARTBEATS_MISSED,
                            "too many missed heartbeats",
                        ));
                    } else {
                        debug!(
                            "missed heartbeat {} of {}",
                            self.monitor.consecutive_misses(),
                            self.options.max_consecutive_missed_heartbeats
                        );
                    }
                }
            }
        }

        debug!("connection task exiting");
    }

    async fn welcome_expired(deadline: &mut Option<Pin<Box<Sleep>>>) {
        match deadline.as_mut() {
            // The elapsed check keeps a deadline that already fired (but lost
            // the select race that iteration) from being polled again.
            Some(sleep) if sleep.is_elapsed() => {}
            Some(sleep) => sleep.as_mut().await,
            None => std::future::pending().await,
        }
    }

    async fn heartbeat_tick(ticks: &mut Option<Interval>) {
        match ticks.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending().await,
        }
    }

    /// Start the hello/welcome exchange once the transport reports the
    /// session ready.
    async fn begin_handshake(&mut self) {
        if self.machine.state() != ConnectionState::Connecting {
            debug!("ignoring session-ready while {:?}", self.machine.state());
            return;
        }
        info!("session ready, starting hello/welcome handshake");

        // The deadline covers the subscribe + hello exchange so a wedged
        // handshake always resolves to a welcome-timeout close.
        self.welcome_deadline = Some(Box::pin(sleep(self.options.welcome_timeout)));

        if let Err(error) = self
            .notifications
            .subscribe(SESSION_READY_TOPIC, SESSION_READY_CHANNEL)
            .await
        {
            warn!("session-ready subscription failed: {error}");
            self.emit(ConnectionEvent::Error(error));
            return;
        }

        let hello = ProtocolMessage::Hello {
            id: self.identity.clone(),
            timeout_ms: u64::try_from(self.options.requested_heartbeat_timeout.as_millis())
                .unwrap_or(u64::MAX),
            token: self.token.clone(),
        };
        self.transmit(&hello).await;
    }

    async fn dispatch_frame(&mut self, raw: &str) {
        let message = match ProtocolMessage::decode(raw) {
            Ok(message) => message,
            Err(error) => {
                // A malformed frame is reported, not fatal.
                debug!("dropping malformed frame: {error}");
                self.emit(ConnectionEvent::Error(error));
                return;
            }
        };

        match message {
            ProtocolMessage::Welcome {
                session_attributes,
                negotiated_timeout_ms,
            } => {
                self.handle_welcome(session_attributes, negotiated_timeout_ms)
                    .await;
            }
            ProtocolMessage::Heartbeat => {
                self.monitor.record_heartbeat();
                if let Some(interval) = self.heartbeat_ticks.as_mut() {
                    interval.reset();
                }
            }
            ProtocolMessage::Msg { body } => {
                if self.machine.state() == ConnectionState::Open {
                    self.emit(ConnectionEvent::Message(body));
                } else {
                    debug!("dropping msg frame while {:?}", self.machine.state());
                }
            }
            ProtocolMessage::Bad { reason } => {
                // Before the handshake completes a `bad` frame is the
                // server rejecting the hello.
                if self.machine.state() == ConnectionState::Connecting {
                    self.close_with(CloseEvent::new(CLOSE_HELLO_FAILED, reason));
                } else {
                    self.emit(ConnectionEvent::Error(TcmpError::Protocol(reason)));
                }
            }
            ProtocolMessage::Bye => {
                // Informational; the authoritative close arrives as a
                // session-ended signal from the transport.
                debug!("peer signaled bye");
            }
            ProtocolMessage::Hello { .. } => {
                self.emit(ConnectionEvent::Error(TcmpError::Protocol(
                    "unexpected hello frame".to_string(),
                )));
            }
            ProtocolMessage::Unrecognized { kind } => {
                debug!("unknown message type: {kind}");
                self.emit(ConnectionEvent::Error(TcmpError::Protocol(format!(
                    "unknown message type: {kind}"
                ))));
            }
        }
    }

    async fn handle_welcome(
        &mut self,
        session_attributes: Option<Value>,
        negotiated_timeout_ms: Option<u64>,
    ) {
        if self.machine.state() != ConnectionState::Connecting {
            debug!("ignoring welcome while {:?}", self.machine.state());
            return;
        }
        self.welcome_deadline = None;

        if let Some(attributes) = session_attributes {
            *self.session_attributes.lock() = Some(attributes);
        }
        if let Some(timeout_ms) = negotiated_timeout_ms {
            self.heartbeat_cadence = Duration::from_millis(timeout_ms);
        }

        let mut ticks = interval_at(
            Instant::now() + self.heartbeat_cadence,
            self.heartbeat_cadence,
        );
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.heartbeat_ticks = Some(ticks);

        info!("handshake complete, connection open");
        self.machine.transition(ConnectionState::Open, None);

        // Flush queued messages in insertion order before any further
        // dispatch.
        for message in self.queue.drain() {
            if !self.transmit(&message).await {
                return;
            }
        }
    }

    async fn send_or_enqueue(&mut self, message: ProtocolMessage) {
        match self.machine.state() {
            ConnectionState::Closed => debug!("dropping outbound message after close"),
            ConnectionState::Open => {
                self.transmit(&message).await;
            }
            ConnectionState::Connecting => self.queue.enqueue(message),
        }
    }

    /// Send a frame immediately. A rejected send fatally closes the
    /// connection with [`CLOSE_SEND_FAILED`].
    async fn transmit(&mut self, message: &ProtocolMessage) -> bool {
        match self
            .transport
            .send(&self.server_url, &json_headers(), &message.encode())
            .await
        {
            Ok(()) => true,
            Err(error) => {
                warn!("closing: {CLOSE_SEND_FAILED} - {error}");
                self.close_with(CloseEvent::new(CLOSE_SEND_FAILED, "failed to send message"));
                false
            }
        }
    }

    /// Application-initiated close: best-effort `bye`, then the normal code.
    async fn close_requested(&mut self) {
        if self.machine.state() == ConnectionState::Closed {
            return;
        }
        if self.machine.state() == ConnectionState::Open {
            // Best-effort; the connection is closing either way.
            let bye = ProtocolMessage::Bye;
            if let Err(error) = self
                .transport
                .send(&self.server_url, &json_headers(), &bye.encode())
                .await
            {
                debug!("bye not delivered: {error}");
            }
        }
        self.transport.disconnect(CLOSE_NORMAL);
        self.close_with(CloseEvent::normal());
    }

    /// The single path into `closed`, regardless of trigger.
    fn close_with(&mut self, event: CloseEvent) {
        if self.machine.state() == ConnectionState::Closed {
            return;
        }
        let discarded = self.queue.discard();
        if discarded > 0 {
            debug!("discarded {discarded} queued messages");
        }
        self.welcome_deadline = None;
        self.heartbeat_ticks = None;

        if event.is_normal() {
            debug!("closed");
        } else {
            warn!("closed: {} - {}", event.code, event.reason);
        }
        self.machine.transition(ConnectionState::Closed, event.into_error());
    }

    fn emit(&self, event: ConnectionEvent) {
        // The receiver may be gone if the application dropped its handle.
        let _ = self.event_tx.send(event);
    }
}
