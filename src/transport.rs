//! Boundary with the IRC connection.
//!
//! The wire protocol (sockets, TLS, framing, CAP/SASL, keep-alive, line
//! parsing, reconnect backoff) lives behind [`Transport`]. A transport pushes
//! everything it observes into its session's [`EventSink`]; the session reads
//! those events, and its own control messages, from one ordered inbox.

use slirc_event::RawEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::config::NetworkConfig;
use crate::error::TransportError;
use crate::session::SessionInput;

/// Everything a transport reports about its connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// One parsed protocol line.
    Raw(RawEvent),
    /// A connection attempt started.
    Connecting,
    /// Registration completed under `nick`.
    Registered { nick: String },
    /// The socket closed, possibly with an error.
    SocketClose { error: Option<String> },
    SocketError { error: String },
    /// The transport scheduled reconnect attempt `attempt` of `max_retries`.
    Reconnecting {
        attempt: u32,
        max_retries: u32,
        wait_ms: u64,
    },
    /// The transport gave up or was told to quit. Terminal until `connect`.
    Close,
}

/// Outbound primitives. Calls must not block; a transport queues the line
/// and returns.
pub trait Transport: Send + Sync {
    fn connect(&self) -> Result<(), TransportError>;
    fn say(&self, target: &str, text: &str) -> Result<(), TransportError>;
    fn notice(&self, target: &str, text: &str) -> Result<(), TransportError>;
    fn action(&self, target: &str, text: &str) -> Result<(), TransportError>;
    fn join(&self, channel: &str, key: Option<&str>) -> Result<(), TransportError>;
    fn part(&self, channel: &str, reason: Option<&str>) -> Result<(), TransportError>;
    fn change_nick(&self, nick: &str) -> Result<(), TransportError>;
    fn set_topic(&self, channel: &str, topic: &str) -> Result<(), TransportError>;
    fn quit(&self, message: Option<&str>) -> Result<(), TransportError>;
    fn raw(&self, args: &[String]) -> Result<(), TransportError>;
}

/// Builds one transport per session.
pub trait TransportFactory: Send + Sync {
    fn create(&self, config: &NetworkConfig, sink: EventSink) -> Arc<dyn Transport>;
}

/// Sending half of a session's inbox, handed to its transport.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: mpsc::Sender<SessionInput>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::Sender<SessionInput>) -> Self {
        Self { tx }
    }

    /// Deliver an event, waiting for inbox capacity.
    pub async fn send(&self, event: TransportEvent) -> Result<(), TransportError> {
        self.tx
            .send(SessionInput::Transport(event))
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Deliver an event without waiting; fails when the inbox is full.
    pub fn try_send(&self, event: TransportEvent) -> Result<(), TransportError> {
        self.tx
            .try_send(SessionInput::Transport(event))
            .map_err(|e| match e {
                TrySendError::Full(_) => TransportError::InboxFull,
                TrySendError::Closed(_) => TransportError::Closed,
            })
    }

    /// Deliver from a non-async thread. Must not be called on a runtime thread.
    pub fn blocking_send(&self, event: TransportEvent) -> Result<(), TransportError> {
        self.tx
            .blocking_send(SessionInput::Transport(event))
            .map_err(|_| TransportError::Closed)
    }

    /// The session is gone; further events are discarded.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
