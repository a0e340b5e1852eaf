//! Live fan-out of messages, state snapshots and system events.
//!
//! One `tokio::sync::broadcast` topic. Publishing never waits: a subscriber
//! that falls more than `capacity` events behind is disconnected and the
//! others keep receiving. A subscription ends when its cancellation token
//! fires or its stream is dropped.

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::archive::RingBuffer;
use crate::message::Message;
use crate::state::{NetworkState, Status};
use crate::{metrics, msgid};

/// What subscribers receive: `{"type": "irc" | "state" | "system", "data": ...}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum BusEvent {
    Irc(Message),
    State(NetworkState),
    System(SystemEvent),
}

/// A lifecycle transition or operational problem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(flatten)]
    pub kind: SystemKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SystemKind {
    SessionCreated,
    SessionRemoved,
    StatusChanged {
        status: Status,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// The transport scheduled another connection attempt.
    Reconnecting {
        attempt: u32,
        max_retries: u32,
        wait_ms: u64,
    },
    /// The archive backend rejected a write; the message was still published.
    ArchiveFailed { message_id: String, error: String },
    /// The network's writer queue was full; the message was not archived.
    ArchiveDropped { message_id: String },
}

impl SystemEvent {
    pub fn new(network: Option<&str>, kind: SystemKind) -> Self {
        Self {
            id: msgid::generate(),
            timestamp: Utc::now(),
            network: network.map(str::to_owned),
            kind,
        }
    }
}

/// Cheap to clone; all clones share one topic.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BusEvent>,
    system: Arc<Mutex<RingBuffer<SystemEvent>>>,
}

impl EventBus {
    /// `capacity` bounds each subscriber's backlog; `system_buffer` is how
    /// many system events are kept for replay.
    pub fn new(capacity: usize, system_buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            system: Arc::new(Mutex::new(RingBuffer::new(system_buffer))),
        }
    }

    /// Fan out to current subscribers. Returns how many there were.
    pub fn publish(&self, event: BusEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn publish_message(&self, message: Message) -> usize {
        self.publish(BusEvent::Irc(message))
    }

    pub fn publish_state(&self, state: NetworkState) -> usize {
        self.publish(BusEvent::State(state))
    }

    /// Record a system event for replay and publish it.
    pub fn system(&self, network: Option<&str>, kind: SystemKind) {
        let event = SystemEvent::new(network, kind);
        self.system.lock().push(event.clone());
        self.publish(BusEvent::System(event));
    }

    /// Retained system events, oldest first.
    pub fn system_events(&self) -> Vec<SystemEvent> {
        self.system.lock().to_vec()
    }

    /// Subscriptions still holding a receiver. A cancelled subscription
    /// counts until its stream is polled once more or dropped.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Events published from now on, until `cancel` fires.
    ///
    /// The receiver is released when the stream ends or is dropped. Callers
    /// that cancel without polling again must drop the stream themselves.
    pub fn subscribe(&self, cancel: CancellationToken) -> BoxStream<'static, BusEvent> {
        let rx = self.tx.subscribe();
        stream::unfold((rx, cancel), |(mut rx, cancel)| async move {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                next = rx.recv() => next,
            };
            match next {
                Ok(event) => Some((event, (rx, cancel))),
                Err(RecvError::Lagged(skipped)) => {
                    metrics::record_bus_lagged();
                    warn!(skipped, "Bus subscriber fell behind, disconnecting");
                    None
                }
                Err(RecvError::Closed) => None,
            }
        })
        .boxed()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024, 100)
    }
}
