//! Per-network single-writer queue into the archive.
//!
//! Each session owns one [`ArchiveWriter`]. Writes for a network are applied
//! in submission order by one task, so the archive never sees a network's
//! messages reordered, and the session never waits on the backend.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, warn};

use super::MessageArchive;
use crate::bus::{EventBus, SystemKind};
use crate::message::Message;
use crate::metrics;

enum WriteOp {
    Store(Message),
    Flush(oneshot::Sender<()>),
}

pub struct ArchiveWriter {
    network: String,
    tx: mpsc::Sender<WriteOp>,
    bus: EventBus,
}

impl ArchiveWriter {
    /// Start the writer task. It exits once the writer is dropped and the
    /// queue is drained.
    pub fn spawn(
        network: &str,
        archive: Arc<dyn MessageArchive>,
        bus: EventBus,
        depth: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        let task = tokio::spawn(
            run(network.to_owned(), archive, bus.clone(), rx)
                .instrument(tracing::debug_span!("archive_writer", network = %network)),
        );
        let writer = Self {
            network: network.to_owned(),
            tx,
            bus,
        };
        (writer, task)
    }

    /// Queue a message. A full queue drops the write, never blocks.
    pub fn submit(&self, message: Message) {
        match self.tx.try_send(WriteOp::Store(message)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(WriteOp::Store(message))) => {
                metrics::record_archive_dropped();
                warn!(network = %self.network, id = %message.id, "Archive queue full, dropping write");
                self.bus.system(
                    Some(&self.network),
                    SystemKind::ArchiveDropped {
                        message_id: message.id,
                    },
                );
            }
            Err(_) => {
                warn!(network = %self.network, "Archive writer stopped, dropping write");
            }
        }
    }

    /// Wait until everything submitted so far has been written.
    pub async fn flush(&self) {
        let (reply, done) = oneshot::channel();
        if self.tx.send(WriteOp::Flush(reply)).await.is_ok() {
            let _ = done.await;
        }
    }
}

async fn run(
    network: String,
    archive: Arc<dyn MessageArchive>,
    bus: EventBus,
    mut rx: mpsc::Receiver<WriteOp>,
) {
    while let Some(op) = rx.recv().await {
        match op {
            WriteOp::Store(message) => {
                if let Err(e) = archive.store(&message).await {
                    metrics::record_archive_failure();
                    warn!(network = %network, id = %message.id, error = %e, "Archive write failed");
                    bus.system(
                        Some(&network),
                        SystemKind::ArchiveFailed {
                            message_id: message.id,
                            error: e.to_string(),
                        },
                    );
                }
            }
            WriteOp::Flush(reply) => {
                let _ = reply.send(());
            }
        }
    }
    debug!(network = %network, "Archive writer finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveError, ArchivePage, ArchiveQuery, MemoryArchive};
    use crate::bus::BusEvent;
    use async_trait::async_trait;
    use futures_util::StreamExt;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct FailingArchive;

    #[async_trait]
    impl MessageArchive for FailingArchive {
        async fn store(&self, _: &Message) -> Result<(), ArchiveError> {
            Err(ArchiveError::Corrupt {
                id: "x".into(),
                reason: "backend down".into(),
            })
        }
        async fn query(&self, _: &ArchiveQuery) -> Result<ArchivePage, ArchiveError> {
            Ok(ArchivePage::default())
        }
        async fn get(&self, _: &str) -> Result<Option<Message>, ArchiveError> {
            Ok(None)
        }
        async fn purge_network(&self, _: &str) -> Result<usize, ArchiveError> {
            Ok(0)
        }
        async fn prune(&self, _: Duration) -> Result<usize, ArchiveError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn writes_in_order_and_flushes() {
        let archive = Arc::new(MemoryArchive::default());
        let (writer, task) = ArchiveWriter::spawn("net", archive.clone(), EventBus::default(), 16);
        let sent: Vec<Message> = (0..5).map(|_| Message::new("net", "NOTICE")).collect();
        for m in &sent {
            writer.submit(m.clone());
        }
        writer.flush().await;

        let page = archive.query(&ArchiveQuery::new("net", None)).await.unwrap();
        let ids: Vec<_> = page.messages.into_iter().map(|m| m.id).collect();
        let expected: Vec<_> = sent.into_iter().map(|m| m.id).collect();
        assert_eq!(ids, expected);

        drop(writer);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn failures_surface_as_system_events() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe(CancellationToken::new());
        let (writer, _task) = ArchiveWriter::spawn("net", Arc::new(FailingArchive), bus.clone(), 4);
        let m = Message::new("net", "PRIVMSG");
        writer.submit(m.clone());
        writer.flush().await;

        match sub.next().await.unwrap() {
            BusEvent::System(event) => {
                assert_eq!(event.network.as_deref(), Some("net"));
                assert!(matches!(
                    event.kind,
                    SystemKind::ArchiveFailed { ref message_id, .. } if *message_id == m.id
                ));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
