//! Network sessions.
//!
//! A session is one actor task per network. [`SessionHandle`] is the only
//! way in: it sends control requests into the same inbox the transport
//! feeds, so a request observes every transport event queued before it.

mod actor;
mod command;

pub use command::{COMMANDS, Invocation};

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, warn};

use crate::archive::{ArchiveWriter, MessageArchive};
use crate::bus::EventBus;
use crate::config::{Config, NetworkConfig};
use crate::error::{CommandError, CommandResult};
use crate::state::NetworkState;
use crate::telemetry::spans;
use crate::transport::{EventSink, TransportEvent, TransportFactory};
use actor::SessionActor;

/// One inbox entry.
pub(crate) enum SessionInput {
    Transport(TransportEvent),
    Control(Control),
}

pub(crate) enum Control {
    State(oneshot::Sender<NetworkState>),
    Dispatch(Invocation, oneshot::Sender<CommandResult>),
    Connect(oneshot::Sender<CommandResult>),
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Queue sizing and timeouts.
#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub inbox_depth: usize,
    pub archive_queue_depth: usize,
    pub shutdown_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            inbox_depth: config.session.inbox_depth,
            archive_queue_depth: config.archive.queue_depth,
            shutdown_timeout: Duration::from_millis(config.session.shutdown_timeout_ms),
        }
    }
}

/// Shared services injected into every session.
#[derive(Clone)]
pub struct SessionServices {
    pub bus: EventBus,
    pub archive: Arc<dyn MessageArchive>,
    pub factory: Arc<dyn TransportFactory>,
    pub settings: SessionSettings,
}

/// Owner's handle to a running session. Dropping it stops the session.
pub struct SessionHandle {
    network: String,
    tx: mpsc::Sender<SessionInput>,
    cancel: CancellationToken,
    shutdown_timeout: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionHandle {
    /// Create the transport and start the actor. Does not connect.
    pub fn spawn(config: NetworkConfig, services: &SessionServices) -> Self {
        let settings = &services.settings;
        let (tx, rx) = mpsc::channel(settings.inbox_depth.max(1));
        let transport = services.factory.create(&config, EventSink::new(tx.clone()));
        let (writer, _) = ArchiveWriter::spawn(
            &config.network,
            services.archive.clone(),
            services.bus.clone(),
            settings.archive_queue_depth,
        );
        let cancel = CancellationToken::new();
        let network = config.network.clone();
        let actor = SessionActor::new(config, transport, writer, services.bus.clone());
        let task = tokio::spawn(
            actor
                .run(rx, cancel.clone())
                .instrument(spans::session(&network)),
        );
        Self {
            network,
            tx,
            cancel,
            shutdown_timeout: settings.shutdown_timeout,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// The actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Control) -> Option<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionInput::Control(make(reply)))
            .await
            .ok()?;
        rx.await.ok()
    }

    /// Current public state, `None` once the session has stopped.
    pub async fn state(&self) -> Option<NetworkState> {
        self.request(Control::State).await
    }

    /// Run a validated command on this session's transport.
    pub async fn dispatch(&self, invocation: Invocation) -> CommandResult {
        self.request(|reply| Control::Dispatch(invocation, reply))
            .await
            .unwrap_or(Err(CommandError::SessionClosed))
    }

    /// Ask the transport to connect.
    pub async fn connect(&self) -> CommandResult {
        self.request(Control::Connect)
            .await
            .unwrap_or(Err(CommandError::SessionClosed))
    }

    /// Wait until every event queued so far is processed and archived.
    pub async fn flush(&self) {
        let _ = self.request(Control::Flush).await;
    }

    /// Quit, release channels and stop the actor. Idempotent; gives up after
    /// the shutdown timeout instead of waiting on a stuck transport.
    pub async fn shutdown(&self) {
        let timeout = self.shutdown_timeout;
        if tokio::time::timeout(timeout, self.request(Control::Shutdown))
            .await
            .is_err()
        {
            warn!(network = %self.network, "Session did not stop in time, cancelling");
        }
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task
            && tokio::time::timeout(timeout, task).await.is_err()
        {
            warn!(network = %self.network, "Session task still running after cancel");
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
