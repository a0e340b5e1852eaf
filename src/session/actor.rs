//! The per-network session actor.
//!
//! Owns all mutable session state and processes its inbox strictly in
//! arrival order: transport events and control requests share one queue.

use slirc_event::RawEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::command::Invocation;
use super::{Control, SessionInput};
use crate::archive::ArchiveWriter;
use crate::bus::{EventBus, SystemKind};
use crate::classify::{Outgoing, classify, outgoing};
use crate::config::NetworkConfig;
use crate::error::CommandResult;
use crate::message::Message;
use crate::metrics;
use crate::state::{NetworkState, SessionState, Status};
use crate::transport::{Transport, TransportEvent};

pub(super) struct SessionActor {
    config: NetworkConfig,
    status: Status,
    error: Option<String>,
    state: SessionState,
    transport: Arc<dyn Transport>,
    writer: ArchiveWriter,
    bus: EventBus,
}

impl SessionActor {
    pub(super) fn new(
        config: NetworkConfig,
        transport: Arc<dyn Transport>,
        writer: ArchiveWriter,
        bus: EventBus,
    ) -> Self {
        let state = SessionState::new(config.nick.clone());
        Self {
            config,
            status: Status::Disconnected,
            error: None,
            state,
            transport,
            writer,
            bus,
        }
    }

    pub(super) async fn run(
        mut self,
        mut rx: mpsc::Receiver<SessionInput>,
        cancel: CancellationToken,
    ) {
        debug!("Session started");
        let mut on_exit = None;
        loop {
            let input = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                input = rx.recv() => match input {
                    Some(input) => input,
                    None => break,
                },
            };
            match input {
                SessionInput::Transport(event) => self.on_transport(event),
                SessionInput::Control(Control::Shutdown(reply)) => {
                    on_exit = Some(reply);
                    break;
                }
                SessionInput::Control(control) => self.on_control(control).await,
            }
        }
        self.close().await;
        if let Some(reply) = on_exit {
            let _ = reply.send(());
        }
        debug!("Session stopped");
    }

    async fn on_control(&mut self, control: Control) {
        match control {
            Control::State(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Control::Dispatch(invocation, reply) => {
                let _ = reply.send(self.dispatch(&invocation));
            }
            Control::Connect(reply) => {
                let _ = reply.send(self.transport.connect().map_err(Into::into));
            }
            Control::Flush(reply) => {
                self.writer.flush().await;
                let _ = reply.send(());
            }
            Control::Shutdown(reply) => {
                let _ = reply.send(());
            }
        }
    }

    fn on_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Raw(raw) => self.on_raw(raw),
            TransportEvent::Connecting => {
                self.set_status(Status::Connecting, None);
                self.emit_synthetic("NET_CONNECTING", Some(self.config.address()));
            }
            TransportEvent::Registered { nick } => {
                self.state.user.nick = nick.clone();
                self.set_status(Status::Connected, None);
                self.emit_synthetic("NET_CONNECTED", Some(nick));
                self.auto_join();
            }
            TransportEvent::SocketClose { error } => {
                self.set_status(Status::Disconnected, error.clone());
                self.emit_synthetic("NET_CLOSE", error);
            }
            TransportEvent::SocketError { error } => {
                self.set_status(Status::Disconnected, Some(error.clone()));
                self.emit_synthetic("NET_ERROR", Some(error));
            }
            TransportEvent::Reconnecting {
                attempt,
                max_retries,
                wait_ms,
            } => {
                info!(attempt, max_retries, wait_ms, "Reconnecting");
                self.bus.system(
                    Some(&self.config.network),
                    SystemKind::Reconnecting {
                        attempt,
                        max_retries,
                        wait_ms,
                    },
                );
                self.emit_synthetic(
                    "NET_RECONNECTING",
                    Some(format!(
                        "attempt {attempt}/{max_retries}, waiting {wait_ms}ms"
                    )),
                );
            }
            TransportEvent::Close => {
                self.set_status(Status::Disconnected, self.error.clone());
                self.emit_synthetic("NET_DISCONNECTED", None);
            }
        }
    }

    fn on_raw(&mut self, raw: RawEvent) {
        if raw.is_keepalive() {
            return;
        }
        trace!(command = %raw.command, params = ?raw.params, source = %raw.source, "Raw event");
        metrics::record_event(&self.config.network);

        let applied = self.state.apply(&raw);
        let message = classify(
            &self.config.network,
            &raw,
            &self.state.view(applied.previous_nick.as_deref()),
        );
        self.emit(message);
        if applied.changed {
            self.publish_state();
        }
    }

    fn dispatch(&mut self, invocation: &Invocation) -> CommandResult {
        invocation.execute(self.transport.as_ref(), self.config.quit_message.as_deref())?;
        if let Some((command, target, text)) = invocation.echo() {
            let user = &self.state.user;
            let echo = outgoing(
                &self.config.network,
                Outgoing {
                    command,
                    target,
                    text,
                    ident: user.ident.as_deref(),
                    host: user.host.as_deref(),
                },
                &self.state.view(None),
            );
            self.emit(echo);
        }
        Ok(())
    }

    fn auto_join(&self) {
        for (channel, key) in self.config.auto_join_channels() {
            if let Err(e) = self.transport.join(channel, key) {
                warn!(channel = %channel, error = %e, "Auto-join failed");
            }
        }
    }

    fn set_status(&mut self, status: Status, error: Option<String>) {
        if status == Status::Disconnected {
            self.state.on_disconnect();
        }
        if status != self.status {
            info!(from = self.status.as_str(), to = status.as_str(), "Status changed");
        }
        self.status = status;
        self.error = error.clone();
        self.bus.system(
            Some(&self.config.network),
            SystemKind::StatusChanged { status, error },
        );
        self.publish_state();
    }

    fn emit_synthetic(&self, command: &str, content: Option<String>) {
        self.emit(Message::synthetic(&self.config.network, command, content));
    }

    /// Archive, then publish. Archiving never delays the live copy.
    fn emit(&self, message: Message) {
        self.writer.submit(message.clone());
        self.bus.publish_message(message);
    }

    fn publish_state(&self) {
        self.bus.publish_state(self.snapshot());
    }

    fn snapshot(&self) -> NetworkState {
        NetworkState {
            network: self.config.network.clone(),
            status: self.status,
            user: (self.status == Status::Connected).then(|| self.state.user.to_state()),
            channels: self.state.channel_states(),
            config: self.config.public(),
            error: self.error.clone(),
        }
    }

    /// Quit, release channels and drain pending archive writes. Safe on a
    /// transport that is already gone.
    async fn close(&mut self) {
        if let Err(e) = self.transport.quit(self.config.quit_message.as_deref()) {
            debug!(error = %e, "Quit on shutdown failed");
        }
        self.state.clear_channels();
        self.status = Status::Disconnected;
        self.writer.flush().await;
    }
}
