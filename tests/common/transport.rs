//! Mock transport.
//!
//! Records every outbound primitive instead of writing to a socket. Inbound
//! traffic is played by the test through the [`EventSink`] the factory kept.

#![allow(dead_code)]

use dashmap::DashMap;
use parking_lot::Mutex;
use slirc_bnc::{EventSink, NetworkConfig, Transport, TransportError, TransportFactory};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One recorded outbound primitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Connect,
    Say { target: String, text: String },
    Notice { target: String, text: String },
    Action { target: String, text: String },
    Join { channel: String, key: Option<String> },
    Part { channel: String, reason: Option<String> },
    Nick(String),
    Topic { channel: String, topic: String },
    Quit(Option<String>),
    Raw(Vec<String>),
}

#[derive(Default)]
pub struct MockTransport {
    calls: Mutex<Vec<Call>>,
    offline: AtomicBool,
}

impl MockTransport {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Make every primitive except `quit` fail with `NotConnected`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn record(&self, call: Call) -> Result<(), TransportError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

impl Transport for MockTransport {
    fn connect(&self) -> Result<(), TransportError> {
        self.record(Call::Connect)
    }

    fn say(&self, target: &str, text: &str) -> Result<(), TransportError> {
        self.record(Call::Say {
            target: target.into(),
            text: text.into(),
        })
    }

    fn notice(&self, target: &str, text: &str) -> Result<(), TransportError> {
        self.record(Call::Notice {
            target: target.into(),
            text: text.into(),
        })
    }

    fn action(&self, target: &str, text: &str) -> Result<(), TransportError> {
        self.record(Call::Action {
            target: target.into(),
            text: text.into(),
        })
    }

    fn join(&self, channel: &str, key: Option<&str>) -> Result<(), TransportError> {
        self.record(Call::Join {
            channel: channel.into(),
            key: key.map(Into::into),
        })
    }

    fn part(&self, channel: &str, reason: Option<&str>) -> Result<(), TransportError> {
        self.record(Call::Part {
            channel: channel.into(),
            reason: reason.map(Into::into),
        })
    }

    fn change_nick(&self, nick: &str) -> Result<(), TransportError> {
        self.record(Call::Nick(nick.into()))
    }

    fn set_topic(&self, channel: &str, topic: &str) -> Result<(), TransportError> {
        self.record(Call::Topic {
            channel: channel.into(),
            topic: topic.into(),
        })
    }

    fn quit(&self, message: Option<&str>) -> Result<(), TransportError> {
        self.calls.lock().push(Call::Quit(message.map(Into::into)));
        Ok(())
    }

    fn raw(&self, args: &[String]) -> Result<(), TransportError> {
        self.record(Call::Raw(args.to_vec()))
    }
}

/// Keeps the newest transport and sink per network.
#[derive(Default)]
pub struct MockFactory {
    created: DashMap<String, (Arc<MockTransport>, EventSink)>,
}

impl MockFactory {
    pub fn transport(&self, network: &str) -> Arc<MockTransport> {
        self.created
            .get(network)
            .map(|e| e.0.clone())
            .unwrap_or_else(|| panic!("no transport created for {network}"))
    }

    pub fn sink(&self, network: &str) -> EventSink {
        self.created
            .get(network)
            .map(|e| e.1.clone())
            .unwrap_or_else(|| panic!("no transport created for {network}"))
    }

    pub fn calls(&self, network: &str) -> Vec<Call> {
        self.transport(network).calls()
    }
}

impl TransportFactory for MockFactory {
    fn create(&self, config: &NetworkConfig, sink: EventSink) -> Arc<dyn Transport> {
        let transport = Arc::new(MockTransport::default());
        self.created
            .insert(config.network.clone(), (transport.clone(), sink));
        transport
    }
}
