//! slirc-bnc - Straylight IRC bouncer core
//!
//! Turns the parsed event stream of each IRC network connection into live
//! channel state, a bounded or durable message archive and a fan-out bus that
//! any number of front-ends can observe.
//!
//! The wire protocol is not here: a [`Transport`] implementation owns the
//! socket and feeds [`TransportEvent`]s into a session. [`Bouncer::start`]
//! wires everything else together.

pub mod archive;
pub mod bouncer;
pub mod bus;
pub mod classify;
pub mod config;
pub mod error;
pub mod message;
pub mod metrics;
pub mod msgid;
pub mod registry;
pub mod session;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod transport;

pub use archive::{ArchivePage, ArchiveQuery, MessageArchive};
pub use bouncer::Bouncer;
pub use bus::{BusEvent, EventBus, SystemEvent, SystemKind};
pub use config::{Config, NetworkConfig};
pub use error::{CommandError, DispatchResult, TransportError};
pub use message::{Context, Message};
pub use registry::{Attachment, SessionRegistry};
pub use session::{SessionHandle, SessionServices, SessionSettings};
pub use state::{NetworkState, Status};
pub use transport::{EventSink, Transport, TransportEvent, TransportFactory};

pub use slirc_event::{Casemapping, RawEvent};
