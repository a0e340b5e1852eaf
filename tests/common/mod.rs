//! Integration test common infrastructure.
//!
//! Provides a recording mock transport and a harness that owns a registry
//! wired to an in-memory archive, so tests can play transport events into a
//! session and assert on what came out.

pub mod harness;
pub mod transport;

#[allow(unused_imports)]
pub use harness::Harness;
#[allow(unused_imports)]
pub use transport::{Call, MockFactory, MockTransport};
