//! # slirc-event
//!
//! Vocabulary shared between an IRC transport and the slirc bouncer core.
//!
//! The transport owns the socket, line framing, registration and keep-alive.
//! What it hands upward is a [`RawEvent`] per protocol line: the command, its
//! parameters, the source prefix and the IRCv3 tags, already split apart.
//! Everything in this crate is pure and synchronous so it can be used from
//! the classifier hot path without locking or allocation surprises.
//!
//! ## Modules
//!
//! - [`casemap`]: case-insensitive comparison per the server's `CASEMAPPING`
//! - [`source`]: `nick!ident@host` / server-name source parsing
//! - [`ctcp`]: CTCP framing (`\x01ACTION ...\x01`)
//! - [`isupport`]: the `RPL_ISUPPORT` tokens the bouncer cares about
//! - [`mode`]: mode-string parsing against the server's mode tables
//! - [`numeric`]: numeric reply code to name table

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
pub mod ctcp;
pub mod isupport;
pub mod mode;
pub mod numeric;
pub mod source;

pub use casemap::{Casemapping, ParseCasemappingError};
pub use isupport::ServerSupport;
pub use mode::ModeChange;
pub use source::Source;

use std::collections::BTreeMap;

/// One protocol line as delivered by the transport.
///
/// Keep-alive traffic (PING/PONG) is expected to be filtered out before a
/// `RawEvent` is built, but consumers must tolerate it anyway.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawEvent {
    /// Command name or three-digit numeric, as received.
    pub command: String,
    /// Ordered parameters, trailing parameter included.
    pub params: Vec<String>,
    /// Source prefix without the leading `:`; empty when absent.
    pub source: String,
    /// IRCv3 message tags. Valueless tags map to an empty string.
    pub tags: BTreeMap<String, String>,
}

impl RawEvent {
    /// Build an event with no source and no tags.
    pub fn new<I, S>(command: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
            source: String::new(),
            tags: BTreeMap::new(),
        }
    }

    /// Set the source prefix.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Add a message tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Parameter at `index`, if present.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// True for PING/PONG, which carry no conversational state.
    pub fn is_keepalive(&self) -> bool {
        self.command.eq_ignore_ascii_case("PING") || self.command.eq_ignore_ascii_case("PONG")
    }

    /// True when the command is a three-digit numeric reply.
    pub fn is_numeric(&self) -> bool {
        numeric::parse_code(&self.command).is_some()
    }

    /// Parsed source prefix.
    pub fn parsed_source(&self) -> Source {
        Source::parse(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_params_and_tags() {
        let ev = RawEvent::new("PRIVMSG", ["#rust", "hi"])
            .with_source("nick!user@host")
            .with_tag("time", "2024-01-01T00:00:00.000Z");
        assert_eq!(ev.param(0), Some("#rust"));
        assert_eq!(ev.param(1), Some("hi"));
        assert_eq!(ev.param(2), None);
        assert_eq!(ev.tags.get("time").map(String::as_str), Some("2024-01-01T00:00:00.000Z"));
        assert_eq!(ev.parsed_source().nick(), Some("nick"));
    }

    #[test]
    fn keepalive_detection_ignores_case() {
        assert!(RawEvent::new("PING", ["x"]).is_keepalive());
        assert!(RawEvent::new("pong", ["x"]).is_keepalive());
        assert!(!RawEvent::new("PRIVMSG", ["x"]).is_keepalive());
    }

    #[test]
    fn numeric_detection() {
        assert!(RawEvent::new("001", ["me", "Welcome"]).is_numeric());
        assert!(!RawEvent::new("JOIN", ["#c"]).is_numeric());
        assert!(!RawEvent::new("01", ["x"]).is_numeric());
    }
}
