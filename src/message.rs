//! The canonical message record.
//!
//! Every classified protocol line, synthetic status line and outgoing echo
//! becomes one [`Message`]. The same record is archived and published, so
//! there is no per-command shape: command-specific data lives in
//! [`MessageMeta::params`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::msgid;

/// Which conversation a message was filed under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    /// A channel conversation.
    Channel,
    /// A private conversation with one other user.
    Dm,
    /// Addressed to something that is neither (server buffer).
    Server,
}

/// Command-specific and sender details.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ident: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Set exactly when [`Message::target`] is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
    /// Sender's membership modes in the channel when the message arrived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modes: Option<Vec<char>>,
    /// Membership symbols of a status message (`@` for `PRIVMSG @#chan`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Original three-digit code when `command` is a resolved numeric name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric: Option<String>,
    /// Parameters left after the target was consumed.
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// One archived/published unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// UUIDv7, time-ordered; doubles as the archive cursor.
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub network: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Sender nick, or server name for server-originated lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "self")]
    pub is_self: bool,
    pub meta: MessageMeta,
}

impl Message {
    /// A blank message with a fresh id and timestamp.
    pub fn new(network: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: msgid::generate(),
            timestamp: Utc::now(),
            network: network.into(),
            command: command.into(),
            target: None,
            source: None,
            content: None,
            is_self: false,
            meta: MessageMeta::default(),
        }
    }

    /// A server-buffer status line such as `NET_CONNECTED`.
    pub fn synthetic(
        network: impl Into<String>,
        command: impl Into<String>,
        content: Option<String>,
    ) -> Self {
        Self {
            content,
            ..Self::new(network, command)
        }
    }

    /// File this message under `target`.
    pub fn with_target(mut self, target: impl Into<String>, context: Context) -> Self {
        self.target = Some(target.into());
        self.meta.context = Some(context);
        self
    }

    /// Context, if the message has a target.
    pub fn context(&self) -> Option<Context> {
        self.meta.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_has_no_target_or_context() {
        let msg = Message::synthetic("local", "NET_CONNECTED", Some("me".into()));
        assert_eq!(msg.target, None);
        assert_eq!(msg.context(), None);
        assert!(!msg.is_self);
        assert!(msgid::is_valid(&msg.id));
    }

    #[test]
    fn serializes_with_wire_names() {
        let msg = Message::new("local", "PRIVMSG").with_target("#rust", Context::Channel);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["self"], false);
        assert_eq!(json["target"], "#rust");
        assert_eq!(json["meta"]["context"], "channel");
        assert!(json.get("content").is_none());
    }

    #[test]
    fn json_roundtrip_preserves_meta() {
        let mut msg = Message::new("local", "RPL_TOPIC").with_target("#rust", Context::Channel);
        msg.meta.numeric = Some("332".into());
        msg.meta.modes = Some(vec!['o', 'v']);
        msg.meta.params = vec!["Welcome".into()];
        let back: Message = serde_json::from_str(&serde_json::to_string(&msg).unwrap()).unwrap();
        assert_eq!(back, msg);
    }
}
