//! CTCP (Client-to-Client Protocol) framing.
//!
//! CTCP messages ride inside PRIVMSG/NOTICE text, wrapped in `\x01`:
//!
//! ```text
//! PRIVMSG #channel :\x01ACTION waves\x01
//! ```
//!
//! Some clients drop the trailing delimiter, so it is optional when parsing.
//!
//! # Reference
//! - CTCP specification: <https://modern.ircdocs.horse/ctcp.html>

use std::fmt;

/// The CTCP delimiter character (`\x01`).
pub const CTCP_DELIM: char = '\x01';

/// A parsed CTCP message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ctcp<'a> {
    /// CTCP command, as sent (e.g. `ACTION`, `VERSION`).
    pub command: &'a str,
    /// Text after the command, if any.
    pub params: Option<&'a str>,
}

impl<'a> Ctcp<'a> {
    /// Parse a CTCP body. Returns `None` unless the text starts with `\x01`.
    pub fn parse(text: &'a str) -> Option<Self> {
        let text = text.strip_prefix(CTCP_DELIM)?;
        let text = text.strip_suffix(CTCP_DELIM).unwrap_or(text);
        if text.is_empty() {
            return None;
        }
        let (command, params) = match text.split_once(' ') {
            Some((command, params)) => (command, Some(params)),
            None => (text, None),
        };
        Some(Self { command, params })
    }

    /// True for `ACTION` (the `/me` command).
    pub fn is_action(&self) -> bool {
        self.command.eq_ignore_ascii_case("ACTION")
    }
}

impl fmt::Display for Ctcp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.params {
            Some(params) => write!(f, "{d}{} {}{d}", self.command, params, d = CTCP_DELIM),
            None => write!(f, "{d}{}{d}", self.command, d = CTCP_DELIM),
        }
    }
}

/// Unwrap the text of a CTCP ACTION, or `None` if `text` is not one.
///
/// ```
/// use slirc_event::ctcp::action_text;
///
/// assert_eq!(action_text("\x01ACTION waves\x01"), Some("waves"));
/// assert_eq!(action_text("plain text"), None);
/// ```
pub fn action_text(text: &str) -> Option<&str> {
    let ctcp = Ctcp::parse(text)?;
    ctcp.is_action().then(|| ctcp.params.unwrap_or(""))
}

/// Wrap `text` as a CTCP ACTION body.
pub fn action(text: &str) -> String {
    Ctcp {
        command: "ACTION",
        params: Some(text),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_action() {
        let ctcp = Ctcp::parse("\x01ACTION waves hello\x01").unwrap();
        assert!(ctcp.is_action());
        assert_eq!(ctcp.params, Some("waves hello"));
    }

    #[test]
    fn trailing_delimiter_is_optional() {
        assert_eq!(action_text("\x01ACTION dances"), Some("dances"));
    }

    #[test]
    fn empty_action() {
        assert_eq!(action_text("\x01ACTION\x01"), Some(""));
        assert_eq!(action_text("\x01ACTION \x01"), Some(""));
    }

    #[test]
    fn other_ctcp_is_not_an_action() {
        assert_eq!(action_text("\x01VERSION\x01"), None);
        let ctcp = Ctcp::parse("\x01PING 12345\x01").unwrap();
        assert_eq!(ctcp.command, "PING");
        assert_eq!(ctcp.params, Some("12345"));
    }

    #[test]
    fn not_ctcp() {
        assert_eq!(Ctcp::parse("hello"), None);
        assert_eq!(Ctcp::parse("\x01\x01"), None);
        assert_eq!(Ctcp::parse(""), None);
    }

    #[test]
    fn wrap_action() {
        assert_eq!(action("dances"), "\x01ACTION dances\x01");
        assert_eq!(action_text(&action("spins around")), Some("spins around"));
    }
}
