//! Message source parsing.
//!
//! A source is either a user mask (`nick!ident@host`) or a bare server name.
//! The bouncer only needs the distinction and the three user components, so
//! parsing is lenient: nothing is validated, nothing fails.

/// Parsed origin of a protocol line.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    /// No source prefix on the line.
    None,
    /// A server name (no `!` present).
    Server(String),
    /// A user mask. `ident`/`host` are `None` when missing from the mask.
    User {
        /// Nickname before `!`.
        nick: String,
        /// Ident between `!` and `@`.
        ident: Option<String>,
        /// Hostname after `@`.
        host: Option<String>,
    },
}

impl Source {
    /// Split a source string. Without a `!` the whole string is a server name.
    pub fn parse(s: &str) -> Self {
        if s.is_empty() {
            return Source::None;
        }
        let Some((nick, rest)) = s.split_once('!') else {
            return Source::Server(s.to_owned());
        };
        let (ident, host) = match rest.split_once('@') {
            Some((ident, host)) => (ident, Some(host)),
            None => (rest, None),
        };
        Source::User {
            nick: nick.to_owned(),
            ident: non_empty(ident),
            host: host.and_then(non_empty),
        }
    }

    /// Nickname, for user sources only.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Source::User { nick, .. } if !nick.is_empty() => Some(nick),
            _ => None,
        }
    }

    /// Ident, for user sources that carry one.
    pub fn ident(&self) -> Option<&str> {
        match self {
            Source::User { ident, .. } => ident.as_deref(),
            _ => None,
        }
    }

    /// Hostname, for user sources that carry one.
    pub fn host(&self) -> Option<&str> {
        match self {
            Source::User { host, .. } => host.as_deref(),
            _ => None,
        }
    }

    /// Display name: the nick for users, the server name for servers.
    pub fn name(&self) -> Option<&str> {
        match self {
            Source::None => None,
            Source::Server(name) => Some(name),
            Source::User { nick, .. } => Some(nick),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_user_mask() {
        let src = Source::parse("alice!a@example.com");
        assert_eq!(src.nick(), Some("alice"));
        assert_eq!(src.ident(), Some("a"));
        assert_eq!(src.host(), Some("example.com"));
        assert_eq!(src.name(), Some("alice"));
    }

    #[test]
    fn mask_without_host() {
        let src = Source::parse("bob!b");
        assert_eq!(src.nick(), Some("bob"));
        assert_eq!(src.ident(), Some("b"));
        assert_eq!(src.host(), None);
    }

    #[test]
    fn server_name() {
        let src = Source::parse("irc.example.net");
        assert_eq!(src, Source::Server("irc.example.net".into()));
        assert_eq!(src.nick(), None);
        assert_eq!(src.name(), Some("irc.example.net"));
    }

    #[test]
    fn bare_name_is_a_server() {
        assert_eq!(Source::parse("services"), Source::Server("services".into()));
    }

    #[test]
    fn empty_source() {
        assert_eq!(Source::parse(""), Source::None);
        assert_eq!(Source::None.name(), None);
    }

    #[test]
    fn at_sign_in_host_part_is_kept() {
        let src = Source::parse("n!i@h@x");
        assert_eq!(src.ident(), Some("i"));
        assert_eq!(src.host(), Some("h@x"));
    }
}
