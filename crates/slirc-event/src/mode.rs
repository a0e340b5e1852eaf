//! Mode-string parsing.
//!
//! Splits a `MODE` change like `+ov-k alice bob key` into one [`ModeChange`]
//! per mode character, pairing parameters according to the server's
//! `PREFIX` and `CHANMODES` tables. Parsing is lenient: a missing parameter
//! yields `param: None` instead of an error, because the bouncer only
//! observes modes that a server already applied.

use crate::isupport::ServerSupport;

/// One mode toggle from a mode string.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModeChange {
    /// Mode character.
    pub mode: char,
    /// `true` for `+`, `false` for `-`.
    pub adding: bool,
    /// Parameter consumed by this mode, if any.
    pub param: Option<String>,
}

impl ModeChange {
    /// A parameterless change.
    pub fn flag(mode: char, adding: bool) -> Self {
        Self {
            mode,
            adding,
            param: None,
        }
    }

    /// A change carrying a parameter.
    pub fn with_param(mode: char, adding: bool, param: impl Into<String>) -> Self {
        Self {
            mode,
            adding,
            param: Some(param.into()),
        }
    }
}

/// Parse a channel mode string and its arguments.
///
/// A string without a leading sign is treated as `+`.
pub fn parse_channel_modes<S: AsRef<str>>(
    modestring: &str,
    args: &[S],
    support: &ServerSupport,
) -> Vec<ModeChange> {
    let mut args = args.iter().map(AsRef::as_ref);
    let mut adding = true;
    let mut out = Vec::new();

    for c in modestring.chars() {
        match c {
            '+' => adding = true,
            '-' => adding = false,
            mode => {
                let param = support
                    .mode_takes_param(mode, adding)
                    .then(|| args.next().map(str::to_owned))
                    .flatten();
                out.push(ModeChange {
                    mode,
                    adding,
                    param,
                });
            }
        }
    }
    out
}

/// Parse a user mode string. User modes never take parameters.
pub fn parse_user_modes(modestring: &str) -> Vec<ModeChange> {
    let mut adding = true;
    let mut out = Vec::new();
    for c in modestring.chars() {
        match c {
            '+' => adding = true,
            '-' => adding = false,
            mode => out.push(ModeChange::flag(mode, adding)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(modes: &str, args: &[&str]) -> Vec<ModeChange> {
        parse_channel_modes(modes, args, &ServerSupport::default())
    }

    #[test]
    fn prefix_modes_take_nicks() {
        assert_eq!(
            parse("+ov", &["alice", "bob"]),
            vec![
                ModeChange::with_param('o', true, "alice"),
                ModeChange::with_param('v', true, "bob"),
            ]
        );
    }

    #[test]
    fn mixed_signs_and_classes() {
        let changes = parse("+nt-o+l-l+k", &["alice", "10", "secret"]);
        assert_eq!(
            changes,
            vec![
                ModeChange::flag('n', true),
                ModeChange::flag('t', true),
                ModeChange::with_param('o', false, "alice"),
                ModeChange::with_param('l', true, "10"),
                ModeChange::flag('l', false),
                ModeChange::with_param('k', true, "secret"),
            ]
        );
    }

    #[test]
    fn missing_params_are_tolerated() {
        assert_eq!(parse("+b", &[]), vec![ModeChange::flag('b', true)]);
        assert_eq!(
            parse("+oo", &["alice"]),
            vec![
                ModeChange::with_param('o', true, "alice"),
                ModeChange::flag('o', true),
            ]
        );
    }

    #[test]
    fn unsigned_string_means_add() {
        assert_eq!(parse("m", &[]), vec![ModeChange::flag('m', true)]);
    }

    #[test]
    fn custom_prefix_table() {
        let mut support = ServerSupport::default();
        support.apply_tokens(&["PREFIX=(qaohv)~&@%+"]);
        let changes = parse_channel_modes("+qh", &["alice", "bob"], &support);
        assert_eq!(changes[0].param.as_deref(), Some("alice"));
        assert_eq!(changes[1].param.as_deref(), Some("bob"));
    }

    #[test]
    fn user_modes() {
        assert_eq!(
            parse_user_modes("+iw-x"),
            vec![
                ModeChange::flag('i', true),
                ModeChange::flag('w', true),
                ModeChange::flag('x', false),
            ]
        );
    }
}
