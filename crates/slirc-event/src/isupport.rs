//! The subset of `RPL_ISUPPORT` (005) the bouncer tracks.
//!
//! Servers announce their comparison and mode rules in 005 tokens. The
//! classifier and channel trackers need four of them:
//!
//! - `CASEMAPPING`: nickname/channel comparison rule
//! - `CHANTYPES`: which leading characters mark a channel name
//! - `PREFIX`: membership modes and their display symbols, e.g. `(ov)@+`
//! - `CHANMODES`: which channel modes take a parameter
//!
//! # Reference
//! - Modern IRC documentation: <https://modern.ircdocs.horse/isupport.html>

use crate::casemap::Casemapping;

const DEFAULT_CHANTYPES: &str = "#&";
const DEFAULT_PREFIX: &str = "(ov)@+";
const DEFAULT_CHANMODES: &str = "beI,k,l,imnpst";

/// Channel mode classes from the `CHANMODES` token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChanModes {
    /// Type A: list modes, always take a parameter.
    pub list: String,
    /// Type B: always take a parameter.
    pub always: String,
    /// Type C: take a parameter only when set.
    pub on_set: String,
    /// Type D: never take a parameter.
    pub flags: String,
}

impl ChanModes {
    /// Parse a `CHANMODES` value like `beI,k,l,imnpst`.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split(',');
        let list = parts.next()?.to_owned();
        let always = parts.next().unwrap_or_default().to_owned();
        let on_set = parts.next().unwrap_or_default().to_owned();
        let flags = parts.next().unwrap_or_default().to_owned();
        Some(Self {
            list,
            always,
            on_set,
            flags,
        })
    }
}

impl Default for ChanModes {
    fn default() -> Self {
        // The default literal always parses.
        Self::parse(DEFAULT_CHANMODES).unwrap_or(Self {
            list: String::new(),
            always: String::new(),
            on_set: String::new(),
            flags: String::new(),
        })
    }
}

/// Server rules relevant to state tracking, with RFC defaults until 005 says
/// otherwise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerSupport {
    /// Active casemapping.
    pub casemapping: Casemapping,
    /// Channel-name prefix characters.
    pub chantypes: String,
    /// Membership modes in rank order, paired with their symbol.
    pub prefix: Vec<(char, char)>,
    /// Channel mode classes.
    pub chanmodes: ChanModes,
    /// Network name, if announced.
    pub network: Option<String>,
}

impl Default for ServerSupport {
    fn default() -> Self {
        Self {
            casemapping: Casemapping::default(),
            chantypes: DEFAULT_CHANTYPES.to_owned(),
            prefix: parse_prefix(DEFAULT_PREFIX).unwrap_or_default(),
            chanmodes: ChanModes::default(),
            network: None,
        }
    }
}

impl ServerSupport {
    /// Apply the tokens of one 005 line.
    ///
    /// `tokens` are the parameters after the target nick; a trailing
    /// human-readable parameter (containing a space) is ignored. `-TOKEN`
    /// restores the default.
    pub fn apply_tokens<S: AsRef<str>>(&mut self, tokens: &[S]) {
        for token in tokens.iter().map(AsRef::as_ref) {
            if token.contains(' ') {
                continue;
            }
            if let Some(negated) = token.strip_prefix('-') {
                self.reset(negated);
                continue;
            }
            let (key, value) = match token.split_once('=') {
                Some((k, v)) => (k, v),
                None => (token, ""),
            };
            match key.to_ascii_uppercase().as_str() {
                "CASEMAPPING" => {
                    if let Ok(cm) = value.parse() {
                        self.casemapping = cm;
                    }
                }
                "CHANTYPES" => self.chantypes = value.to_owned(),
                "PREFIX" => {
                    if let Some(prefix) = parse_prefix(value) {
                        self.prefix = prefix;
                    } else if value.is_empty() {
                        self.prefix.clear();
                    }
                }
                "CHANMODES" => {
                    if let Some(modes) = ChanModes::parse(value) {
                        self.chanmodes = modes;
                    }
                }
                "NETWORK" if !value.is_empty() => self.network = Some(value.to_owned()),
                _ => {}
            }
        }
    }

    fn reset(&mut self, key: &str) {
        let defaults = Self::default();
        match key.to_ascii_uppercase().as_str() {
            "CASEMAPPING" => self.casemapping = defaults.casemapping,
            "CHANTYPES" => self.chantypes = defaults.chantypes,
            "PREFIX" => self.prefix = defaults.prefix,
            "CHANMODES" => self.chanmodes = defaults.chanmodes,
            "NETWORK" => self.network = None,
            _ => {}
        }
    }

    /// True when `name` starts with one of the `CHANTYPES` characters.
    pub fn is_channel_name(&self, name: &str) -> bool {
        name.chars()
            .next()
            .is_some_and(|c| self.chantypes.contains(c))
            && name.len() > 1
    }

    /// True for membership modes such as `o` and `v`.
    pub fn is_prefix_mode(&self, mode: char) -> bool {
        self.prefix.iter().any(|&(m, _)| m == mode)
    }

    /// Membership mode for a display symbol (`@` -> `o`).
    pub fn mode_for_symbol(&self, symbol: char) -> Option<char> {
        self.prefix
            .iter()
            .find(|&&(_, s)| s == symbol)
            .map(|&(m, _)| m)
    }

    /// Display symbol for a membership mode (`o` -> `@`).
    pub fn symbol_for_mode(&self, mode: char) -> Option<char> {
        self.prefix
            .iter()
            .find(|&&(m, _)| m == mode)
            .map(|&(_, s)| s)
    }

    /// Whether `mode` consumes a parameter in the given direction.
    pub fn mode_takes_param(&self, mode: char, adding: bool) -> bool {
        let cm = &self.chanmodes;
        if self.is_prefix_mode(mode) || cm.list.contains(mode) || cm.always.contains(mode) {
            return true;
        }
        adding && cm.on_set.contains(mode)
    }

    /// Split leading membership symbols off a status-message target.
    ///
    /// `@#ops` yields `("@", "#ops")`. Returns `None` unless at least one
    /// symbol was stripped and the remainder is a channel name.
    pub fn split_status_target<'a>(&self, target: &'a str) -> Option<(&'a str, &'a str)> {
        let rest = target.trim_start_matches(|c| self.mode_for_symbol(c).is_some());
        let stripped = target.len() - rest.len();
        (stripped > 0 && self.is_channel_name(rest)).then(|| (&target[..stripped], rest))
    }
}

/// Parse a `PREFIX` value like `(ov)@+` into `(mode, symbol)` pairs.
pub fn parse_prefix(s: &str) -> Option<Vec<(char, char)>> {
    let inner = s.strip_prefix('(')?;
    let (modes, symbols) = inner.split_once(')')?;
    if modes.chars().count() != symbols.chars().count() || modes.is_empty() {
        return None;
    }
    Some(modes.chars().zip(symbols.chars()).collect())
}
