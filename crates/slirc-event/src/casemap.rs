//! IRC case-mapping functions.
//!
//! IRC compares nicknames and channel names case-insensitively, but what
//! counts as a case pair depends on the server. The server announces its rule
//! in the `CASEMAPPING` ISUPPORT token:
//!
//! - `ascii`: only `A-Z` / `a-z`
//! - `rfc1459`: ASCII plus `[]\~` / `{}|^`
//! - `strict-rfc1459`: ASCII plus `[]\` / `{}|`
//!
//! `rfc1459` is the historical default and is assumed until told otherwise.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Case-mapping rule advertised by a server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Casemapping {
    /// Only ASCII letters fold.
    Ascii,
    /// ASCII letters plus `[`/`{`, `]`/`}`, `\`/`|` and `~`/`^`.
    #[default]
    Rfc1459,
    /// Like `rfc1459` but `~` and `^` are distinct.
    StrictRfc1459,
}

/// Error for an unrecognised `CASEMAPPING` value.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown casemapping: {0}")]
pub struct ParseCasemappingError(pub String);

impl Casemapping {
    /// Fold a single character to its lower form under this mapping.
    #[inline]
    pub const fn lower_char(self, c: char) -> char {
        match c {
            'A'..='Z' => (c as u8 + 32) as char,
            '[' if !matches!(self, Casemapping::Ascii) => '{',
            ']' if !matches!(self, Casemapping::Ascii) => '}',
            '\\' if !matches!(self, Casemapping::Ascii) => '|',
            '~' if matches!(self, Casemapping::Rfc1459) => '^',
            _ => c,
        }
    }

    /// Fold a whole string. Used for map keys.
    pub fn fold(self, s: &str) -> String {
        s.chars().map(|c| self.lower_char(c)).collect()
    }

    /// Case-insensitive equality under this mapping.
    pub fn equals(self, a: &str, b: &str) -> bool {
        if a.len() != b.len() {
            return false;
        }
        a.chars()
            .zip(b.chars())
            .all(|(ca, cb)| self.lower_char(ca) == self.lower_char(cb))
    }

    /// The token value used in ISUPPORT.
    pub fn as_str(self) -> &'static str {
        match self {
            Casemapping::Ascii => "ascii",
            Casemapping::Rfc1459 => "rfc1459",
            Casemapping::StrictRfc1459 => "strict-rfc1459",
        }
    }
}

impl FromStr for Casemapping {
    type Err = ParseCasemappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ascii" => Ok(Casemapping::Ascii),
            "rfc1459" => Ok(Casemapping::Rfc1459),
            "strict-rfc1459" => Ok(Casemapping::StrictRfc1459),
            _ => Err(ParseCasemappingError(s.to_owned())),
        }
    }
}

impl fmt::Display for Casemapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
