//! `RPL_NAMREPLY` (353) aggregation.
//!
//! A NAMES listing spans any number of 353 lines and ends with 366. Entries
//! are buffered per channel and handed to the tracker as one roster when the
//! end marker arrives.

use slirc_event::{Casemapping, ServerSupport, Source};
use std::collections::HashMap;

use super::channel::ChannelMember;

#[derive(Debug, Default)]
pub struct NamesAccumulator {
    pending: HashMap<String, Vec<ChannelMember>>,
}

impl NamesAccumulator {
    /// Buffer one 353 line's space-separated entries.
    pub fn push(&mut self, channel: &str, names: &str, support: &ServerSupport) {
        let key = support.casemapping.fold(channel);
        let entries = self.pending.entry(key).or_default();
        entries.extend(names.split_whitespace().filter_map(|e| parse_entry(e, support)));
    }

    /// Take the buffered roster for `channel` (366). Empty if nothing was buffered.
    pub fn finish(&mut self, channel: &str, casemapping: Casemapping) -> Vec<ChannelMember> {
        self.pending
            .remove(&casemapping.fold(channel))
            .unwrap_or_default()
    }

    /// Drop everything buffered (connection lost mid-listing).
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Parse `@+nick` or, with userhost-in-names, `@nick!ident@host`.
fn parse_entry(entry: &str, support: &ServerSupport) -> Option<ChannelMember> {
    let mut modes = Vec::new();
    let mut rest = entry;
    while let Some(c) = rest.chars().next() {
        let Some(mode) = support.mode_for_symbol(c) else {
            break;
        };
        if !modes.contains(&mode) {
            modes.push(mode);
        }
        rest = &rest[c.len_utf8()..];
    }
    if rest.is_empty() {
        return None;
    }
    let mut member = match Source::parse(rest) {
        Source::User { nick, ident, host } => ChannelMember {
            nick,
            ident,
            hostname: host,
            modes: Vec::new(),
        },
        _ => ChannelMember::new(rest),
    };
    member.modes = modes;
    Some(member)
}
