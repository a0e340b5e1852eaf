//! Per-channel state tracking.
//!
//! A [`ChannelTracker`] is fed tracker operations derived from raw events
//! (see [`super::SessionState::apply`]) and keeps membership, topic and
//! modes. It never talks to the network; it only records what the server
//! told us.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use slirc_event::mode::ModeChange;
use slirc_event::{Casemapping, ServerSupport};
use std::collections::BTreeMap;

/// One user in a channel roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMember {
    pub nick: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ident: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Membership modes (`o`, `v`, ...), no duplicates.
    #[serde(default)]
    pub modes: Vec<char>,
}

impl ChannelMember {
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            ident: None,
            hostname: None,
            modes: Vec::new(),
        }
    }
}

/// Detached copy of a channel's state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelState {
    pub name: String,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_set_by: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_set_at: Option<i64>,
    pub modes: Vec<char>,
    pub users: Vec<ChannelMember>,
    /// `false` with a non-empty roster means "left, last known roster kept".
    pub joined: bool,
}

/// Mutable state of one channel on one network.
#[derive(Clone, Debug)]
pub struct ChannelTracker {
    name: String,
    casemapping: Casemapping,
    topic: String,
    topic_set_by: Option<String>,
    topic_set_at: Option<i64>,
    modes: Vec<char>,
    /// Keyed by case-folded nick.
    members: BTreeMap<String, ChannelMember>,
    joined: bool,
}

impl ChannelTracker {
    pub fn new(name: impl Into<String>, casemapping: Casemapping) -> Self {
        Self {
            name: name.into(),
            casemapping,
            topic: String::new(),
            topic_set_by: None,
            topic_set_at: None,
            modes: Vec::new(),
            members: BTreeMap::new(),
            joined: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    fn key(&self, nick: &str) -> String {
        self.casemapping.fold(nick)
    }

    fn is_own(&self, nick: &str, own_nick: &str) -> bool {
        self.casemapping.equals(nick, own_nick)
    }

    /// Someone joined. Our own join marks the channel joined.
    pub fn join(
        &mut self,
        nick: &str,
        ident: Option<&str>,
        host: Option<&str>,
        own_nick: &str,
    ) {
        if self.is_own(nick, own_nick) {
            self.joined = true;
            return;
        }
        let key = self.key(nick);
        let member = self
            .members
            .entry(key)
            .or_insert_with(|| ChannelMember::new(nick));
        member.nick = nick.to_owned();
        member.ident = ident.map(str::to_owned);
        member.hostname = host.map(str::to_owned);
    }

    /// Someone left. Our own part keeps the roster as last known.
    pub fn part(&mut self, nick: &str, own_nick: &str) {
        if self.is_own(nick, own_nick) {
            self.joined = false;
        } else {
            let key = self.key(nick);
            self.members.remove(&key);
        }
    }

    /// Connection lost; the roster stays as last known.
    pub fn detach(&mut self) {
        self.joined = false;
    }

    /// Someone was kicked. Same bookkeeping as a part.
    pub fn kick(&mut self, kicked: &str, own_nick: &str) {
        self.part(kicked, own_nick);
    }

    /// Remove a quitting user. Returns whether they were listed here.
    pub fn quit(&mut self, nick: &str) -> bool {
        let key = self.key(nick);
        self.members.remove(&key).is_some()
    }

    /// Rename a member in place. Returns whether the old nick was listed.
    pub fn nick(&mut self, old: &str, new: &str) -> bool {
        let old_key = self.key(old);
        let Some(mut member) = self.members.remove(&old_key) else {
            return false;
        };
        member.nick = new.to_owned();
        let key = self.key(new);
        self.members.insert(key, member);
        true
    }

    /// Replace the roster wholesale after a NAMES sync.
    pub fn userlist(&mut self, members: Vec<ChannelMember>) {
        self.members = members
            .into_iter()
            .map(|m| (self.casemapping.fold(&m.nick), m))
            .collect();
    }

    /// Replace the topic. An empty topic clears who set it and when.
    pub fn topic(&mut self, text: &str, set_by: Option<&str>, set_at: Option<i64>) {
        self.topic = text.to_owned();
        if text.is_empty() {
            self.topic_set_by = None;
            self.topic_set_at = None;
        } else if let Some(by) = set_by {
            self.topic_set_by = Some(by.to_owned());
            self.topic_set_at = Some(set_at.unwrap_or_else(|| Utc::now().timestamp_millis()));
        }
    }

    /// Record who set the topic and when (`RPL_TOPICWHOTIME`).
    pub fn topic_who_time(&mut self, set_by: &str, set_at: Option<i64>) {
        self.topic_set_by = Some(set_by.to_owned());
        if set_at.is_some() {
            self.topic_set_at = set_at;
        }
    }

    /// Apply parsed mode changes.
    ///
    /// Prefix modes with a nick parameter toggle that member's modes; any
    /// other change toggles a channel mode.
    pub fn mode(&mut self, changes: &[ModeChange], support: &ServerSupport) {
        for change in changes {
            if support.is_prefix_mode(change.mode) {
                // A prefix mode without a nick is malformed; nothing to toggle.
                let Some(nick) = change.param.as_deref() else {
                    continue;
                };
                let key = self.key(nick);
                if let Some(member) = self.members.get_mut(&key) {
                    toggle(&mut member.modes, change.mode, change.adding);
                    sort_by_rank(&mut member.modes, support);
                }
            } else {
                toggle(&mut self.modes, change.mode, change.adding);
            }
        }
    }

    /// Replace channel modes wholesale (`RPL_CHANNELMODEIS`).
    pub fn set_modes(&mut self, modes: impl IntoIterator<Item = char>) {
        self.modes.clear();
        for m in modes {
            toggle(&mut self.modes, m, true);
        }
    }

    /// A member's modes, if they are listed.
    pub fn member_modes(&self, nick: &str) -> Option<&[char]> {
        self.members.get(&self.key(nick)).map(|m| m.modes.as_slice())
    }

    pub fn has_member(&self, nick: &str) -> bool {
        self.members.contains_key(&self.key(nick))
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Re-key the roster after the server announced a different casemapping.
    pub fn set_casemapping(&mut self, casemapping: Casemapping) {
        if casemapping == self.casemapping {
            return;
        }
        self.casemapping = casemapping;
        let members = std::mem::take(&mut self.members);
        self.userlist(members.into_values().collect());
    }

    /// Independent snapshot; mutating it never touches the tracker.
    pub fn get_state(&self) -> ChannelState {
        ChannelState {
            name: self.name.clone(),
            topic: self.topic.clone(),
            topic_set_by: self.topic_set_by.clone(),
            topic_set_at: self.topic_set_at,
            modes: self.modes.clone(),
            users: self.members.values().cloned().collect(),
            joined: self.joined,
        }
    }
}

fn toggle(set: &mut Vec<char>, mode: char, adding: bool) {
    if adding {
        if !set.contains(&mode) {
            set.push(mode);
        }
    } else {
        set.retain(|&m| m != mode);
    }
}

fn sort_by_rank(modes: &mut [char], support: &ServerSupport) {
    modes.sort_by_key(|m| {
        support
            .prefix
            .iter()
            .position(|&(pm, _)| pm == *m)
            .unwrap_or(usize::MAX)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const ME: &str = "me";

    fn tracker() -> ChannelTracker {
        ChannelTracker::new("#test", Casemapping::Rfc1459)
    }

    #[test]
    fn join_then_part_removes_member() {
        let mut ch = tracker();
        ch.join("alice", Some("a"), Some("host"), ME);
        assert!(ch.has_member("ALICE"));
        ch.part("Alice", ME);
        assert!(!ch.has_member("alice"));
    }

    #[test]
    fn own_join_and_part_toggle_joined_and_keep_roster() {
        let mut ch = tracker();
        ch.join("Me", None, None, ME);
        assert!(ch.is_joined());
        ch.join("alice", None, None, ME);
        ch.part("ME", ME);
        let state = ch.get_state();
        assert!(!state.joined);
        assert_eq!(state.users.len(), 1);
    }

    #[test]
    fn kick_removes_member_or_unjoins() {
        let mut ch = tracker();
        ch.join(ME, None, None, ME);
        ch.join("bob", None, None, ME);
        ch.kick("bob", ME);
        assert!(!ch.has_member("bob"));
        ch.kick(ME, ME);
        assert!(!ch.is_joined());
    }

    #[test]
    fn rejoin_does_not_duplicate() {
        let mut ch = tracker();
        ch.join("alice", None, None, ME);
        ch.join("ALICE", Some("a"), Some("h"), ME);
        assert_eq!(ch.member_count(), 1);
        assert_eq!(ch.get_state().users[0].ident.as_deref(), Some("a"));
    }

    #[test]
    fn quit_reports_removal() {
        let mut ch = tracker();
        ch.join("alice", None, None, ME);
        assert!(ch.quit("alice"));
        assert!(!ch.quit("alice"));
    }

    #[test]
    fn nick_change_renames_in_place() {
        let mut ch = tracker();
        ch.join("alice", None, None, ME);
        ch.mode(&[ModeChange::with_param('o', true, "alice")], &ServerSupport::default());
        assert!(ch.nick("Alice", "alice2"));
        assert!(!ch.has_member("alice"));
        assert_eq!(ch.member_modes("alice2"), Some(&['o'][..]));
        assert!(!ch.nick("nobody", "x"));
    }

    #[test]
    fn userlist_replaces_roster() {
        let mut ch = tracker();
        ch.join("stale", None, None, ME);
        ch.userlist(vec![ChannelMember::new("alice"), ChannelMember::new("bob")]);
        assert!(!ch.has_member("stale"));
        assert_eq!(ch.member_count(), 2);
    }

    #[test]
    fn topic_set_and_clear() {
        let mut ch = tracker();
        ch.topic("hello", Some("alice"), Some(1_000));
        let s = ch.get_state();
        assert_eq!(s.topic, "hello");
        assert_eq!(s.topic_set_by.as_deref(), Some("alice"));
        assert_eq!(s.topic_set_at, Some(1_000));

        ch.topic("", Some("alice"), None);
        let s = ch.get_state();
        assert_eq!(s.topic, "");
        assert_eq!(s.topic_set_by, None);
        assert_eq!(s.topic_set_at, None);
    }

    #[test]
    fn topic_without_setter_keeps_previous_setter() {
        let mut ch = tracker();
        ch.topic("one", Some("alice"), Some(5));
        ch.topic("two", None, None);
        let s = ch.get_state();
        assert_eq!(s.topic, "two");
        assert_eq!(s.topic_set_by.as_deref(), Some("alice"));
    }

    #[test]
    fn topic_who_time_fills_setter() {
        let mut ch = tracker();
        ch.topic("hi", None, None);
        ch.topic_who_time("bob", Some(42_000));
        let s = ch.get_state();
        assert_eq!(s.topic_set_by.as_deref(), Some("bob"));
        assert_eq!(s.topic_set_at, Some(42_000));
    }

    #[test]
    fn mode_changes_are_idempotent() {
        let support = ServerSupport::default();
        let mut ch = tracker();
        ch.join("alice", None, None, ME);
        let add = [
            ModeChange::flag('n', true),
            ModeChange::flag('n', true),
            ModeChange::with_param('v', true, "alice"),
            ModeChange::with_param('o', true, "alice"),
            ModeChange::with_param('o', true, "alice"),
        ];
        ch.mode(&add, &support);
        assert_eq!(ch.get_state().modes, vec!['n']);
        assert_eq!(ch.member_modes("alice"), Some(&['o', 'v'][..]));

        ch.mode(
            &[ModeChange::flag('m', false), ModeChange::with_param('o', false, "alice")],
            &support,
        );
        assert_eq!(ch.get_state().modes, vec!['n']);
        assert_eq!(ch.member_modes("alice"), Some(&['v'][..]));
    }

    #[test]
    fn prefix_mode_for_unknown_nick_is_ignored() {
        let mut ch = tracker();
        ch.mode(&[ModeChange::with_param('o', true, "ghost")], &ServerSupport::default());
        assert!(ch.get_state().modes.is_empty());
        assert_eq!(ch.member_count(), 0);
    }

    #[test]
    fn set_modes_replaces() {
        let mut ch = tracker();
        ch.set_modes(['n', 't']);
        ch.set_modes(['s']);
        assert_eq!(ch.get_state().modes, vec!['s']);
    }

    #[test]
    fn snapshot_is_independent() {
        let mut ch = tracker();
        ch.join("alice", None, None, ME);
        let mut snap = ch.get_state();
        snap.users[0].modes.push('o');
        snap.users.clear();
        snap.topic.push_str("changed");
        assert_eq!(ch.member_modes("alice"), Some(&[][..]));
        assert_eq!(ch.get_state().topic, "");
    }

    #[test]
    fn casemapping_change_rekeys() {
        let mut ch = ChannelTracker::new("#test", Casemapping::Ascii);
        ch.join("nick[1]", None, None, ME);
        assert!(!ch.has_member("nick{1}"));
        ch.set_casemapping(Casemapping::Rfc1459);
        assert!(ch.has_member("nick{1}"));
    }
}
