//! Session state derived from the event stream.
//!
//! [`SessionState`] owns everything one network session knows: our own
//! identity, the server's ISUPPORT rules, channel trackers and in-flight
//! NAMES listings. [`SessionState::apply`] runs on every raw event *before*
//! it is classified, so the classifier's mode snapshot sees post-event state.

mod channel;
mod names;
mod user;

pub use channel::{ChannelMember, ChannelState, ChannelTracker};
pub use names::NamesAccumulator;
pub use user::{CurrentUser, UserState};

use serde::{Deserialize, Serialize};
use slirc_event::mode::{parse_channel_modes, parse_user_modes};
use slirc_event::{Casemapping, RawEvent, ServerSupport, Source};
use std::collections::{BTreeMap, HashMap};

use crate::classify::ClassifyContext;
use crate::config::NetworkConfig;

/// Connection status as reported by the transport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Disconnected => "disconnected",
            Status::Connecting => "connecting",
            Status::Connected => "connected",
        }
    }
}

/// Public view of one network session. Carries no secrets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkState {
    pub network: String,
    pub status: Status,
    /// Present only while connected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserState>,
    /// Keyed by case-folded channel name.
    pub channels: BTreeMap<String, ChannelState>,
    pub config: NetworkConfig,
    /// Last transport error, cleared on registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of [`SessionState::apply`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Applied {
    /// Something visible in [`NetworkState`] changed.
    pub changed: bool,
    /// Our nick before a self `NICK`, for classifying that very event.
    pub previous_nick: Option<String>,
}

#[derive(Debug)]
pub struct SessionState {
    pub user: CurrentUser,
    pub support: ServerSupport,
    channels: HashMap<String, ChannelTracker>,
    names: NamesAccumulator,
}

impl SessionState {
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            user: CurrentUser::new(nick),
            support: ServerSupport::default(),
            channels: HashMap::new(),
            names: NamesAccumulator::default(),
        }
    }

    fn casemapping(&self) -> Casemapping {
        self.support.casemapping
    }

    fn is_own(&self, nick: &str) -> bool {
        self.casemapping().equals(nick, &self.user.nick)
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelTracker> {
        self.channels.get(&self.casemapping().fold(name))
    }

    fn channel_mut(&mut self, name: &str) -> Option<&mut ChannelTracker> {
        let key = self.casemapping().fold(name);
        self.channels.get_mut(&key)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Snapshots of every tracked channel, keyed by folded name.
    pub fn channel_states(&self) -> BTreeMap<String, ChannelState> {
        self.channels
            .iter()
            .map(|(key, tracker)| (key.clone(), tracker.get_state()))
            .collect()
    }

    /// Drop all channel trackers.
    pub fn clear_channels(&mut self) {
        self.channels.clear();
        self.names.clear();
    }

    /// The connection is gone: nothing is joined any more.
    pub fn on_disconnect(&mut self) {
        for tracker in self.channels.values_mut() {
            tracker.detach();
        }
        self.names.clear();
        self.user.reset_connection();
    }

    /// Classification view, optionally with an overriding own nick.
    pub fn view<'a>(&'a self, own_nick: Option<&'a str>) -> ClassifyView<'a> {
        ClassifyView {
            state: self,
            own_nick: own_nick.unwrap_or(&self.user.nick),
        }
    }

    /// Derive tracker operations from one raw event.
    pub fn apply(&mut self, event: &RawEvent) -> Applied {
        let source = event.parsed_source();
        let nick = source.nick().unwrap_or_default();
        let mut applied = Applied::default();

        match event.command.to_ascii_uppercase().as_str() {
            "001" => {
                if let Some(me) = event.param(0)
                    && self.user.nick != me
                {
                    self.user.nick = me.to_owned();
                    applied.changed = true;
                }
            }
            "005" => self.apply_isupport(event.params.get(1..).unwrap_or_default()),
            "JOIN" => {
                if let Some(channel) = event.param(0) {
                    applied.changed = self.on_join(channel, &source);
                }
            }
            "PART" => {
                if let Some(channel) = event.param(0) {
                    let own = self.user.nick.clone();
                    if let Some(tracker) = self.channel_mut(channel) {
                        tracker.part(nick, &own);
                        applied.changed = true;
                    }
                }
            }
            "KICK" => {
                if let (Some(channel), Some(kicked)) = (event.param(0), event.param(1)) {
                    let own = self.user.nick.clone();
                    if let Some(tracker) = self.channel_mut(channel) {
                        tracker.kick(kicked, &own);
                        applied.changed = true;
                    }
                }
            }
            "QUIT" => {
                for tracker in self.channels.values_mut() {
                    applied.changed |= tracker.quit(nick);
                }
            }
            "NICK" => {
                if let Some(new) = event.param(0).filter(|_| !nick.is_empty()) {
                    if self.is_own(nick) {
                        applied.previous_nick =
                            Some(std::mem::replace(&mut self.user.nick, new.to_owned()));
                        applied.changed = true;
                    }
                    for tracker in self.channels.values_mut() {
                        applied.changed |= tracker.nick(nick, new);
                    }
                }
            }
            "TOPIC" => {
                if let Some(channel) = event.param(0) {
                    let text = event.param(1).unwrap_or_default();
                    let setter = source.name();
                    if let Some(tracker) = self.channel_mut(channel) {
                        tracker.topic(text, setter, None);
                        applied.changed = true;
                    }
                }
            }
            "MODE" => applied.changed = self.on_mode(event),
            "221" => {
                if let Some(modes) = event.param(1) {
                    self.user.set_modes(modes);
                    applied.changed = true;
                }
            }
            "324" => {
                if let (Some(channel), Some(modes)) = (event.param(1), event.param(2)) {
                    let args = event.params.get(3..).unwrap_or_default();
                    let changes = parse_channel_modes(modes, args, &self.support);
                    if let Some(tracker) = self.channel_mut(channel) {
                        tracker.set_modes(changes.iter().filter(|c| c.adding).map(|c| c.mode));
                        applied.changed = true;
                    }
                }
            }
            "332" => {
                if let (Some(channel), Some(text)) = (event.param(1), event.param(2))
                    && let Some(tracker) = self.channel_mut(channel)
                {
                    tracker.topic(text, None, None);
                    applied.changed = true;
                }
            }
            "333" => {
                if let (Some(channel), Some(setter)) = (event.param(1), event.param(2)) {
                    let setter = Source::parse(setter);
                    let set_at = event
                        .param(3)
                        .and_then(|ts| ts.parse::<i64>().ok())
                        .map(|secs| secs * 1000);
                    if let (Some(by), Some(tracker)) = (setter.name(), self.channel_mut(channel)) {
                        tracker.topic_who_time(by, set_at);
                        applied.changed = true;
                    }
                }
            }
            "353" => {
                if let (Some(channel), Some(names)) = (event.param(2), event.param(3)) {
                    self.names.push(channel, names, &self.support);
                }
            }
            "366" => {
                if let Some(channel) = event.param(1) {
                    let roster = self.names.finish(channel, self.casemapping());
                    if let Some(tracker) = self.channel_mut(channel) {
                        tracker.userlist(roster);
                        applied.changed = true;
                    }
                }
            }
            "305" => {
                applied.changed = self.user.away;
                self.user.away = false;
            }
            "306" => {
                applied.changed = !self.user.away;
                self.user.away = true;
            }
            _ => {}
        }
        applied
    }

    fn apply_isupport(&mut self, tokens: &[String]) {
        let before = self.casemapping();
        self.support.apply_tokens(tokens);
        let after = self.casemapping();
        if before != after {
            let trackers = std::mem::take(&mut self.channels);
            self.channels = trackers
                .into_values()
                .map(|mut t| {
                    t.set_casemapping(after);
                    (after.fold(t.name()), t)
                })
                .collect();
        }
    }

    fn on_join(&mut self, channel: &str, source: &Source) -> bool {
        let Some(nick) = source.nick() else {
            return false;
        };
        let own = self.user.nick.clone();
        let key = self.casemapping().fold(channel);
        if self.is_own(nick) {
            if let Some(ident) = source.ident() {
                self.user.ident = Some(ident.to_owned());
            }
            if let Some(host) = source.host() {
                self.user.host = Some(host.to_owned());
            }
            let cm = self.casemapping();
            self.channels
                .entry(key.clone())
                .or_insert_with(|| ChannelTracker::new(channel, cm));
        }
        match self.channels.get_mut(&key) {
            Some(tracker) => {
                tracker.join(nick, source.ident(), source.host(), &own);
                true
            }
            None => false,
        }
    }

    fn on_mode(&mut self, event: &RawEvent) -> bool {
        let (Some(target), Some(modes)) = (event.param(0), event.param(1)) else {
            return false;
        };
        if self.support.is_channel_name(target) {
            let args = event.params.get(2..).unwrap_or_default();
            let changes = parse_channel_modes(modes, args, &self.support);
            let key = self.casemapping().fold(target);
            let Some(tracker) = self.channels.get_mut(&key) else {
                return false;
            };
            tracker.mode(&changes, &self.support);
            true
        } else if self.is_own(target) {
            self.user.apply_modes(&parse_user_modes(modes));
            true
        } else {
            false
        }
    }
}

/// [`ClassifyContext`] over a [`SessionState`].
pub struct ClassifyView<'a> {
    state: &'a SessionState,
    own_nick: &'a str,
}

impl ClassifyContext for ClassifyView<'_> {
    fn own_nick(&self) -> &str {
        self.own_nick
    }

    fn casemapping(&self) -> Casemapping {
        self.state.casemapping()
    }

    fn is_channel_name(&self, name: &str) -> bool {
        self.state.support.is_channel_name(name)
    }

    fn split_status_target<'t>(&self, target: &'t str) -> Option<(&'t str, &'t str)> {
        self.state.support.split_status_target(target)
    }

    fn member_modes(&self, channel: &str, nick: &str) -> Option<Vec<char>> {
        self.state
            .channel(channel)
            .and_then(|t| t.member_modes(nick))
            .map(<[char]>::to_vec)
    }
}
