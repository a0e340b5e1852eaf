//! The bouncer's own identity on one network.

use serde::{Deserialize, Serialize};
use slirc_event::mode::ModeChange;

/// Our nick, mask and modes as the server last reported them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CurrentUser {
    pub nick: String,
    pub ident: Option<String>,
    pub host: Option<String>,
    pub away: bool,
    /// User modes (`i`, `w`, ...), no duplicates.
    pub modes: Vec<char>,
}

/// Public view of [`CurrentUser`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserState {
    pub nick: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub away: bool,
    pub modes: Vec<char>,
}

impl CurrentUser {
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            ..Self::default()
        }
    }

    /// Apply a user `MODE` aimed at us.
    pub fn apply_modes(&mut self, changes: &[ModeChange]) {
        for change in changes {
            if change.adding {
                if !self.modes.contains(&change.mode) {
                    self.modes.push(change.mode);
                }
            } else {
                self.modes.retain(|&m| m != change.mode);
            }
        }
    }

    /// Replace modes wholesale (`RPL_UMODEIS`).
    pub fn set_modes(&mut self, modestring: &str) {
        self.modes.clear();
        self.apply_modes(&slirc_event::mode::parse_user_modes(modestring));
    }

    /// Forget per-connection details after a disconnect.
    pub fn reset_connection(&mut self) {
        self.away = false;
        self.modes.clear();
    }

    pub fn to_state(&self) -> UserState {
        UserState {
            nick: self.nick.clone(),
            username: self.ident.clone(),
            host: self.host.clone(),
            away: self.away,
            modes: self.modes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slirc_event::mode::parse_user_modes;

    #[test]
    fn user_modes_toggle_without_duplicates() {
        let mut user = CurrentUser::new("me");
        user.apply_modes(&parse_user_modes("+iwi"));
        assert_eq!(user.modes, vec!['i', 'w']);
        user.apply_modes(&parse_user_modes("-i+x"));
        assert_eq!(user.modes, vec!['w', 'x']);
    }

    #[test]
    fn umodeis_replaces() {
        let mut user = CurrentUser::new("me");
        user.apply_modes(&parse_user_modes("+Z"));
        user.set_modes("+iw");
        assert_eq!(user.modes, vec!['i', 'w']);
    }

    #[test]
    fn state_uses_username_field() {
        let mut user = CurrentUser::new("me");
        user.ident = Some("ident".into());
        let json = serde_json::to_value(user.to_state()).unwrap();
        assert_eq!(json["username"], "ident");
        assert_eq!(json["away"], false);
    }
}
