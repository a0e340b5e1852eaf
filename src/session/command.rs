//! Outbound command table.
//!
//! Callers send `{command, args}`; the first argument is the target for
//! every command that takes one, and the remaining arguments are joined with
//! single spaces into the text.

use crate::error::{CommandError, CommandResult};
use crate::transport::Transport;

/// Recognized command names.
pub const COMMANDS: &[&str] = &[
    "PRIVMSG", "NOTICE", "ACTION", "JOIN", "PART", "NICK", "TOPIC", "QUIT", "CONNECT", "RAW",
];

/// A validated outbound command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    Privmsg { target: String, text: String },
    Notice { target: String, text: String },
    Action { target: String, text: String },
    Join { channel: String, key: Option<String> },
    Part { channel: String, reason: Option<String> },
    Nick { nick: String },
    Topic { channel: String, topic: String },
    Quit { message: Option<String> },
    Connect,
    Raw { args: Vec<String> },
}

impl Invocation {
    /// Validate a command name (case-insensitive) and its arguments.
    pub fn parse(command: &str, args: &[String]) -> Result<Self, CommandError> {
        let name = command.to_ascii_uppercase();
        let (target, rest) = match args.split_first() {
            Some((first, rest)) => (first.as_str(), rest),
            None => ("", &[][..]),
        };
        let text = rest.join(" ");
        let require_target = || {
            if target.is_empty() {
                Err(CommandError::MissingTarget(name.clone()))
            } else {
                Ok(target.to_owned())
            }
        };

        let invocation = match name.as_str() {
            "PRIVMSG" => Self::Privmsg {
                target: require_target()?,
                text,
            },
            "NOTICE" => Self::Notice {
                target: require_target()?,
                text,
            },
            "ACTION" => Self::Action {
                target: require_target()?,
                text,
            },
            "JOIN" => Self::Join {
                channel: require_target()?,
                key: rest.first().filter(|k| !k.is_empty()).cloned(),
            },
            "PART" => Self::Part {
                channel: require_target()?,
                reason: (!text.is_empty()).then_some(text),
            },
            "NICK" => Self::Nick {
                nick: require_target()?,
            },
            "TOPIC" => Self::Topic {
                channel: require_target()?,
                topic: text,
            },
            "QUIT" => {
                let message = args.join(" ");
                Self::Quit {
                    message: (!message.is_empty()).then_some(message),
                }
            }
            "CONNECT" => Self::Connect,
            "RAW" => Self::Raw {
                args: args.to_vec(),
            },
            _ => return Err(CommandError::UnknownCommand(command.to_owned())),
        };
        Ok(invocation)
    }

    /// Canonical command name, for logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Privmsg { .. } => "PRIVMSG",
            Self::Notice { .. } => "NOTICE",
            Self::Action { .. } => "ACTION",
            Self::Join { .. } => "JOIN",
            Self::Part { .. } => "PART",
            Self::Nick { .. } => "NICK",
            Self::Topic { .. } => "TOPIC",
            Self::Quit { .. } => "QUIT",
            Self::Connect => "CONNECT",
            Self::Raw { .. } => "RAW",
        }
    }

    /// `(command, target, text)` for commands the session echoes locally.
    pub fn echo(&self) -> Option<(&'static str, &str, &str)> {
        match self {
            Self::Privmsg { target, text } => Some(("PRIVMSG", target, text)),
            Self::Notice { target, text } => Some(("NOTICE", target, text)),
            Self::Action { target, text } => Some(("ACTION", target, text)),
            _ => None,
        }
    }

    /// Hand the command to the transport. `default_quit` fills a bare QUIT.
    pub(crate) fn execute(&self, transport: &dyn Transport, default_quit: Option<&str>) -> CommandResult {
        match self {
            Self::Privmsg { target, text } => transport.say(target, text)?,
            Self::Notice { target, text } => transport.notice(target, text)?,
            Self::Action { target, text } => transport.action(target, text)?,
            Self::Join { channel, key } => transport.join(channel, key.as_deref())?,
            Self::Part { channel, reason } => transport.part(channel, reason.as_deref())?,
            Self::Nick { nick } => transport.change_nick(nick)?,
            Self::Topic { channel, topic } => transport.set_topic(channel, topic)?,
            Self::Quit { message } => transport.quit(message.as_deref().or(default_quit))?,
            Self::Connect => transport.connect()?,
            Self::Raw { args } => transport.raw(args)?,
        }
        Ok(())
    }
}
