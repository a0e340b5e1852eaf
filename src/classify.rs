//! Raw event classification.
//!
//! Turns one [`RawEvent`] into the canonical [`Message`]: ACTION unwrapping,
//! numeric naming, source splitting, self detection, conversation targeting,
//! content extraction and a best-effort sender mode snapshot, in that order.
//!
//! Classification is pure. It reads session state through
//! [`ClassifyContext`] and never fails: missing fields become absent
//! optional fields.

use slirc_event::{Casemapping, RawEvent, Source, ctcp, numeric};

use crate::message::{Context, Message};

/// Commands whose first parameter names the conversation.
const TARGET_COMMANDS: &[&str] = &[
    "PRIVMSG", "NOTICE", "JOIN", "PART", "MODE", "TOPIC", "KICK", "ACTION",
];

/// Commands whose first remaining parameter is the message text.
const CONTENT_COMMANDS: &[&str] = &["PRIVMSG", "NOTICE", "ACTION"];

/// What the classifier needs to know about the session.
pub trait ClassifyContext {
    /// Our nick at classification time.
    fn own_nick(&self) -> &str;

    fn casemapping(&self) -> Casemapping;

    fn is_channel_name(&self, name: &str) -> bool;

    /// Split `@#chan` into (`"@"`, `"#chan"`); `None` if not a status target.
    fn split_status_target<'a>(&self, target: &'a str) -> Option<(&'a str, &'a str)>;

    /// Sender's modes in `channel`, if they are a listed member.
    fn member_modes(&self, channel: &str, nick: &str) -> Option<Vec<char>>;

    /// Human-readable name for a numeric command.
    fn numeric_name(&self, command: &str) -> Option<&'static str> {
        numeric::name_of(command)
    }
}

/// Classify one raw event for `network`.
pub fn classify(network: &str, event: &RawEvent, ctx: &impl ClassifyContext) -> Message {
    let cm = ctx.casemapping();
    let own_nick = ctx.own_nick();
    let mut command = event.command.to_ascii_uppercase();
    let mut params = event.params.clone();

    if command == "PRIVMSG"
        && let Some(text) = params.get(1).and_then(|p| ctcp::action_text(p)).map(str::to_owned)
    {
        params[1] = text;
        command = "ACTION".to_owned();
    }

    let numeric = match ctx.numeric_name(&command) {
        Some(name) => {
            if params.first().is_some_and(|p| cm.equals(p, own_nick)) {
                params.remove(0);
            }
            Some(std::mem::replace(&mut command, name.to_owned()))
        }
        None => None,
    };

    let source = Source::parse(&event.source);
    let is_self = source.nick().is_some_and(|nick| cm.equals(nick, own_nick));

    let mut msg = Message::new(network, command);
    msg.is_self = is_self;
    msg.source = source.name().map(str::to_owned);
    msg.meta.ident = source.ident().map(str::to_owned);
    msg.meta.hostname = source.host().map(str::to_owned);
    msg.meta.numeric = numeric;
    msg.meta.tags = event.tags.clone();

    if let Some(first) = params.first().filter(|p| !p.is_empty())
        && let Some(found) = extract_target(&msg.command, first, msg.meta.numeric.is_some(), &source, ctx)
    {
        msg.target = Some(found.target);
        msg.meta.context = Some(found.context);
        msg.meta.status = found.status;
        params.remove(0);
    }

    if CONTENT_COMMANDS.contains(&msg.command.as_str()) {
        msg.content = params.first().cloned();
    }

    if msg.meta.context == Some(Context::Channel)
        && let (Some(target), Some(nick)) = (msg.target.as_deref(), source.nick())
    {
        msg.meta.modes = ctx.member_modes(target, nick).filter(|m| !m.is_empty());
    }

    msg.meta.params = params;
    msg
}

struct TargetInfo {
    target: String,
    context: Context,
    status: Option<String>,
}

impl TargetInfo {
    fn new(target: &str, context: Context) -> Self {
        Self {
            target: target.to_owned(),
            context,
            status: None,
        }
    }
}

/// The targeting table, first match wins.
fn extract_target(
    command: &str,
    first: &str,
    is_numeric: bool,
    source: &Source,
    ctx: &impl ClassifyContext,
) -> Option<TargetInfo> {
    let is_target_command = TARGET_COMMANDS.contains(&command);
    let is_channel = ctx.is_channel_name(first);

    if !is_target_command {
        return (is_numeric && is_channel).then(|| TargetInfo::new(first, Context::Channel));
    }
    if is_channel {
        return Some(TargetInfo::new(first, Context::Channel));
    }
    if let Some((status, channel)) = ctx.split_status_target(first) {
        return Some(TargetInfo {
            status: Some(status.to_owned()),
            ..TargetInfo::new(channel, Context::Channel)
        });
    }
    if ctx.casemapping().equals(first, ctx.own_nick())
        && let Some(nick) = source.nick()
    {
        return Some(TargetInfo::new(nick, Context::Dm));
    }
    Some(TargetInfo::new(first, Context::Server))
}

/// Echo of something we sent, for servers without `echo-message`.
pub struct Outgoing<'a> {
    pub command: &'a str,
    pub target: &'a str,
    pub text: &'a str,
    pub ident: Option<&'a str>,
    pub host: Option<&'a str>,
}

/// Build the self message for an outgoing PRIVMSG/NOTICE/ACTION.
pub fn outgoing(network: &str, out: Outgoing<'_>, ctx: &impl ClassifyContext) -> Message {
    let context = if ctx.is_channel_name(out.target) {
        Context::Channel
    } else {
        Context::Dm
    };
    let mut msg = Message::new(network, out.command).with_target(out.target, context);
    msg.source = Some(ctx.own_nick().to_owned());
    msg.content = Some(out.text.to_owned());
    msg.is_self = true;
    msg.meta.ident = out.ident.map(str::to_owned);
    msg.meta.hostname = out.host.map(str::to_owned);
    msg.meta.params = vec![out.text.to_owned()];
    if context == Context::Channel {
        msg.meta.modes = ctx
            .member_modes(out.target, ctx.own_nick())
            .filter(|m| !m.is_empty());
    }
    msg
}
