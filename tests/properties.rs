//! Property-based tests for classification, the ring buffer and archive
//! pagination on both backends.
//!
//! Uses proptest to generate nicks, channels and history sizes and verify
//! that the invariants hold for all of them, not just the hand-picked cases
//! in the unit tests.

use proptest::prelude::*;
use slirc_bnc::archive::{ArchiveQuery, MemoryArchive, MessageArchive, RingBuffer, SqliteArchive};
use slirc_bnc::classify::classify;
use slirc_bnc::state::SessionState;
use slirc_bnc::{Context, Message, RawEvent};
use std::collections::HashSet;

// =============================================================================
// STRATEGIES
// =============================================================================

/// Nick made of letters only, so case folding is the same under every
/// casemapping.
fn nickname_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9]{0,8}").expect("valid regex")
}

fn channel_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("#[a-zA-Z0-9_\\-]{1,20}").expect("valid regex")
}

fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[^\r\n\0\x01]{0,100}").expect("valid regex")
}

fn flip_case(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                c.to_ascii_lowercase()
            } else {
                c.to_ascii_uppercase()
            }
        })
        .collect()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

proptest! {
    #[test]
    fn dm_target_is_the_sender(
        own in nickname_strategy(),
        sender in nickname_strategy(),
        text in text_strategy(),
        command in prop_oneof![Just("PRIVMSG"), Just("NOTICE")],
    ) {
        prop_assume!(!own.eq_ignore_ascii_case(&sender));
        let state = SessionState::new(own.clone());
        let event = RawEvent::new(command, [flip_case(&own), text])
            .with_source(format!("{sender}!u@h"));

        let msg = classify("net", &event, &state.view(None));
        prop_assert_eq!(msg.target.as_deref(), Some(sender.as_str()));
        prop_assert_eq!(msg.context(), Some(Context::Dm));
        prop_assert!(!msg.is_self);
    }

    #[test]
    fn ctcp_action_is_unwrapped(
        channel in channel_strategy(),
        text in text_strategy(),
    ) {
        let state = SessionState::new("me");
        let event = RawEvent::new("PRIVMSG", [channel.clone(), format!("\x01ACTION {text}\x01")])
            .with_source("alice!a@h");

        let msg = classify("net", &event, &state.view(None));
        prop_assert_eq!(msg.command.as_str(), "ACTION");
        prop_assert_eq!(msg.content.as_deref(), Some(text.as_str()));
        prop_assert_eq!(msg.target.as_deref(), Some(channel.as_str()));
    }

    #[test]
    fn self_detection_ignores_case(
        own in nickname_strategy(),
        channel in channel_strategy(),
    ) {
        let state = SessionState::new(own.clone());
        let event = RawEvent::new("PRIVMSG", [channel, "hi".to_owned()])
            .with_source(format!("{}!u@h", flip_case(&own)));

        let msg = classify("net", &event, &state.view(None));
        prop_assert!(msg.is_self);
    }

    #[test]
    fn context_is_set_iff_target_is_set(
        command in prop_oneof![
            Just("PRIVMSG"), Just("NOTICE"), Just("JOIN"), Just("QUIT"),
            Just("NICK"), Just("001"), Just("332"), Just("ERROR"),
        ],
        params in prop::collection::vec(
            prop_oneof![channel_strategy(), nickname_strategy(), text_strategy()],
            0..4,
        ),
        source in prop_oneof![Just(String::new()), nickname_strategy(), Just("irc.example".to_owned())],
    ) {
        let state = SessionState::new("me");
        let event = RawEvent::new(command, params).with_source(source);

        let msg = classify("net", &event, &state.view(None));
        prop_assert_eq!(msg.target.is_some(), msg.context().is_some());
    }
}

// =============================================================================
// RING BUFFER
// =============================================================================

proptest! {
    #[test]
    fn ring_keeps_most_recent(capacity in 1usize..64, extra in 1usize..64) {
        let mut ring = RingBuffer::new(capacity);
        for i in 0..capacity + extra {
            ring.push(i);
        }
        let kept = ring.to_vec();
        let expected: Vec<usize> = (extra..capacity + extra).collect();
        prop_assert_eq!(kept, expected);
    }
}

// =============================================================================
// PAGINATION
// =============================================================================

/// Store `total` messages, then page back with `limit` until `has_more` is
/// false. Returns the stored ids and each page's ids.
async fn walk_pages(
    archive: &dyn MessageArchive,
    total: usize,
    limit: usize,
) -> (Vec<String>, Vec<Vec<String>>) {
    let mut stored = Vec::with_capacity(total);
    for i in 0..total {
        let mut msg = Message::new("net", "PRIVMSG").with_target("#c", Context::Channel);
        msg.content = Some(i.to_string());
        archive.store(&msg).await.expect("store");
        stored.push(msg.id);
    }

    let mut fetched: Vec<Vec<String>> = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let mut query = ArchiveQuery::new("net", Some("#C")).limit(limit);
        if let Some(c) = cursor.take() {
            query = query.before(c);
        }
        let page = archive.query(&query).await.expect("query");
        fetched.push(page.messages.iter().map(|m| m.id.clone()).collect());
        if !page.has_more {
            break;
        }
        cursor = page.oldest_id;
    }
    (stored, fetched)
}

fn check_pages(
    stored: Vec<String>,
    fetched: Vec<Vec<String>>,
    limit: usize,
) -> Result<(), TestCaseError> {
    let mut seen = HashSet::new();
    for page in &fetched {
        prop_assert!(page.len() <= limit);
        prop_assert!(page.windows(2).all(|w| w[0] < w[1]));
        for id in page {
            prop_assert!(seen.insert(id.clone()), "duplicate id");
        }
    }
    for pair in fetched.windows(2) {
        if let (Some(newer_oldest), Some(older_newest)) = (pair[0].first(), pair[1].last()) {
            prop_assert!(older_newest < newer_oldest);
        }
    }

    let rebuilt: Vec<String> = fetched.into_iter().rev().flatten().collect();
    prop_assert_eq!(rebuilt, stored);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn pages_walk_memory_history_without_gaps(total in 0usize..120, limit in 1usize..30) {
        let (stored, fetched) = runtime().block_on(async {
            let archive = MemoryArchive::new(500);
            walk_pages(&archive, total, limit).await
        });
        check_pages(stored, fetched, limit)?;
    }

    #[test]
    fn pages_walk_sqlite_history_without_gaps(total in 0usize..120, limit in 1usize..30) {
        let (stored, fetched) = runtime().block_on(async {
            let archive = SqliteArchive::open(":memory:").await.expect("open");
            walk_pages(&archive, total, limit).await
        });
        check_pages(stored, fetched, limit)?;
    }
}
