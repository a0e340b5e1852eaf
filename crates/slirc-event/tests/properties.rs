//! Property-based tests for casemapping, source parsing and CTCP framing.

use proptest::prelude::*;
use slirc_event::ctcp;
use slirc_event::{Casemapping, Source};

fn casemapping_strategy() -> impl Strategy<Value = Casemapping> {
    prop_oneof![
        Just(Casemapping::Ascii),
        Just(Casemapping::Rfc1459),
        Just(Casemapping::StrictRfc1459),
    ]
}

fn nickname_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z\\[\\]\\\\^_`{|}~][a-zA-Z0-9\\-\\[\\]\\\\^_`{|}~]{0,15}")
        .expect("valid regex")
}

fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[^\r\n\0\x01]{0,200}").expect("valid regex")
}

proptest! {
    #[test]
    fn fold_is_idempotent(cm in casemapping_strategy(), s in nickname_strategy()) {
        let once = cm.fold(&s);
        prop_assert_eq!(cm.fold(&once), once);
    }

    #[test]
    fn equals_agrees_with_fold(
        cm in casemapping_strategy(),
        a in nickname_strategy(),
        b in nickname_strategy(),
    ) {
        prop_assert_eq!(cm.equals(&a, &b), cm.fold(&a) == cm.fold(&b));
    }

    #[test]
    fn case_changes_compare_equal(cm in casemapping_strategy(), s in nickname_strategy()) {
        prop_assert!(cm.equals(&s, &s.to_ascii_uppercase()));
        prop_assert!(cm.equals(&s.to_ascii_lowercase(), &s));
    }

    #[test]
    fn user_masks_split_into_parts(
        nick in nickname_strategy(),
        ident in "[a-z][a-z0-9]{0,9}",
        host in "[a-z0-9]+(\\.[a-z0-9]+){0,3}",
    ) {
        let src = Source::parse(&format!("{nick}!{ident}@{host}"));
        prop_assert_eq!(src.nick(), Some(nick.as_str()));
        prop_assert_eq!(src.ident(), Some(ident.as_str()));
        prop_assert_eq!(src.host(), Some(host.as_str()));
    }

    #[test]
    fn names_without_bang_are_servers(name in "[a-z0-9]+(\\.[a-z0-9]+){0,3}") {
        prop_assert_eq!(Source::parse(&name), Source::Server(name.clone()));
    }

    #[test]
    fn action_unwraps_to_original_text(text in text_strategy()) {
        let wrapped = ctcp::action(&text);
        prop_assert_eq!(ctcp::action_text(&wrapped), Some(text.as_str()));
        let unterminated = wrapped.trim_end_matches(ctcp::CTCP_DELIM);
        prop_assert_eq!(ctcp::action_text(unterminated), Some(text.as_str()));
    }

    #[test]
    fn plain_text_is_never_an_action(text in text_strategy()) {
        prop_assert_eq!(ctcp::action_text(&text), None);
    }
}
