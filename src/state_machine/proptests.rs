//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::state::*;
use super::transition::*;
use super::*;
use crate::api::{ApiError, Conversation, Message, Origin, Sender};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_conv_id() -> impl Strategy<Value = String> {
    prop_oneof![Just("a"), Just("b"), Just("c")].prop_map(String::from)
}

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z ]{1,12}"
}

fn arb_blank() -> impl Strategy<Value = String> {
    "[ \t\n]{0,6}"
}

fn arb_message() -> impl Strategy<Value = Message> {
    (any::<bool>(), arb_text()).prop_map(|(user, text)| {
        if user {
            Message::user(text)
        } else {
            Message::bot(text)
        }
    })
}

fn arb_conversation() -> impl Strategy<Value = Conversation> {
    (arb_conv_id(), proptest::option::of(arb_text()))
        .prop_map(|(id, title)| Conversation::new(id, title.as_deref()))
}

fn arb_api_error() -> impl Strategy<Value = ApiError> {
    "[a-z ]{1,10}".prop_map(ApiError::network)
}

fn arb_result<T: std::fmt::Debug + Clone>(
    ok: impl Strategy<Value = T>,
) -> impl Strategy<Value = Result<T, ApiError>> {
    prop_oneof![ok.prop_map(Ok), arb_api_error().prop_map(Err)]
}

fn arb_generation() -> impl Strategy<Value = u64> {
    0u64..8
}

fn arb_command() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_text().prop_map(|text| Event::UserSend { text }),
        arb_blank().prop_map(|text| Event::UserSend { text }),
        Just(Event::NewConversation),
        arb_conv_id().prop_map(|conversation_id| Event::OpenConversation { conversation_id }),
        (arb_conv_id(), prop_oneof![arb_text(), arb_blank()]).prop_map(
            |(conversation_id, title)| Event::RenameConversation {
                conversation_id,
                title
            }
        ),
        arb_conv_id().prop_map(|conversation_id| Event::DeleteConversation { conversation_id }),
        Just(Event::RefreshDirectory),
    ]
}

fn arb_completion() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_result(proptest::collection::vec(arb_conversation(), 0..4))
            .prop_map(|result| Event::DirectoryLoaded { result }),
        (arb_generation(), arb_result(arb_conversation()))
            .prop_map(|(generation, result)| Event::ConversationCreated { generation, result }),
        (
            arb_generation(),
            arb_conv_id(),
            arb_result(proptest::collection::vec(arb_message(), 0..4))
        )
            .prop_map(|(generation, conversation_id, result)| Event::MessagesLoaded {
                generation,
                conversation_id,
                result
            }),
        (arb_generation(), arb_result(Just(())))
            .prop_map(|(generation, result)| Event::SendSettled { generation, result }),
        arb_generation().prop_map(|generation| Event::SendTimedOut { generation }),
        (arb_conv_id(), arb_result(arb_conversation())).prop_map(|(conversation_id, result)| {
            Event::ConversationRenamed {
                conversation_id,
                result,
            }
        }),
        (arb_conv_id(), arb_result(Just(()))).prop_map(|(conversation_id, result)| {
            Event::ConversationDeleted {
                conversation_id,
                result,
            }
        }),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![arb_command(), arb_completion()]
}

/// Drive an arbitrary event sequence, skipping rejected events
fn run_events(events: Vec<Event>) -> Vec<SessionState> {
    let context = SessionContext::default();
    let mut state = SessionState::default();
    let mut history = vec![state.clone()];
    for event in events {
        if let Ok(result) = transition(&state, &context, event) {
            state = result.new_state;
            history.push(state.clone());
        }
    }
    history
}

/// Replace the generation of a buffer-bound completion with a stale one
fn make_stale(event: Event, current: u64) -> Option<Event> {
    let stale = current + 1;
    match event {
        Event::ConversationCreated { result, .. } => Some(Event::ConversationCreated {
            generation: stale,
            result,
        }),
        Event::MessagesLoaded {
            conversation_id,
            result,
            ..
        } => Some(Event::MessagesLoaded {
            generation: stale,
            conversation_id,
            result,
        }),
        Event::SendSettled { result, .. } => Some(Event::SendSettled {
            generation: stale,
            result,
        }),
        Event::SendTimedOut { .. } => Some(Event::SendTimedOut { generation: stale }),
        _ => None,
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn invariants_hold_for_any_sequence(events in proptest::collection::vec(arb_event(), 0..40)) {
        for state in run_events(events) {
            prop_assert!(state.check_invariants().is_ok(), "{:?}: {:?}", state.check_invariants(), state);
        }
    }

    #[test]
    fn generation_never_decreases(events in proptest::collection::vec(arb_event(), 0..40)) {
        let history = run_events(events);
        for pair in history.windows(2) {
            prop_assert!(pair[1].generation >= pair[0].generation);
        }
    }

    #[test]
    fn blank_send_changes_nothing(
        events in proptest::collection::vec(arb_event(), 0..20),
        blank in arb_blank(),
    ) {
        let state = run_events(events).pop().unwrap();
        let result = transition(&state, &SessionContext::default(), Event::UserSend { text: blank }).unwrap();
        prop_assert_eq!(result.new_state, state);
        prop_assert!(result.effects.is_empty());
    }

    #[test]
    fn stale_completions_change_nothing(
        events in proptest::collection::vec(arb_event(), 0..20),
        completion in arb_completion(),
    ) {
        let state = run_events(events).pop().unwrap();
        if let Some(stale) = make_stale(completion, state.generation) {
            let result = transition(&state, &SessionContext::default(), stale).unwrap();
            prop_assert_eq!(&result.new_state.messages, &state.messages);
            prop_assert_eq!(&result.new_state.active, &state.active);
            prop_assert_eq!(&result.new_state.dispatch, &state.dispatch);
            prop_assert!(result.effects.is_empty());
        }
    }

    #[test]
    fn send_from_idle_appends_exactly_two_entries(
        history in proptest::collection::vec(arb_message(), 0..5),
        text in arb_text(),
    ) {
        let state = SessionState {
            active: Some("a".into()),
            messages: history.clone(),
            generation: 1,
            ..Default::default()
        };
        let result = transition(&state, &SessionContext::default(), Event::UserSend { text: text.clone() }).unwrap();
        let msgs = &result.new_state.messages;

        prop_assert_eq!(msgs.len(), history.len() + 2);
        prop_assert_eq!(&msgs[..history.len()], &history[..]);
        prop_assert_eq!(msgs[history.len()].sender, Sender::User);
        prop_assert_eq!(&msgs[history.len()].text, &text);
        prop_assert_eq!(msgs[history.len()].origin, Origin::Optimistic);
        prop_assert!(msgs[history.len() + 1].is_pending());
    }

    #[test]
    fn timeout_keeps_prior_buffer_and_user_message(
        history in proptest::collection::vec(arb_message(), 0..5),
        text in arb_text(),
    ) {
        let context = SessionContext::default();
        let state = SessionState {
            active: Some("a".into()),
            messages: history.clone(),
            generation: 1,
            ..Default::default()
        };
        let sending = transition(&state, &context, Event::UserSend { text: text.clone() }).unwrap().new_state;
        let done = transition(&sending, &context, Event::SendTimedOut { generation: sending.generation })
            .unwrap()
            .new_state;

        let mut expected = history;
        expected.push(Message::user(text).with_origin(Origin::Optimistic));
        expected.push(Message::bot(context.fallback_notice.clone()).with_origin(Origin::Fallback));
        prop_assert_eq!(done.messages, expected);
        prop_assert!(done.dispatch.is_idle());
    }

    #[test]
    fn deleting_inactive_conversation_keeps_session(
        history in proptest::collection::vec(arb_message(), 0..5),
    ) {
        let state = SessionState {
            active: Some("a".into()),
            messages: history,
            generation: 3,
            ..Default::default()
        };
        let result = transition(
            &state,
            &SessionContext::default(),
            Event::ConversationDeleted { conversation_id: "b".into(), result: Ok(()) },
        )
        .unwrap();
        prop_assert_eq!(&result.new_state.active, &state.active);
        prop_assert_eq!(&result.new_state.messages, &state.messages);
        prop_assert_eq!(result.new_state.generation, state.generation);
    }
}
