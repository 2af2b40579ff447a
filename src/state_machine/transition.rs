//! Pure state transition function
//!
//! Given the same state, context and event, `transition` always produces the
//! same result and performs no I/O. Network calls and timers are expressed as
//! [`Effect`]s that the runtime executes.

use super::effect::{DispatchOutcome, Operation};
use super::state::DispatchState;
use super::{Effect, Event, SessionContext, SessionState};
use crate::api::{Message, Origin};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A request is still in progress for this conversation, wait for it to finish")]
    DispatchBusy,
}

/// Pure transition function
pub fn transition(
    state: &SessionState,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    let mut next = state.clone();

    match event {
        // ============================================================
        // Message dispatch
        // ============================================================
        Event::UserSend { text } => {
            if text.trim().is_empty() {
                return Ok(TransitionResult::new(next));
            }
            if !state.dispatch.is_idle() {
                return Err(TransitionError::DispatchBusy);
            }

            match state.active.clone() {
                Some(conversation_id) => {
                    let effects = begin_send(&mut next, context, conversation_id, text);
                    Ok(TransitionResult::new(next).with_effects(effects))
                }
                None => {
                    // Create the conversation first; the text rides along.
                    let generation = next.next_generation();
                    next.dispatch = DispatchState::Creating {
                        pending_text: Some(text),
                    };
                    Ok(TransitionResult::new(next)
                        .with_effect(Effect::CreateConversation { generation }))
                }
            }
        }

        Event::SendSettled { generation, result } => {
            let conversation_id = match &state.dispatch {
                DispatchState::Sending { conversation_id } if generation == state.generation => {
                    conversation_id.clone()
                }
                _ => return Ok(TransitionResult::new(next)),
            };

            match result {
                Ok(()) => {
                    next.dispatch = DispatchState::Reconciling {
                        conversation_id: conversation_id.clone(),
                    };
                    next.directory_requests += 1;
                    Ok(TransitionResult::new(next)
                        .with_effect(Effect::FetchMessages {
                            conversation_id,
                            generation,
                        })
                        .with_effect(Effect::ListConversations))
                }
                Err(_) => Ok(fall_back(next, context)),
            }
        }

        Event::SendTimedOut { generation } => {
            let sending = matches!(state.dispatch, DispatchState::Sending { .. });
            if sending && generation == state.generation {
                Ok(fall_back(next, context))
            } else {
                Ok(TransitionResult::new(next))
            }
        }

        // ============================================================
        // Session store: open / load
        // ============================================================
        Event::OpenConversation { conversation_id } => {
            next.switch_to(Some(conversation_id.clone()));
            next.dispatch = DispatchState::Loading {
                conversation_id: conversation_id.clone(),
            };
            let generation = next.generation;
            Ok(TransitionResult::new(next).with_effect(Effect::FetchMessages {
                conversation_id,
                generation,
            }))
        }

        Event::MessagesLoaded {
            generation,
            conversation_id,
            result,
        } => {
            let current = generation == state.generation
                && state.active.as_deref() == Some(conversation_id.as_str());
            if !current {
                return Ok(TransitionResult::new(next));
            }

            match (&state.dispatch, result) {
                (DispatchState::Reconciling { .. }, Ok(messages)) => {
                    next.messages = messages;
                    next.dispatch = DispatchState::Idle;
                    Ok(TransitionResult::new(next).with_effect(Effect::NotifyDispatchSettled {
                        outcome: DispatchOutcome::Reconciled,
                    }))
                }
                (DispatchState::Reconciling { .. }, Err(_)) => Ok(fall_back(next, context)),
                (DispatchState::Loading { .. }, Ok(messages)) => {
                    next.messages = messages;
                    next.dispatch = DispatchState::Idle;
                    Ok(TransitionResult::new(next))
                }
                (DispatchState::Loading { .. }, Err(e)) => {
                    next.dispatch = DispatchState::Idle;
                    Ok(TransitionResult::new(next)
                        .with_effect(Effect::notify_error(Operation::Load, e.message)))
                }
                _ => Ok(TransitionResult::new(next)),
            }
        }

        // ============================================================
        // Conversation directory
        // ============================================================
        Event::NewConversation => {
            next.switch_to(None);
            next.dispatch = DispatchState::Creating { pending_text: None };
            let generation = next.generation;
            Ok(TransitionResult::new(next).with_effect(Effect::CreateConversation { generation }))
        }

        Event::ConversationCreated { generation, result } => {
            let creating = match &state.dispatch {
                DispatchState::Creating { pending_text } if generation == state.generation => {
                    Some(pending_text.clone())
                }
                _ => None,
            };

            match (result, creating) {
                (Ok(conversation), Some(pending_text)) => {
                    let conversation_id = conversation.id.clone();
                    next.directory.prepend(conversation);
                    next.switch_to(Some(conversation_id.clone()));
                    next.dispatch = DispatchState::Idle;
                    let effects = match pending_text {
                        Some(text) => begin_send(&mut next, context, conversation_id, text),
                        None => vec![],
                    };
                    Ok(TransitionResult::new(next).with_effects(effects))
                }
                // Superseded, but the server created it: keep the list accurate.
                (Ok(conversation), None) => {
                    next.directory.prepend(conversation);
                    Ok(TransitionResult::new(next))
                }
                (Err(e), Some(_)) => {
                    next.dispatch = DispatchState::Idle;
                    Ok(TransitionResult::new(next)
                        .with_effect(Effect::notify_error(Operation::Create, e.message)))
                }
                (Err(_), None) => Ok(TransitionResult::new(next)),
            }
        }

        Event::RenameConversation {
            conversation_id,
            title,
        } => {
            if title.trim().is_empty() {
                return Ok(TransitionResult::new(next));
            }
            next.directory_requests += 1;
            Ok(TransitionResult::new(next).with_effect(Effect::RenameConversation {
                conversation_id,
                title,
            }))
        }

        Event::ConversationRenamed {
            conversation_id,
            result,
        } => {
            next.directory_requests = next.directory_requests.saturating_sub(1);
            match result {
                Ok(conversation) => {
                    next.directory.update(conversation);
                    Ok(TransitionResult::new(next))
                }
                Err(e) => Ok(TransitionResult::new(next).with_effect(Effect::notify_error(
                    Operation::Rename,
                    format!("{conversation_id}: {}", e.message),
                ))),
            }
        }

        Event::DeleteConversation { conversation_id } => {
            next.directory_requests += 1;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::DeleteConversation { conversation_id }))
        }

        Event::ConversationDeleted {
            conversation_id,
            result,
        } => {
            next.directory_requests = next.directory_requests.saturating_sub(1);
            match result {
                Ok(()) => {
                    next.directory.remove(&conversation_id);
                    if state.active.as_deref() == Some(conversation_id.as_str()) {
                        next.switch_to(None);
                        next.dispatch = DispatchState::Idle;
                    }
                    Ok(TransitionResult::new(next))
                }
                Err(e) => Ok(TransitionResult::new(next).with_effect(Effect::notify_error(
                    Operation::Delete,
                    format!("{conversation_id}: {}", e.message),
                ))),
            }
        }

        Event::RefreshDirectory => {
            next.directory_requests += 1;
            Ok(TransitionResult::new(next).with_effect(Effect::ListConversations))
        }

        Event::DirectoryLoaded { result } => {
            next.directory_requests = next.directory_requests.saturating_sub(1);
            match result {
                Ok(conversations) => {
                    next.directory.replace_all(conversations);
                    Ok(TransitionResult::new(next))
                }
                Err(e) => Ok(TransitionResult::new(next)
                    .with_effect(Effect::notify_error(Operation::List, e.message))),
            }
        }
    }
}

/// Optimistically append the user message and placeholder, then emit the
/// send request and its timeout. The append precedes the request.
fn begin_send(
    state: &mut SessionState,
    context: &SessionContext,
    conversation_id: String,
    text: String,
) -> Vec<Effect> {
    let generation = state.next_generation();
    state
        .messages
        .push(Message::user(text.clone()).with_origin(Origin::Optimistic));
    state
        .messages
        .push(Message::bot(context.placeholder_text.clone()).with_origin(Origin::Placeholder));
    state.dispatch = DispatchState::Sending {
        conversation_id: conversation_id.clone(),
    };

    vec![
        Effect::SendMessage {
            conversation_id,
            text,
            generation,
        },
        Effect::ScheduleSendTimeout {
            delay: context.send_timeout,
            generation,
        },
    ]
}

/// Degraded but usable: keep the user's message, swap the placeholder for the notice
fn fall_back(mut state: SessionState, context: &SessionContext) -> TransitionResult {
    state.apply_fallback(&context.fallback_notice);
    state.dispatch = DispatchState::Idle;
    TransitionResult::new(state).with_effect(Effect::NotifyDispatchSettled {
        outcome: DispatchOutcome::Fallback,
    })
}
