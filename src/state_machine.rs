//! Core chat session state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{DispatchOutcome, Effect, Operation};
pub use event::Event;
pub use state::{DispatchState, SessionContext, SessionState};
pub use transition::{transition, TransitionError, TransitionResult};
