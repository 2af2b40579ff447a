//! Chat session client
//!
//! Keeps a local conversation directory and message buffer in step with a
//! remote Chat API. Sends are applied optimistically and raced against a
//! timeout; a pure state machine decides every transition and an actor
//! runtime executes the resulting effects.

pub mod api;
pub mod config;
pub mod directory;
pub mod render;
pub mod runtime;
pub mod state_machine;
