//! Per-user conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions: the
//! transition function decides, the runtime executes the returned effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, Submission};
pub use event::Event;
pub use state::{PendingConversation, UserContext};
pub use transition::transition;
