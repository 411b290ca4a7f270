//! Core state machine types.
//!
//! This module contains the value types every other module builds on:
//! - State identifiers via the `State` trait
//! - Events via the `Event` trait
//! - The machine-owned record via the `Context` trait
//! - Guard predicates for transition control
//! - Transition history tracking

mod context;
mod event;
mod guard;
mod history;
mod state;

pub use context::{Context, JsonContext};
pub use event::Event;
pub use guard::{BoxError, Guard};
pub use history::{StateHistory, StateTransition};
pub use state::State;
