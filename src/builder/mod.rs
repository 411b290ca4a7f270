//! Builder API for ergonomic machine construction.
//!
//! This module provides fluent builders and macros for declaring machine
//! definitions with minimal boilerplate while keeping them type checked.

pub mod definition;
pub mod error;
pub mod macros;
pub mod state;
pub mod transition;

pub use definition::DefinitionBuilder;
pub use error::{DefinitionError, DefinitionViolation};
pub use state::StateBuilder;
pub use transition::TransitionBuilder;
