//! Definition errors reported when a machine definition is validated.

use thiserror::Error;

/// A single problem found in a machine definition.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DefinitionViolation {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("Initial state '{0}' is not declared")]
    UnknownInitialState(String),

    #[error("Initial state '{0}' must be a top-level state")]
    InitialNotTopLevel(String),

    #[error("State '{0}' is declared more than once")]
    DuplicateState(String),

    #[error("Transition from '{source_state}' on '{trigger}' targets undeclared state '{target}'")]
    UnknownTarget {
        source_state: String,
        trigger: String,
        target: String,
    },

    #[error("Compound state '{0}' has children but no initial child")]
    MissingChildInitial(String),

    #[error("Initial state '{initial}' of '{parent}' is not one of its children")]
    InitialNotChild { parent: String, initial: String },

    #[error("Final state '{0}' cannot have children")]
    FinalWithChildren(String),

    #[error("Final state '{0}' cannot have outgoing transitions")]
    FinalWithTransitions(String),

    #[error("State '{0}' declares a done transition but has no children")]
    DoneWithoutChildren(String),

    #[error("Retry transition from '{0}' has no target to retry into")]
    RetryWithoutTarget(String),

    #[error("State '{source_state}' references retry operation '{operation}' with no policy")]
    UnknownRetryPolicy {
        source_state: String,
        operation: String,
    },

    #[error("Retry policy '{0}' is declared more than once")]
    DuplicateRetryPolicy(String),

    #[error("Retry policy '{0}' must allow at least one attempt")]
    InvalidRetryPolicy(String),

    #[error("Retry policy '{operation}' resets on undeclared state '{state}'")]
    UnknownResetState { operation: String, state: String },
}

/// Errors that can occur when validating a machine definition.
///
/// Validation does not stop at the first problem; every violation found is
/// reported.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("Invalid machine definition: {}", render(.violations))]
pub struct DefinitionError {
    violations: Vec<DefinitionViolation>,
}

impl DefinitionError {
    pub fn new(violations: Vec<DefinitionViolation>) -> Self {
        Self { violations }
    }

    pub fn violations(&self) -> &[DefinitionViolation] {
        &self.violations
    }

    pub fn contains(&self, violation: &DefinitionViolation) -> bool {
        self.violations.contains(violation)
    }
}

fn render(violations: &[DefinitionViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
