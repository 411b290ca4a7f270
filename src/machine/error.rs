//! Machine error types.

use thiserror::Error;

/// Lifecycle misuse of a [`crate::machine::Machine`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("Machine already started")]
    AlreadyStarted,

    #[error("Machine not started. Call start() before sending events")]
    NotStarted,
}

/// A guard that errored or panicked while a transition was being resolved.
///
/// The guard counts as false and resolution continues with the next
/// candidate; the error is reported, never propagated.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("Guard #{index} of '{state}' on '{trigger}' failed: {reason}")]
pub struct GuardEvaluationError {
    pub state: String,
    pub trigger: String,
    pub index: usize,
    pub reason: String,
}
