//! Retry policies declared per operation.

use crate::core::State;
use serde::{Deserialize, Serialize};

/// Fixed retry limit for one operation.
///
/// `reset_on` lists the states whose entry zeroes the operation's counter.
/// Transitions can also reset it explicitly with
/// `TransitionBuilder::reset_retries`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct RetryPolicy<S: State> {
    pub max_attempts: u32,
    pub reset_on: Vec<S>,
}

impl<S: State> RetryPolicy<S> {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            reset_on: Vec::new(),
        }
    }

    /// Reset the counter whenever one of these states is entered.
    pub fn reset_on(mut self, states: impl IntoIterator<Item = S>) -> Self {
        self.reset_on.extend(states);
        self
    }

    pub fn resets_on(&self, state: &S) -> bool {
        self.reset_on.contains(state)
    }
}
