//! Point-in-time views of a machine.

use crate::core::{Context, State};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle status of a machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    NotStarted,
    Running,
    Stopped,
}

/// Owned copy of a machine's observable state.
///
/// `value` is the active configuration from the top-level state down to the
/// current leaf. The context is a clone; changing it has no effect on the
/// machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Snapshot<S: State, C: Context> {
    pub value: Vec<S>,
    pub context: C,
    pub status: Status,
    pub retries: BTreeMap<String, u32>,
    pub generation: u64,
    pub done: bool,
}

impl<S: State, C: Context> Snapshot<S, C> {
    /// The innermost active state, if the machine has been started.
    pub fn state(&self) -> Option<&S> {
        self.value.last()
    }

    /// True if `state` is anywhere on the active path.
    pub fn matches(&self, state: &S) -> bool {
        self.value.contains(state)
    }

    /// Active path rendered as dotted state names, e.g. `Active.Playing`.
    pub fn path(&self) -> String {
        self.value
            .iter()
            .map(State::name)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Recorded failures of `operation`.
    pub fn attempts(&self, operation: &str) -> u32 {
        self.retries.get(operation).copied().unwrap_or(0)
    }
}
