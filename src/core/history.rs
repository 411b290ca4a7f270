//! State transition history tracking.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single committed state change.
///
/// `from` and `to` are the innermost active states before and after the
/// change. `trigger` names what caused it: an event type, `after <ms>ms` for
/// a timer, or `done` for a compound state completing.
///
/// # Example
///
/// ```rust
/// use statecraft::core::{State, StateTransition};
/// use serde::{Deserialize, Serialize};
/// use chrono::Utc;
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum Switch {
///     Off,
///     On,
/// }
///
/// impl State for Switch {
///     fn name(&self) -> &str {
///         match self {
///             Self::Off => "Off",
///             Self::On => "On",
///         }
///     }
/// }
///
/// let transition = StateTransition {
///     from: Switch::Off,
///     to: Switch::On,
///     trigger: "TOGGLE".to_string(),
///     timestamp: Utc::now(),
///     attempt: 0,
/// };
/// assert_eq!(transition.trigger, "TOGGLE");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateTransition<S: State> {
    /// The state being transitioned from
    pub from: S,
    /// The state being transitioned to
    pub to: S,
    /// What caused the transition
    pub trigger: String,
    /// When the transition occurred
    pub timestamp: DateTime<Utc>,
    /// Retry attempt count of the operation the transition belongs to, 0 otherwise
    pub attempt: u32,
}

/// Ordered history of state transitions.
///
/// `record` returns a new history and leaves the original untouched. The
/// machine itself appends in place through a bounded buffer so long-running
/// workflows do not grow without limit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StateHistory<S: State> {
    transitions: Vec<StateTransition<S>>,
    #[serde(default)]
    limit: Option<usize>,
}

impl<S: State> Default for StateHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> StateHistory<S> {
    /// Create a new, unbounded, empty history.
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
            limit: None,
        }
    }

    /// Create an empty history that keeps at most `limit` transitions.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            transitions: Vec::new(),
            limit: Some(limit),
        }
    }

    /// Record a transition, returning a new history.
    ///
    /// # Example
    ///
    /// ```rust
    /// use statecraft::core::{StateHistory, StateTransition};
    /// use statecraft::state_enum;
    /// use chrono::Utc;
    ///
    /// state_enum! {
    ///     enum Step { A, B }
    /// }
    ///
    /// let history = StateHistory::new();
    /// let next = history.record(StateTransition {
    ///     from: Step::A,
    ///     to: Step::B,
    ///     trigger: "GO".to_string(),
    ///     timestamp: Utc::now(),
    ///     attempt: 0,
    /// });
    ///
    /// assert_eq!(next.transitions().len(), 1);
    /// assert_eq!(history.transitions().len(), 0); // Original unchanged
    /// ```
    pub fn record(&self, transition: StateTransition<S>) -> Self {
        let mut next = self.clone();
        next.push(transition);
        next
    }

    /// Append in place, dropping the oldest entries beyond the limit.
    pub(crate) fn push(&mut self, transition: StateTransition<S>) {
        self.transitions.push(transition);
        self.trim();
    }

    /// Replace the retention limit, dropping the oldest entries that no
    /// longer fit.
    pub(crate) fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
        self.trim();
    }

    fn trim(&mut self) {
        if let Some(limit) = self.limit {
            if self.transitions.len() > limit {
                let excess = self.transitions.len() - limit;
                self.transitions.drain(..excess);
            }
        }
    }

    /// States visited by the retained transitions: the first `from`, then
    /// every `to`.
    pub fn visited(&self) -> Vec<&S> {
        self.transitions
            .first()
            .map(|first| &first.from)
            .into_iter()
            .chain(self.transitions.iter().map(|transition| &transition.to))
            .collect()
    }

    /// Time between the first and last retained transitions.
    pub fn duration(&self) -> Option<Duration> {
        let first = self.transitions.first()?;
        let last = self.transitions.last()?;
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    /// Transitions whose trigger matches `trigger`, oldest first.
    pub fn triggered_by<'a>(
        &'a self,
        trigger: &'a str,
    ) -> impl Iterator<Item = &'a StateTransition<S>> + 'a {
        self.transitions
            .iter()
            .filter(move |transition| transition.trigger == trigger)
    }

    /// Get all retained transitions in order.
    pub fn transitions(&self) -> &[StateTransition<S>] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}
