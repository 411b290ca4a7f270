//! Delayed transitions bound to a single entry of a state.
//!
//! Each entry of a state arms fresh timer ids, so a firing that outlives the
//! entry it was armed for is recognised as stale and ignored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Identifier of one armed timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// A live timer: which transition of which state it fires.
#[derive(Clone, Debug, PartialEq)]
pub struct ArmedTimer<S> {
    pub state: S,
    pub index: usize,
    pub delay: Duration,
}

#[derive(Clone, Debug)]
pub struct TimerScheduler<S> {
    next_id: u64,
    armed: BTreeMap<TimerId, ArmedTimer<S>>,
}

impl<S> Default for TimerScheduler<S> {
    fn default() -> Self {
        Self {
            next_id: 0,
            armed: BTreeMap::new(),
        }
    }
}

impl<S: Clone + PartialEq> TimerScheduler<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer for transition `index` of `state`.
    pub fn arm(&mut self, state: S, index: usize, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.armed.insert(
            id,
            ArmedTimer {
                state,
                index,
                delay,
            },
        );
        id
    }

    /// Disarm every timer of `state`, returning their ids.
    pub fn cancel_state(&mut self, state: &S) -> Vec<TimerId> {
        let ids: Vec<TimerId> = self
            .armed
            .iter()
            .filter(|(_, timer)| &timer.state == state)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            self.armed.remove(id);
        }
        ids
    }

    pub fn cancel_all(&mut self) -> Vec<TimerId> {
        let ids = self.armed.keys().copied().collect();
        self.armed.clear();
        ids
    }

    /// Remove a firing timer. Returns `None` if it is no longer live.
    pub fn take(&mut self, id: TimerId) -> Option<ArmedTimer<S>> {
        self.armed.remove(&id)
    }

    pub fn is_live(&self, id: TimerId) -> bool {
        self.armed.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TimerId, &ArmedTimer<S>)> {
        self.armed.iter()
    }
}
