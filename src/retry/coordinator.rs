//! Per-operation attempt counters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of recording a failure against a maximum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Another attempt is allowed; `attempt` is the failure count so far.
    Retry { attempt: u32 },

    /// The maximum was reached; route to the terminal failure state.
    Exhausted { attempts: u32 },
}

/// Tracks `operation -> attempt count`.
///
/// Counters only move through `record_failure` and `reset`; the maximum is
/// supplied by the caller from a fixed policy on every decision.
///
/// # Example
///
/// ```rust
/// use statecraft::retry::RetryCoordinator;
///
/// let mut retries = RetryCoordinator::new();
/// retries.record_failure("payment");
/// assert!(retries.should_retry("payment", 3));
///
/// retries.record_failure("payment");
/// retries.record_failure("payment");
/// assert!(!retries.should_retry("payment", 3));
///
/// retries.reset("payment");
/// assert_eq!(retries.attempts("payment"), 0);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryCoordinator {
    attempts: BTreeMap<String, u32>,
}

impl RetryCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a coordinator from previously captured counters.
    pub fn from_counts(attempts: BTreeMap<String, u32>) -> Self {
        Self { attempts }
    }

    /// Increment the failure count of an operation, returning the new count.
    pub fn record_failure(&mut self, operation: &str) -> u32 {
        let count = self.attempts.entry(operation.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// True iff the operation has failed fewer than `max_attempts` times.
    pub fn should_retry(&self, operation: &str, max_attempts: u32) -> bool {
        self.attempts(operation) < max_attempts
    }

    /// Record a failure and decide between retrying and giving up.
    pub fn record_and_decide(&mut self, operation: &str, max_attempts: u32) -> RetryDecision {
        let attempt = self.record_failure(operation);
        if self.should_retry(operation, max_attempts) {
            RetryDecision::Retry { attempt }
        } else {
            RetryDecision::Exhausted { attempts: attempt }
        }
    }

    /// Zero the counter of an operation, returning the previous count.
    pub fn reset(&mut self, operation: &str) -> u32 {
        self.attempts.remove(operation).unwrap_or(0)
    }

    pub fn attempts(&self, operation: &str) -> u32 {
        self.attempts.get(operation).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &BTreeMap<String, u32> {
        &self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_operation_has_zero_attempts() {
        let retries = RetryCoordinator::new();
        assert_eq!(retries.attempts("fetch"), 0);
        assert!(retries.should_retry("fetch", 1));
    }

    #[test]
    fn record_failure_increments() {
        let mut retries = RetryCoordinator::new();
        assert_eq!(retries.record_failure("fetch"), 1);
        assert_eq!(retries.record_failure("fetch"), 2);
        assert_eq!(retries.attempts("fetch"), 2);
    }

    #[test]
    fn operations_are_counted_independently() {
        let mut retries = RetryCoordinator::new();
        retries.record_failure("fetch");
        retries.record_failure("charge");
        retries.record_failure("charge");

        assert_eq!(retries.attempts("fetch"), 1);
        assert_eq!(retries.attempts("charge"), 2);
    }

    #[test]
    fn third_failure_is_exhausted_with_max_three() {
        let mut retries = RetryCoordinator::new();

        assert_eq!(
            retries.record_and_decide("charge", 3),
            RetryDecision::Retry { attempt: 1 }
        );
        assert_eq!(
            retries.record_and_decide("charge", 3),
            RetryDecision::Retry { attempt: 2 }
        );
        assert_eq!(
            retries.record_and_decide("charge", 3),
            RetryDecision::Exhausted { attempts: 3 }
        );
    }

    #[test]
    fn reset_returns_previous_count() {
        let mut retries = RetryCoordinator::new();
        retries.record_failure("fetch");
        retries.record_failure("fetch");

        assert_eq!(retries.reset("fetch"), 2);
        assert_eq!(retries.attempts("fetch"), 0);
        assert_eq!(retries.reset("fetch"), 0);
    }

    #[test]
    fn counts_round_trip() {
        let mut retries = RetryCoordinator::new();
        retries.record_failure("fetch");

        let restored = RetryCoordinator::from_counts(retries.counts().clone());
        assert_eq!(restored, retries);
    }
}
