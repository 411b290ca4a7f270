//! Bounded retry bookkeeping.
//!
//! Operational failures reach the machine as ordinary events. A transition
//! marked with `.retry(operation, exhausted)` records the failure here and is
//! routed to its normal target while attempts remain, or to `exhausted`
//! once the operation's [`RetryPolicy`] maximum is reached.

mod coordinator;
mod policy;

pub use coordinator::{RetryCoordinator, RetryDecision};
pub use policy::RetryPolicy;
