//! Side effects requested by the machine core.
//!
//! The core never sleeps or spawns. Arming a timer or starting an invoked
//! service is emitted as a [`Command`] for the host to carry out; the host
//! reports back through `Machine::fire_timer` and `Machine::complete`.

use crate::definition::ServiceFuture;
use crate::machine::timers::TimerId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identifier of one launched invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InvocationId(pub u64);

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invocation-{}", self.0)
    }
}

pub enum Command<E> {
    /// Call `fire_timer(id)` after `delay`.
    StartTimer { id: TimerId, delay: Duration },

    /// The timer's state was exited; its firing would be ignored.
    CancelTimer { id: TimerId },

    /// Drive `task` and pass its output to `complete(id, event)`.
    Invoke {
        id: InvocationId,
        operation: String,
        task: ServiceFuture<E>,
    },

    /// The invoking state was exited; the task may be dropped.
    CancelInvoke { id: InvocationId },
}

impl<E> fmt::Debug for Command<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartTimer { id, delay } => f
                .debug_struct("StartTimer")
                .field("id", id)
                .field("delay", delay)
                .finish(),
            Self::CancelTimer { id } => f.debug_struct("CancelTimer").field("id", id).finish(),
            Self::Invoke { id, operation, .. } => f
                .debug_struct("Invoke")
                .field("id", id)
                .field("operation", operation)
                .finish_non_exhaustive(),
            Self::CancelInvoke { id } => f.debug_struct("CancelInvoke").field("id", id).finish(),
        }
    }
}
