//! Tokio runtime for machines.
//!
//! [`spawn`] moves a [`Machine`] into a task that owns it and feeds it from a
//! bounded mailbox. Calls through a [`MachineHandle`], timer firings and
//! invocation results all arrive as mailbox messages and are handled one at
//! a time in arrival order. Timers and invocations run as separate tasks that
//! are aborted when the machine cancels them; they hold only a weak sender,
//! so dropping every handle shuts the loop down.

mod driver;
mod handle;

pub use handle::MachineHandle;

use crate::checkpoint::Checkpoint;
use crate::config::RuntimeConfig;
use crate::core::{Context, Event, State};
use crate::machine::{
    InvocationId, Machine, MachineError, Snapshot, SubscriptionId, TimerId,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Errors returned by [`MachineHandle`] calls.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error(transparent)]
    Machine(#[from] MachineError),

    #[error("Machine task is no longer running")]
    Closed,
}

type Responder<T> = oneshot::Sender<T>;

pub(crate) type SharedListener<S, C> = Arc<dyn Fn(&Snapshot<S, C>) + Send + Sync>;

/// Messages processed by the machine task
pub(crate) enum Message<S: State, E: Event, C: Context> {
    Start {
        resp: Responder<Result<Snapshot<S, C>, MachineError>>,
    },
    Send {
        event: E,
        resp: Responder<Result<Snapshot<S, C>, MachineError>>,
    },
    Snapshot {
        resp: Responder<Snapshot<S, C>>,
    },
    Subscribe {
        listener: SharedListener<S, C>,
        resp: Responder<SubscriptionId>,
    },
    Unsubscribe {
        id: SubscriptionId,
        resp: Responder<bool>,
    },
    Restore {
        context: C,
        resp: Responder<Snapshot<S, C>>,
    },
    Stop {
        resp: Responder<Snapshot<S, C>>,
    },
    Checkpoint {
        resp: Responder<Checkpoint<S, C>>,
    },
    TimerFired(TimerId),
    Completed(InvocationId, E),
}

/// Run `machine` on the current Tokio runtime.
///
/// The machine is not started; call [`MachineHandle::start`].
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
pub fn spawn<S: State, E: Event, C: Context>(
    machine: Machine<S, E, C>,
    config: &RuntimeConfig,
) -> MachineHandle<S, E, C> {
    let (sender, receiver) = mpsc::channel(config.mailbox_capacity.max(1));
    let driver = driver::Driver::new(machine, sender.downgrade());
    tokio::spawn(driver.run(receiver));
    MachineHandle::new(sender)
}
