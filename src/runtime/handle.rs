//! Async handle to a spawned machine.

use super::{Message, Responder, RuntimeError};
use crate::checkpoint::Checkpoint;
use crate::core::{Context, Event, State};
use crate::machine::{Snapshot, SubscriptionId};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Cloneable handle to a machine running on Tokio.
///
/// Every call is queued behind the calls, timer firings and invocation
/// results already in the mailbox.
///
/// # Example
///
/// ```rust
/// use statecraft::builder::{DefinitionBuilder, StateBuilder};
/// use statecraft::config::RuntimeConfig;
/// use statecraft::machine::Machine;
/// use statecraft::runtime;
/// use statecraft::state_enum;
///
/// state_enum! {
///     enum Switch {
///         Off,
///         On,
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let definition = DefinitionBuilder::new()
///     .initial(Switch::Off)
///     .state(StateBuilder::new(Switch::Off).on("TOGGLE", Switch::On))
///     .state(StateBuilder::new(Switch::On).on("TOGGLE", Switch::Off))
///     .build()
///     .unwrap();
///
/// let machine = Machine::new(definition, ()).unwrap();
/// let handle = runtime::spawn(machine, &RuntimeConfig::default());
///
/// handle.start().await.unwrap();
/// let snapshot = handle.send("TOGGLE").await.unwrap();
/// assert_eq!(snapshot.state(), Some(&Switch::On));
/// # }
/// ```
pub struct MachineHandle<S: State, E: Event, C: Context> {
    sender: mpsc::Sender<Message<S, E, C>>,
}

impl<S: State, E: Event, C: Context> Clone for MachineHandle<S, E, C> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<S: State, E: Event, C: Context> MachineHandle<S, E, C> {
    pub(crate) fn new(sender: mpsc::Sender<Message<S, E, C>>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(Responder<T>) -> Message<S, E, C>,
    ) -> Result<T, RuntimeError> {
        let (resp, reply) = oneshot::channel();
        self.sender
            .send(message(resp))
            .await
            .map_err(|_| RuntimeError::Closed)?;
        reply.await.map_err(|_| RuntimeError::Closed)
    }

    pub async fn start(&self) -> Result<Snapshot<S, C>, RuntimeError> {
        Ok(self.request(|resp| Message::Start { resp }).await??)
    }

    pub async fn send(&self, event: E) -> Result<Snapshot<S, C>, RuntimeError> {
        Ok(self.request(|resp| Message::Send { event, resp }).await??)
    }

    pub async fn snapshot(&self) -> Result<Snapshot<S, C>, RuntimeError> {
        self.request(|resp| Message::Snapshot { resp }).await
    }

    /// Register a listener; it runs on the machine task after every
    /// committed transition.
    pub async fn subscribe<F>(&self, listener: F) -> Result<SubscriptionId, RuntimeError>
    where
        F: Fn(&Snapshot<S, C>) + Send + Sync + 'static,
    {
        let listener = Arc::new(listener);
        self.request(|resp| Message::Subscribe { listener, resp })
            .await
    }

    /// Receive every committed snapshot on a channel.
    pub async fn watch(
        &self,
    ) -> Result<(SubscriptionId, mpsc::UnboundedReceiver<Snapshot<S, C>>), RuntimeError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self
            .subscribe(move |snapshot: &Snapshot<S, C>| {
                let _ = tx.send(snapshot.clone());
            })
            .await?;
        Ok((id, rx))
    }

    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, RuntimeError> {
        self.request(|resp| Message::Unsubscribe { id, resp }).await
    }

    pub async fn restore(&self, context: C) -> Result<Snapshot<S, C>, RuntimeError> {
        self.request(|resp| Message::Restore { context, resp }).await
    }

    pub async fn stop(&self) -> Result<Snapshot<S, C>, RuntimeError> {
        self.request(|resp| Message::Stop { resp }).await
    }

    pub async fn checkpoint(&self) -> Result<Checkpoint<S, C>, RuntimeError> {
        self.request(|resp| Message::Checkpoint { resp }).await
    }

    /// True while the machine task is alive.
    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }
}
