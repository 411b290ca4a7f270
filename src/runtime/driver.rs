//! The task that owns a machine and executes its commands.

use super::Message;
use crate::core::{Context, Event, State};
use crate::machine::{Command, InvocationId, Machine, TimerId};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

pub(crate) struct Driver<S: State, E: Event, C: Context> {
    machine: Machine<S, E, C>,
    mailbox: mpsc::WeakSender<Message<S, E, C>>,
    timers: HashMap<TimerId, JoinHandle<()>>,
    invocations: HashMap<InvocationId, JoinHandle<()>>,
}

impl<S: State, E: Event, C: Context> Driver<S, E, C> {
    pub(crate) fn new(
        machine: Machine<S, E, C>,
        mailbox: mpsc::WeakSender<Message<S, E, C>>,
    ) -> Self {
        Self {
            machine,
            mailbox,
            timers: HashMap::new(),
            invocations: HashMap::new(),
        }
    }

    pub(crate) async fn run(mut self, mut receiver: mpsc::Receiver<Message<S, E, C>>) {
        // A machine resumed from a checkpoint already has timers to arm.
        self.execute_commands();

        while let Some(message) = receiver.recv().await {
            self.handle(message);
            self.execute_commands();
        }

        debug!("all machine handles dropped, shutting down");
        let timers = self.timers.drain().map(|(_, task)| task);
        let invocations = self.invocations.drain().map(|(_, task)| task);
        for task in timers.chain(invocations) {
            task.abort();
        }
    }

    fn handle(&mut self, message: Message<S, E, C>) {
        // A dropped receiver means the caller stopped waiting; nothing to do.
        match message {
            Message::Start { resp } => {
                let _ = resp.send(self.machine.start());
            }
            Message::Send { event, resp } => {
                let _ = resp.send(self.machine.send(event));
            }
            Message::Snapshot { resp } => {
                let _ = resp.send(self.machine.snapshot());
            }
            Message::Subscribe { listener, resp } => {
                let id = self.machine.subscribe(move |snapshot| listener(snapshot));
                let _ = resp.send(id);
            }
            Message::Unsubscribe { id, resp } => {
                let _ = resp.send(self.machine.unsubscribe(id));
            }
            Message::Restore { context, resp } => {
                let _ = resp.send(self.machine.restore(context));
            }
            Message::Stop { resp } => {
                let _ = resp.send(self.machine.stop());
            }
            Message::Checkpoint { resp } => {
                let _ = resp.send(self.machine.checkpoint());
            }
            Message::TimerFired(id) => {
                self.timers.remove(&id);
                self.machine.fire_timer(id);
            }
            Message::Completed(id, event) => {
                self.invocations.remove(&id);
                self.machine.complete(id, event);
            }
        }
    }

    fn execute_commands(&mut self) {
        for command in self.machine.take_commands() {
            match command {
                Command::StartTimer { id, delay } => {
                    let mailbox = self.mailbox.clone();
                    let task = tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        if let Some(sender) = mailbox.upgrade() {
                            let _ = sender.send(Message::TimerFired(id)).await;
                        }
                    });
                    self.timers.insert(id, task);
                }
                Command::CancelTimer { id } => {
                    if let Some(task) = self.timers.remove(&id) {
                        trace!(timer = %id, "aborting timer task");
                        task.abort();
                    }
                }
                Command::Invoke {
                    id,
                    operation,
                    task,
                } => {
                    let mailbox = self.mailbox.clone();
                    trace!(invocation = %id, operation = operation.as_str(), "spawning invocation");
                    let task = tokio::spawn(async move {
                        let event = task.await;
                        if let Some(sender) = mailbox.upgrade() {
                            let _ = sender.send(Message::Completed(id, event)).await;
                        }
                    });
                    self.invocations.insert(id, task);
                }
                Command::CancelInvoke { id } => {
                    if let Some(task) = self.invocations.remove(&id) {
                        trace!(invocation = %id, "aborting invocation task");
                        task.abort();
                    }
                }
            }
        }
    }
}
