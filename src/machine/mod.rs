//! The machine core.
//!
//! A [`Machine`] owns one context and one active configuration and moves
//! between states as events, timer firings and invocation results arrive.
//! It is synchronous and single-owner: every operation takes `&mut self`, so
//! one macrostep (a transition plus any completion transitions it triggers)
//! finishes before the next begins. Timers and async services are not run
//! here; they are requested through [`Command`]s and reported back through
//! [`Machine::fire_timer`] and [`Machine::complete`]. The `runtime` module
//! does this on Tokio.

pub mod actions;
pub mod command;
pub mod error;
pub mod resolver;
pub mod snapshot;
pub mod timers;

pub use actions::ExecutionPlan;
pub use command::{Command, InvocationId};
pub use error::{GuardEvaluationError, MachineError};
pub use resolver::Resolution;
pub use snapshot::{Snapshot, Status};
pub use timers::{TimerId, TimerScheduler};

use crate::builder::{DefinitionError, DefinitionViolation};
use crate::checkpoint::{Checkpoint, CheckpointError, MachineMetadata, CHECKPOINT_VERSION};
use crate::config::MachineConfig;
use crate::core::{Context, Event, State, StateHistory, StateTransition};
use crate::definition::{MachineDefinition, StateKind, Trigger};
use crate::retry::{RetryCoordinator, RetryDecision};
use actions::run_actions;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Completion transitions taken in one macrostep before giving up.
const MAX_MICROSTEPS: usize = 100;

/// Handle returned by [`Machine::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Listener<S, C> = Arc<dyn Fn(&Snapshot<S, C>) + Send + Sync>;

/// A running instance of a [`MachineDefinition`].
///
/// # Example
///
/// ```rust
/// use statecraft::builder::{DefinitionBuilder, StateBuilder};
/// use statecraft::machine::Machine;
/// use statecraft::state_enum;
///
/// state_enum! {
///     enum Switch {
///         Off,
///         On,
///     }
/// }
///
/// let definition = DefinitionBuilder::new()
///     .initial(Switch::Off)
///     .state(StateBuilder::new(Switch::Off).on("TOGGLE", Switch::On))
///     .state(StateBuilder::new(Switch::On).on("TOGGLE", Switch::Off))
///     .build()
///     .unwrap();
///
/// let mut machine = Machine::new(definition, ()).unwrap();
/// machine.start().unwrap();
///
/// let snapshot = machine.send("TOGGLE").unwrap();
/// assert_eq!(snapshot.state(), Some(&Switch::On));
/// ```
pub struct Machine<S: State, E: Event, C: Context> {
    definition: Arc<MachineDefinition<S, E, C>>,
    config: MachineConfig,
    initial: S,
    status: Status,
    done: bool,
    configuration: Vec<S>,
    context: C,
    retries: RetryCoordinator,
    timers: TimerScheduler<S>,
    invocations: BTreeMap<InvocationId, S>,
    next_invocation: u64,
    generation: u64,
    history: StateHistory<S>,
    listeners: Vec<(SubscriptionId, Listener<S, C>)>,
    next_subscription: u64,
    commands: Vec<Command<E>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<S: State, E: Event, C: Context> Machine<S, E, C> {
    /// Create a machine in `NotStarted` status with the default configuration.
    pub fn new(
        definition: impl Into<Arc<MachineDefinition<S, E, C>>>,
        context: C,
    ) -> Result<Self, DefinitionError> {
        Self::with_config(definition, context, MachineConfig::default())
    }

    pub fn with_config(
        definition: impl Into<Arc<MachineDefinition<S, E, C>>>,
        context: C,
        config: MachineConfig,
    ) -> Result<Self, DefinitionError> {
        let definition = definition.into();
        definition.validate()?;
        let initial = definition
            .initial()
            .cloned()
            .ok_or_else(|| DefinitionError::new(vec![DefinitionViolation::MissingInitialState]))?;

        let history = match config.history_limit {
            Some(limit) => StateHistory::with_limit(limit),
            None => StateHistory::new(),
        };
        let now = Utc::now();

        Ok(Self {
            definition,
            config,
            initial,
            status: Status::NotStarted,
            done: false,
            configuration: Vec::new(),
            context,
            retries: RetryCoordinator::new(),
            timers: TimerScheduler::new(),
            invocations: BTreeMap::new(),
            next_invocation: 0,
            generation: 0,
            history,
            listeners: Vec::new(),
            next_subscription: 0,
            commands: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Enter the initial configuration.
    ///
    /// Entry actions run outer to inner. Listeners are notified of the
    /// initial entry like any other transition.
    pub fn start(&mut self) -> Result<Snapshot<S, C>, MachineError> {
        if self.status != Status::NotStarted {
            return Err(MachineError::AlreadyStarted);
        }

        let definition = Arc::clone(&self.definition);
        let plan = ExecutionPlan::initial(&definition, &self.initial);

        self.status = Status::Running;
        self.enter_states(&plan.enter, None, None);
        self.commit();
        debug!(state = %self.path(), "machine started");

        self.settle();
        self.notify();
        Ok(self.snapshot())
    }

    /// Deliver an event.
    ///
    /// Events nobody handles leave the machine untouched and are not an
    /// error. After `stop()` every event is ignored.
    pub fn send(&mut self, event: E) -> Result<Snapshot<S, C>, MachineError> {
        match self.status {
            Status::NotStarted => Err(MachineError::NotStarted),
            Status::Stopped => {
                trace!(event = event.name(), "event ignored, machine stopped");
                Ok(self.snapshot())
            }
            Status::Running => Ok(self.dispatch(event)),
        }
    }

    /// Owned copy of the current state and context.
    pub fn snapshot(&self) -> Snapshot<S, C> {
        Snapshot {
            value: self.configuration.clone(),
            context: self.context.clone(),
            status: self.status,
            retries: self.retries.counts().clone(),
            generation: self.generation,
            done: self.done,
        }
    }

    /// Register a listener called after every committed transition.
    ///
    /// Listeners run synchronously, in registration order.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&Snapshot<S, C>) + Send + Sync + 'static,
    {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    /// Cancel every timer and invocation and ignore all further input.
    pub fn stop(&mut self) -> Snapshot<S, C> {
        if self.status != Status::Stopped {
            self.cancel_everything();
            self.status = Status::Stopped;
            self.updated_at = Utc::now();
            debug!(state = %self.path(), "machine stopped");
        }
        self.snapshot()
    }

    /// Replace the context, e.g. with one loaded from storage.
    ///
    /// The active configuration, timers and listeners are left as they are.
    pub fn restore(&mut self, context: C) -> Snapshot<S, C> {
        self.context = context;
        self.updated_at = Utc::now();
        debug!(state = %self.path(), "context restored");
        self.snapshot()
    }

    /// Handle a timer firing. Timers whose state was exited are ignored.
    pub fn fire_timer(&mut self, id: TimerId) -> Snapshot<S, C> {
        if self.status != Status::Running {
            trace!(timer = %id, "timer ignored, machine not running");
            return self.snapshot();
        }
        let Some(timer) = self.timers.take(id) else {
            trace!(timer = %id, "stale timer ignored");
            return self.snapshot();
        };

        let definition = Arc::clone(&self.definition);
        let resolution =
            resolver::resolve_indexed(&definition, &timer.state, timer.index, &self.context);
        resolution.report();
        match resolution.selected {
            Some((source, index)) => {
                debug!(timer = %id, state = timer.state.name(), "timer fired");
                self.take_transition(&source, index, None);
                self.settle();
                self.notify();
            }
            None => {
                trace!(timer = %id, state = timer.state.name(), "timer guard rejected");
            }
        }
        self.snapshot()
    }

    /// Deliver the result of an invocation.
    ///
    /// Results of invocations whose state was exited are dropped.
    pub fn complete(&mut self, id: InvocationId, event: E) -> Snapshot<S, C> {
        if self.status != Status::Running {
            trace!(invocation = %id, "completion ignored, machine not running");
            return self.snapshot();
        }
        let Some(state) = self.invocations.remove(&id) else {
            trace!(invocation = %id, event = event.name(), "stale completion ignored");
            return self.snapshot();
        };

        debug!(invocation = %id, state = state.name(), event = event.name(), "invocation completed");
        self.dispatch(event)
    }

    /// True if `event` would select a transition right now.
    ///
    /// Guards are evaluated but their failures are not logged.
    pub fn can(&self, event: &E) -> bool {
        self.status == Status::Running
            && resolver::resolve_event(&self.definition, &self.configuration, &self.context, event)
                .is_match()
    }

    /// True if `state` is on the active path.
    pub fn matches(&self, state: &S) -> bool {
        self.configuration.contains(state)
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// True once a top-level final state has been reached.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// The innermost active state.
    pub fn state(&self) -> Option<&S> {
        self.configuration.last()
    }

    pub fn configuration(&self) -> &[S] {
        &self.configuration
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn history(&self) -> &StateHistory<S> {
        &self.history
    }

    pub fn retries(&self) -> &RetryCoordinator {
        &self.retries
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn definition(&self) -> &Arc<MachineDefinition<S, E, C>> {
        &self.definition
    }

    /// Ids of the timers currently armed.
    pub fn pending_timers(&self) -> Vec<TimerId> {
        self.timers.iter().map(|(id, _)| *id).collect()
    }

    /// Ids of the invocations still awaiting a result.
    pub fn pending_invocations(&self) -> Vec<InvocationId> {
        self.invocations.keys().copied().collect()
    }

    /// Drain the commands emitted since the last call.
    pub fn take_commands(&mut self) -> Vec<Command<E>> {
        std::mem::take(&mut self.commands)
    }

    /// Capture a serializable image of the machine.
    pub fn checkpoint(&self) -> Checkpoint<S, C> {
        Checkpoint {
            version: CHECKPOINT_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            configuration: self.configuration.clone(),
            context: self.context.clone(),
            retries: self.retries.counts().clone(),
            history: self.history.clone(),
            metadata: MachineMetadata {
                created_at: self.created_at,
                updated_at: self.updated_at,
                generation: self.generation,
                status: self.status,
            },
        }
    }

    /// Resume a machine from a checkpoint taken with the same definition.
    ///
    /// Entry actions are not run again. Timers of the active states are
    /// re-armed with their full delay and invocations are relaunched.
    pub fn from_checkpoint(
        definition: impl Into<Arc<MachineDefinition<S, E, C>>>,
        checkpoint: Checkpoint<S, C>,
        config: MachineConfig,
    ) -> Result<Self, CheckpointError> {
        checkpoint.validate_version()?;

        let mut machine = Self::with_config(definition, checkpoint.context, config)?;
        validate_configuration(
            &machine.definition,
            &checkpoint.configuration,
            checkpoint.metadata.status,
        )?;

        machine.configuration = checkpoint.configuration;
        machine.status = checkpoint.metadata.status;
        machine.retries = RetryCoordinator::from_counts(checkpoint.retries);
        machine.history = checkpoint.history;
        machine.history.set_limit(machine.config.history_limit);
        machine.generation = checkpoint.metadata.generation;
        machine.created_at = checkpoint.metadata.created_at;
        machine.updated_at = checkpoint.metadata.updated_at;
        machine.done = machine.status == Status::Stopped
            && machine
                .configuration
                .last()
                .is_some_and(|leaf| machine.definition.is_final(leaf))
            && machine.configuration.len() == 1;

        if machine.status == Status::Running {
            let active = machine.configuration.clone();
            for state in &active {
                machine.activate(state);
            }
        }

        debug!(
            state = %machine.path(),
            generation = machine.generation,
            "machine resumed from checkpoint"
        );
        Ok(machine)
    }

    fn path(&self) -> String {
        self.configuration
            .iter()
            .map(State::name)
            .collect::<Vec<_>>()
            .join(".")
    }

    fn dispatch(&mut self, event: E) -> Snapshot<S, C> {
        let definition = Arc::clone(&self.definition);
        let resolution =
            resolver::resolve_event(&definition, &self.configuration, &self.context, &event);
        resolution.report();

        let Some((source, index)) = resolution.selected else {
            trace!(event = event.name(), state = %self.path(), "no transition for event");
            return self.snapshot();
        };

        self.take_transition(&source, index, Some(&event));
        self.settle();
        self.notify();
        self.snapshot()
    }

    /// Apply transition `index` declared on `source`.
    fn take_transition(&mut self, source: &S, index: usize, event: Option<&E>) {
        let definition = Arc::clone(&self.definition);
        let Some(transition) = definition
            .node(source)
            .and_then(|node| node.transitions().get(index))
        else {
            return;
        };

        let trigger = match event {
            Some(event) => event.name().to_string(),
            None => transition.trigger().to_string(),
        };

        let mut attempt = 0;
        let mut retrying = None;
        let target = match (transition.retry(), transition.target()) {
            (Some(route), Some(target)) => {
                let max_attempts = definition
                    .retry_policy(&route.operation)
                    .map_or(0, |policy| policy.max_attempts);
                match self.retries.record_and_decide(&route.operation, max_attempts) {
                    RetryDecision::Retry { attempt: failures } => {
                        attempt = failures;
                        retrying = Some(route.operation.as_str());
                        debug!(
                            operation = route.operation.as_str(),
                            attempt = failures,
                            max_attempts,
                            "retrying operation"
                        );
                        Some(target.clone())
                    }
                    RetryDecision::Exhausted { attempts } => {
                        attempt = attempts;
                        warn!(
                            operation = route.operation.as_str(),
                            attempts,
                            exhausted = route.exhausted.name(),
                            "retries exhausted"
                        );
                        Some(route.exhausted.clone())
                    }
                }
            }
            (_, target) => target.cloned(),
        };

        for operation in transition.resets() {
            self.retries.reset(operation);
        }

        let Some(target) = target else {
            run_actions(&mut self.context, &transition.actions, event);
            self.commit();
            debug!(state = source.name(), trigger = trigger.as_str(), "internal transition taken");
            return;
        };

        let plan = ExecutionPlan::external(&definition, &self.configuration, source, &target);
        let from = self.configuration.last().cloned();

        for state in &plan.exit {
            self.exit_state(state, event);
        }
        self.configuration.truncate(plan.keep);

        run_actions(&mut self.context, &transition.actions, event);
        self.enter_states(&plan.enter, event, retrying);
        self.commit();

        let to = self.configuration.last().cloned();
        debug!(
            from = from.as_ref().map_or("", |state| state.name()),
            to = to.as_ref().map_or("", |state| state.name()),
            trigger = trigger.as_str(),
            attempt,
            "transition committed"
        );

        if let (Some(from), Some(to), true) = (from, to, self.config.record_history) {
            self.history.push(StateTransition {
                from,
                to,
                trigger,
                timestamp: Utc::now(),
                attempt,
            });
        }
    }

    /// Take completion transitions until the leaf is not a final child.
    fn settle(&mut self) {
        let definition = Arc::clone(&self.definition);

        for _ in 0..MAX_MICROSTEPS {
            let Some(leaf) = self.configuration.last().cloned() else {
                return;
            };
            if !definition.is_final(&leaf) {
                return;
            }

            let Some(parent) = definition.node(&leaf).and_then(|node| node.parent().cloned())
            else {
                self.finish();
                return;
            };

            let resolution = resolver::resolve_done(&definition, &parent, &self.context);
            resolution.report();
            let Some((source, index)) = resolution.selected else {
                return;
            };
            let internal = definition
                .node(&source)
                .and_then(|node| node.transitions().get(index))
                .is_some_and(|transition| transition.is_internal());

            self.take_transition(&source, index, None);
            if internal {
                return;
            }
        }

        warn!(
            state = %self.path(),
            limit = MAX_MICROSTEPS,
            "completion transitions did not settle"
        );
    }

    fn finish(&mut self) {
        self.cancel_everything();
        self.status = Status::Stopped;
        self.done = true;
        debug!(state = %self.path(), "machine reached a final state");
    }

    /// Enter `states` outer to inner. `retrying` names an operation whose
    /// counter must survive the entry, so a retry that loops back into one
    /// of its policy's `reset_on` states still counts toward the maximum.
    fn enter_states(&mut self, states: &[S], event: Option<&E>, retrying: Option<&str>) {
        let definition = Arc::clone(&self.definition);

        for state in states {
            let Some(node) = definition.node(state) else {
                continue;
            };
            self.configuration.push(state.clone());

            for (operation, policy) in &definition.retry_policies {
                if retrying == Some(operation.as_str()) {
                    continue;
                }
                if policy.resets_on(state) && self.retries.reset(operation) > 0 {
                    debug!(operation = %operation, state = state.name(), "retry counter reset");
                }
            }

            run_actions(&mut self.context, &node.entry, event);
            self.activate(state);
        }
    }

    /// Arm the timers and launch the invocation of an entered state.
    fn activate(&mut self, state: &S) {
        let definition = Arc::clone(&self.definition);
        let Some(node) = definition.node(state) else {
            return;
        };

        for (index, transition) in node.transitions().iter().enumerate() {
            if let Trigger::After(delay) = transition.trigger() {
                let id = self.timers.arm(state.clone(), index, *delay);
                trace!(timer = %id, state = state.name(), ?delay, "timer armed");
                self.commands.push(Command::StartTimer { id, delay: *delay });
            }
        }

        if let Some(invocation) = node.invocation() {
            self.next_invocation += 1;
            let id = InvocationId(self.next_invocation);
            self.invocations.insert(id, state.clone());
            debug!(
                invocation = %id,
                operation = invocation.operation(),
                state = state.name(),
                "invocation launched"
            );
            self.commands.push(Command::Invoke {
                id,
                operation: invocation.operation().to_string(),
                task: invocation.launch(&self.context),
            });
        }
    }

    fn exit_state(&mut self, state: &S, event: Option<&E>) {
        let definition = Arc::clone(&self.definition);

        for id in self.timers.cancel_state(state) {
            trace!(timer = %id, state = state.name(), "timer cancelled");
            self.commands.push(Command::CancelTimer { id });
        }

        let cancelled: Vec<InvocationId> = self
            .invocations
            .iter()
            .filter(|(_, owner)| *owner == state)
            .map(|(id, _)| *id)
            .collect();
        for id in cancelled {
            self.invocations.remove(&id);
            trace!(invocation = %id, state = state.name(), "invocation cancelled");
            self.commands.push(Command::CancelInvoke { id });
        }

        if let Some(node) = definition.node(state) {
            run_actions(&mut self.context, &node.exit, event);
        }
    }

    fn cancel_everything(&mut self) {
        for id in self.timers.cancel_all() {
            self.commands.push(Command::CancelTimer { id });
        }
        let invocations = std::mem::take(&mut self.invocations);
        for id in invocations.into_keys() {
            self.commands.push(Command::CancelInvoke { id });
        }
    }

    fn commit(&mut self) {
        self.generation += 1;
        self.updated_at = Utc::now();
    }

    fn notify(&self) {
        if self.listeners.is_empty() {
            return;
        }
        let listeners: Vec<Listener<S, C>> = self
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        let snapshot = self.snapshot();
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

fn validate_configuration<S: State, E: Event, C: Context>(
    definition: &MachineDefinition<S, E, C>,
    configuration: &[S],
    status: Status,
) -> Result<(), CheckpointError> {
    if configuration.is_empty() {
        return match status {
            Status::NotStarted => Ok(()),
            _ => Err(CheckpointError::InvalidConfiguration(
                "active configuration is empty".to_string(),
            )),
        };
    }

    let mut parent: Option<&S> = None;
    for state in configuration {
        let node = definition.node(state).ok_or_else(|| {
            CheckpointError::InvalidConfiguration(format!("state '{}' is not declared", state.name()))
        })?;
        if node.parent() != parent {
            return Err(CheckpointError::InvalidConfiguration(format!(
                "state '{}' is not a child of the preceding active state",
                state.name()
            )));
        }
        parent = Some(state);
    }

    match configuration.last().and_then(|leaf| definition.node(leaf)) {
        Some(node) if node.kind() == StateKind::Compound => Err(CheckpointError::InvalidConfiguration(
            format!("active configuration ends at compound state '{}'", node.id().name()),
        )),
        _ => Ok(()),
    }
}

impl<S: State, E: Event, C: Context> fmt::Debug for Machine<S, E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("status", &self.status)
            .field("configuration", &self.configuration)
            .field("context", &self.context)
            .field("generation", &self.generation)
            .field("timers", &self.timers.len())
            .field("invocations", &self.invocations.len())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}
