//! Builder for constructing states.

use crate::builder::transition::TransitionBuilder;
use crate::core::{Context, Event, State};
use crate::definition::{Action, Invocation, Transition};
use std::time::Duration;

/// Builder for one state and, recursively, its children.
///
/// Transitions keep the order they were declared in; that order decides
/// which one wins when several are enabled by the same trigger.
pub struct StateBuilder<S: State, E: Event, C: Context> {
    pub(crate) id: S,
    pub(crate) initial: Option<S>,
    pub(crate) is_final: bool,
    pub(crate) entry: Vec<Action<C, E>>,
    pub(crate) exit: Vec<Action<C, E>>,
    pub(crate) transitions: Vec<Transition<S, E, C>>,
    pub(crate) invocation: Option<Invocation<C, E>>,
    pub(crate) children: Vec<StateBuilder<S, E, C>>,
}

impl<S: State, E: Event, C: Context> StateBuilder<S, E, C> {
    pub fn new(id: S) -> Self {
        Self {
            id,
            initial: None,
            is_final: false,
            entry: Vec::new(),
            exit: Vec::new(),
            transitions: Vec::new(),
            invocation: None,
            children: Vec::new(),
        }
    }

    /// Child entered when this state is entered directly.
    pub fn initial(mut self, child: S) -> Self {
        self.initial = Some(child);
        self
    }

    /// Mark the state final. States whose `State::is_final` returns true
    /// are final without this call.
    pub fn final_state(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Append an entry action.
    pub fn entry<F>(mut self, action: F) -> Self
    where
        F: Fn(&C, Option<&E>) -> C::Patch + Send + Sync + 'static,
    {
        self.entry.push(Box::new(action));
        self
    }

    /// Append an exit action.
    pub fn exit<F>(mut self, action: F) -> Self
    where
        F: Fn(&C, Option<&E>) -> C::Patch + Send + Sync + 'static,
    {
        self.exit.push(Box::new(action));
        self
    }

    /// Unguarded transition to `target` on the named event.
    pub fn on(self, event: impl Into<String>, target: S) -> Self {
        self.transition(TransitionBuilder::on(event).to(target))
    }

    /// Unguarded timed transition to `target`.
    pub fn after(self, delay: Duration, target: S) -> Self {
        self.transition(TransitionBuilder::after(delay).to(target))
    }

    /// Unguarded transition to `target` once a final child is reached.
    pub fn on_done(self, target: S) -> Self {
        self.transition(TransitionBuilder::done().to(target))
    }

    pub fn transition(mut self, builder: TransitionBuilder<S, E, C>) -> Self {
        self.transitions.push(builder.build());
        self
    }

    /// Start an async service whenever this state is entered.
    pub fn invoke(mut self, invocation: Invocation<C, E>) -> Self {
        self.invocation = Some(invocation);
        self
    }

    pub fn child(mut self, child: StateBuilder<S, E, C>) -> Self {
        self.children.push(child);
        self
    }
}
