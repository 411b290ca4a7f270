//! Declared transitions.

use crate::core::{Context, Event, Guard, State};
use std::fmt;
use std::time::Duration;

/// Side effect run against the context; the returned patch is merged before
/// the next action runs.
pub type Action<C, E> = Box<dyn Fn(&C, Option<&E>) -> <C as Context>::Patch + Send + Sync>;

/// What makes a transition eligible.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// An event whose `name()` equals the given type.
    Event(String),

    /// A one-shot timer armed when the source state is entered.
    After(Duration),

    /// The source (compound) state entered one of its final children.
    Done,
}

impl Trigger {
    pub fn matches_event(&self, name: &str) -> bool {
        matches!(self, Self::Event(event) if event == name)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event(name) => f.write_str(name),
            Self::After(delay) => write!(f, "after {}ms", delay.as_millis()),
            Self::Done => f.write_str("done"),
        }
    }
}

/// Routing taken when a retry-counted transition fires.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryRoute<S> {
    pub operation: String,
    pub exhausted: S,
}

/// A rule `(source, trigger, guard) -> (target, actions)`.
///
/// A transition without a target is internal: its actions run but no state
/// is exited or entered.
pub struct Transition<S: State, E: Event, C: Context> {
    pub(crate) trigger: Trigger,
    pub(crate) guard: Option<Guard<C, E>>,
    pub(crate) target: Option<S>,
    pub(crate) actions: Vec<Action<C, E>>,
    pub(crate) retry: Option<RetryRoute<S>>,
    pub(crate) resets: Vec<String>,
}

impl<S: State, E: Event, C: Context> Transition<S, E, C> {
    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn target(&self) -> Option<&S> {
        self.target.as_ref()
    }

    pub fn guard(&self) -> Option<&Guard<C, E>> {
        self.guard.as_ref()
    }

    pub fn retry(&self) -> Option<&RetryRoute<S>> {
        self.retry.as_ref()
    }

    pub fn resets(&self) -> &[String] {
        &self.resets
    }

    pub fn is_internal(&self) -> bool {
        self.target.is_none()
    }
}

impl<S: State, E: Event, C: Context> fmt::Debug for Transition<S, E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("trigger", &self.trigger)
            .field("guarded", &self.guard.is_some())
            .field("target", &self.target)
            .field("actions", &self.actions.len())
            .field("retry", &self.retry)
            .field("resets", &self.resets)
            .finish()
    }
}
