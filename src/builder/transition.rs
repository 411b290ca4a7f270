//! Builder for constructing transitions.

use crate::core::{Context, Event, Guard, State};
use crate::definition::{Action, RetryRoute, Transition, Trigger};
use std::time::Duration;

/// Builder for constructing transitions with a fluent API.
///
/// The trigger is fixed when the builder is created; everything else is
/// optional. A builder without `.to()` produces an internal transition.
///
/// # Example
///
/// ```
/// use statecraft::builder::{DefinitionBuilder, StateBuilder, TransitionBuilder};
/// use statecraft::core::JsonContext;
/// use statecraft::state_enum;
/// use serde_json::json;
///
/// state_enum! {
///     enum Cart {
///         Open,
///         CheckedOut,
///     }
///     final: [CheckedOut]
/// }
///
/// let definition = DefinitionBuilder::<Cart, &'static str, JsonContext>::new()
///     .initial(Cart::Open)
///     .state(
///         StateBuilder::new(Cart::Open).transition(
///             TransitionBuilder::on("CHECKOUT")
///                 .to(Cart::CheckedOut)
///                 .when(|ctx: &JsonContext, _| ctx.get_u64("items").unwrap_or(0) > 0)
///                 .action(|_, _| json!({ "paid": false })),
///         ),
///     )
///     .state(StateBuilder::new(Cart::CheckedOut))
///     .build();
///
/// assert!(definition.is_ok());
/// ```
pub struct TransitionBuilder<S: State, E: Event, C: Context> {
    trigger: Trigger,
    target: Option<S>,
    guard: Option<Guard<C, E>>,
    actions: Vec<Action<C, E>>,
    retry: Option<RetryRoute<S>>,
    resets: Vec<String>,
}

impl<S: State, E: Event, C: Context> TransitionBuilder<S, E, C> {
    fn with_trigger(trigger: Trigger) -> Self {
        Self {
            trigger,
            target: None,
            guard: None,
            actions: Vec::new(),
            retry: None,
            resets: Vec::new(),
        }
    }

    /// Transition taken when an event with this type name arrives.
    pub fn on(event: impl Into<String>) -> Self {
        Self::with_trigger(Trigger::Event(event.into()))
    }

    /// Transition taken when the source state has been active for `delay`.
    pub fn after(delay: Duration) -> Self {
        Self::with_trigger(Trigger::After(delay))
    }

    /// Transition taken when the source compound state reaches a final child.
    pub fn done() -> Self {
        Self::with_trigger(Trigger::Done)
    }

    /// Set the target state.
    pub fn to(mut self, state: S) -> Self {
        self.target = Some(state);
        self
    }

    /// Add a guard predicate.
    pub fn guard(mut self, guard: Guard<C, E>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a guard using a closure.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&C, Option<&E>) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    /// Append an action. Actions run in the order they were added.
    pub fn action<F>(mut self, action: F) -> Self
    where
        F: Fn(&C, Option<&E>) -> C::Patch + Send + Sync + 'static,
    {
        self.actions.push(Box::new(action));
        self
    }

    /// Count this transition as a failure of `operation`.
    ///
    /// While attempts remain the transition goes to its target; once the
    /// operation's policy is exhausted it goes to `exhausted` instead.
    pub fn retry(mut self, operation: impl Into<String>, exhausted: S) -> Self {
        self.retry = Some(RetryRoute {
            operation: operation.into(),
            exhausted,
        });
        self
    }

    /// Zero the attempt counter of `operation` when this transition is taken.
    pub fn reset_retries(mut self, operation: impl Into<String>) -> Self {
        self.resets.push(operation.into());
        self
    }

    pub(crate) fn build(self) -> Transition<S, E, C> {
        Transition {
            trigger: self.trigger,
            guard: self.guard,
            target: self.target,
            actions: self.actions,
            retry: self.retry,
            resets: self.resets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::JsonContext;
    use crate::state_enum;
    use serde_json::json;

    state_enum! {
        enum Job {
            Queued,
            Running,
            Failed,
        }
        final: [Failed]
    }

    type Builder = TransitionBuilder<Job, &'static str, JsonContext>;

    #[test]
    fn builds_event_transition_with_target() {
        let transition = Builder::on("START").to(Job::Running).build();

        assert_eq!(transition.trigger(), &Trigger::Event("START".to_string()));
        assert_eq!(transition.target(), Some(&Job::Running));
        assert!(transition.guard().is_none());
        assert!(!transition.is_internal());
    }

    #[test]
    fn missing_target_makes_internal_transition() {
        let transition = Builder::on("TICK")
            .action(|_, _| json!({ "ticked": true }))
            .build();

        assert!(transition.is_internal());
        assert_eq!(transition.actions.len(), 1);
    }

    #[test]
    fn guard_closure_sees_context_and_event() {
        let transition = Builder::on("START")
            .to(Job::Running)
            .when(|ctx, event| ctx.get_bool("ready") == Some(true) && event == Some(&"START"))
            .build();

        let guard = transition.guard().unwrap();
        let ready = JsonContext::from_value(json!({ "ready": true }));
        assert_eq!(guard.check(&ready, Some(&"START")), Ok(true));
        assert_eq!(guard.check(&JsonContext::new(), Some(&"START")), Ok(false));
    }

    #[test]
    fn retry_and_resets_are_recorded() {
        let transition = Builder::on("FAILED")
            .to(Job::Queued)
            .retry("run", Job::Failed)
            .reset_retries("fetch")
            .build();

        assert_eq!(
            transition.retry(),
            Some(&RetryRoute {
                operation: "run".to_string(),
                exhausted: Job::Failed,
            })
        );
        assert_eq!(transition.resets(), ["fetch".to_string()]);
    }

    #[test]
    fn timer_and_done_constructors_set_trigger() {
        let timed = Builder::after(Duration::from_millis(250)).to(Job::Failed).build();
        assert_eq!(timed.trigger(), &Trigger::After(Duration::from_millis(250)));

        let done = Builder::done().to(Job::Queued).build();
        assert_eq!(done.trigger(), &Trigger::Done);
    }
}
