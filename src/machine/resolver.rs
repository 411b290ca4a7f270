//! Transition table resolution.
//!
//! Resolution is pure: it reads the definition, the active configuration and
//! the context, and names the transition to take. Nothing is mutated here.

use crate::core::{Context, Event, State};
use crate::definition::{MachineDefinition, Transition, Trigger};
use crate::machine::error::GuardEvaluationError;
use tracing::warn;

/// Outcome of resolving one trigger.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution<S> {
    /// Declaring state and index of the selected transition.
    pub selected: Option<(S, usize)>,

    /// Guards that failed while candidates were evaluated.
    pub diagnostics: Vec<GuardEvaluationError>,
}

impl<S> Resolution<S> {
    fn none() -> Self {
        Self {
            selected: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn is_match(&self) -> bool {
        self.selected.is_some()
    }

    /// Log the guard failures collected while resolving. Queries such as
    /// `Machine::can` skip this and stay silent.
    pub(crate) fn report(&self) {
        for error in &self.diagnostics {
            warn!(
                state = error.state.as_str(),
                trigger = error.trigger.as_str(),
                index = error.index,
                "guard evaluation failed: {}",
                error.reason
            );
        }
    }
}

/// Resolve an event against the active configuration.
///
/// Starts at the innermost active state and moves to its parent only when
/// no transition at the current level is enabled. Within a level the first
/// enabled transition in declaration order wins.
pub fn resolve_event<S: State, E: Event, C: Context>(
    definition: &MachineDefinition<S, E, C>,
    configuration: &[S],
    context: &C,
    event: &E,
) -> Resolution<S> {
    let mut resolution = Resolution::none();

    for state in configuration.iter().rev() {
        let Some(node) = definition.node(state) else {
            continue;
        };
        let candidates = node
            .transitions()
            .iter()
            .enumerate()
            .filter(|(_, transition)| transition.trigger().matches_event(event.name()));

        for (index, transition) in candidates {
            if enabled(
                state,
                index,
                transition,
                context,
                Some(event),
                &mut resolution.diagnostics,
            ) {
                resolution.selected = Some((state.clone(), index));
                return resolution;
            }
        }
    }

    resolution
}

/// Re-check a transition referenced directly, as a timer does.
pub fn resolve_indexed<S: State, E: Event, C: Context>(
    definition: &MachineDefinition<S, E, C>,
    state: &S,
    index: usize,
    context: &C,
) -> Resolution<S> {
    let mut resolution = Resolution::none();
    let transition = definition
        .node(state)
        .and_then(|node| node.transitions().get(index));

    if let Some(transition) = transition {
        if enabled(
            state,
            index,
            transition,
            context,
            None,
            &mut resolution.diagnostics,
        ) {
            resolution.selected = Some((state.clone(), index));
        }
    }

    resolution
}

/// Resolve the completion transition of a compound state.
pub fn resolve_done<S: State, E: Event, C: Context>(
    definition: &MachineDefinition<S, E, C>,
    state: &S,
    context: &C,
) -> Resolution<S> {
    let mut resolution = Resolution::none();
    let Some(node) = definition.node(state) else {
        return resolution;
    };

    let candidates = node
        .transitions()
        .iter()
        .enumerate()
        .filter(|(_, transition)| transition.trigger() == &Trigger::Done);

    for (index, transition) in candidates {
        if enabled(
            state,
            index,
            transition,
            context,
            None,
            &mut resolution.diagnostics,
        ) {
            resolution.selected = Some((state.clone(), index));
            break;
        }
    }

    resolution
}

fn enabled<S: State, E: Event, C: Context>(
    state: &S,
    index: usize,
    transition: &Transition<S, E, C>,
    context: &C,
    event: Option<&E>,
    diagnostics: &mut Vec<GuardEvaluationError>,
) -> bool {
    let Some(guard) = transition.guard() else {
        return true;
    };

    match guard.check(context, event) {
        Ok(allowed) => allowed,
        Err(reason) => {
            diagnostics.push(GuardEvaluationError {
                state: state.name().to_string(),
                trigger: transition.trigger().to_string(),
                index,
                reason,
            });
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{DefinitionBuilder, StateBuilder, TransitionBuilder};
    use crate::core::{BoxError, Guard, JsonContext};
    use crate::state_enum;
    use serde_json::json;
    use std::time::Duration;

    state_enum! {
        enum Cart {
            Shopping,
            Browsing,
            Reviewing,
            Express,
            Standard,
            Empty,
        }
    }

    fn cart() -> MachineDefinition<Cart, &'static str, JsonContext> {
        DefinitionBuilder::new()
            .initial(Cart::Shopping)
            .state(
                StateBuilder::new(Cart::Shopping)
                    .initial(Cart::Browsing)
                    .child(
                        StateBuilder::new(Cart::Browsing)
                            .transition(
                                TransitionBuilder::on("CHECKOUT")
                                    .to(Cart::Empty)
                                    .when(|ctx: &JsonContext, _| ctx.get_u64("items") == Some(0)),
                            )
                            .on("REVIEW", Cart::Reviewing),
                    )
                    .child(StateBuilder::new(Cart::Reviewing))
                    .transition(
                        TransitionBuilder::on("CHECKOUT")
                            .to(Cart::Express)
                            .when(|ctx: &JsonContext, _| ctx.get_bool("express") == Some(true)),
                    )
                    .on("CHECKOUT", Cart::Standard)
                    .transition(
                        TransitionBuilder::after(Duration::from_secs(60))
                            .to(Cart::Empty)
                            .when(|ctx: &JsonContext, _| ctx.get_u64("items") == Some(0)),
                    ),
            )
            .state(StateBuilder::new(Cart::Express))
            .state(StateBuilder::new(Cart::Standard))
            .state(StateBuilder::new(Cart::Empty))
            .build()
            .unwrap()
    }

    fn browsing() -> Vec<Cart> {
        vec![Cart::Shopping, Cart::Browsing]
    }

    #[test]
    fn innermost_enabled_transition_wins() {
        let ctx = JsonContext::from_value(json!({ "items": 0, "express": true }));
        let resolution = resolve_event(&cart(), &browsing(), &ctx, &"CHECKOUT");

        assert_eq!(resolution.selected, Some((Cart::Browsing, 0)));
    }

    #[test]
    fn bubbles_to_parent_in_declaration_order() {
        let definition = cart();

        let express = JsonContext::from_value(json!({ "items": 2, "express": true }));
        let resolution = resolve_event(&definition, &browsing(), &express, &"CHECKOUT");
        assert_eq!(resolution.selected, Some((Cart::Shopping, 0)));

        let standard = JsonContext::from_value(json!({ "items": 2 }));
        let resolution = resolve_event(&definition, &browsing(), &standard, &"CHECKOUT");
        assert_eq!(resolution.selected, Some((Cart::Shopping, 1)));
    }

    #[test]
    fn unknown_event_resolves_to_nothing() {
        let resolution = resolve_event(&cart(), &browsing(), &JsonContext::new(), &"PAY");

        assert!(!resolution.is_match());
        assert!(resolution.diagnostics.is_empty());
    }

    #[test]
    fn failing_guard_is_reported_and_skipped() {
        let definition: MachineDefinition<Cart, &'static str, JsonContext> =
            DefinitionBuilder::new()
                .initial(Cart::Reviewing)
                .state(
                    StateBuilder::new(Cart::Reviewing)
                        .transition(
                            TransitionBuilder::on("CHECKOUT").to(Cart::Express).guard(
                                Guard::fallible(|_: &JsonContext, _| -> Result<bool, BoxError> {
                                    Err("pricing service unavailable".into())
                                })
                                .labeled("express-eligible"),
                            ),
                        )
                        .on("CHECKOUT", Cart::Standard),
                )
                .state(StateBuilder::new(Cart::Express))
                .state(StateBuilder::new(Cart::Standard))
                .build()
                .unwrap();

        let resolution = resolve_event(
            &definition,
            &[Cart::Reviewing],
            &JsonContext::new(),
            &"CHECKOUT",
        );

        assert_eq!(resolution.selected, Some((Cart::Reviewing, 1)));
        assert_eq!(resolution.diagnostics.len(), 1);
        assert_eq!(resolution.diagnostics[0].reason, "pricing service unavailable");
        assert_eq!(resolution.diagnostics[0].index, 0);
    }

    #[test]
    fn indexed_resolution_checks_the_guard() {
        let definition = cart();

        let empty = JsonContext::from_value(json!({ "items": 0 }));
        let resolution = resolve_indexed(&definition, &Cart::Shopping, 2, &empty);
        assert_eq!(resolution.selected, Some((Cart::Shopping, 2)));

        let full = JsonContext::from_value(json!({ "items": 3 }));
        let resolution = resolve_indexed(&definition, &Cart::Shopping, 2, &full);
        assert!(!resolution.is_match());
    }

    #[test]
    fn done_resolution_ignores_event_transitions() {
        let resolution = resolve_done(&cart(), &Cart::Shopping, &JsonContext::new());
        assert!(!resolution.is_match());
    }
}
