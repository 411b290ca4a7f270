//! Definition validation.
//!
//! Every rule produces a `Validation`; the results are combined so a single
//! pass reports all violations instead of the first one.

use super::{MachineDefinition, StateKind, Trigger};
use crate::builder::{DefinitionError, DefinitionViolation};
use crate::core::{Context, Event, State};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<DefinitionViolation>>;

fn require(ok: bool, violation: impl FnOnce() -> DefinitionViolation) -> Check {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(violation())
    }
}

pub(crate) fn validate<S: State, E: Event, C: Context>(
    definition: &MachineDefinition<S, E, C>,
) -> Result<(), DefinitionError> {
    let mut checks: Vec<Check> = Vec::new();

    match &definition.initial {
        None => checks.push(Validation::fail(DefinitionViolation::MissingInitialState)),
        Some(initial) => match definition.node(initial) {
            None => checks.push(Validation::fail(DefinitionViolation::UnknownInitialState(
                initial.name().to_string(),
            ))),
            Some(node) => checks.push(require(node.parent.is_none(), || {
                DefinitionViolation::InitialNotTopLevel(initial.name().to_string())
            })),
        },
    }

    for duplicate in &definition.duplicates {
        checks.push(Validation::fail(DefinitionViolation::DuplicateState(
            duplicate.name().to_string(),
        )));
    }

    for operation in &definition.duplicate_policies {
        checks.push(Validation::fail(DefinitionViolation::DuplicateRetryPolicy(
            operation.clone(),
        )));
    }

    for state in &definition.order {
        let Some(node) = definition.node(state) else {
            continue;
        };
        let name = state.name();

        match node.kind {
            StateKind::Final => {
                checks.push(require(node.children.is_empty(), || {
                    DefinitionViolation::FinalWithChildren(name.to_string())
                }));
                checks.push(require(node.transitions.is_empty(), || {
                    DefinitionViolation::FinalWithTransitions(name.to_string())
                }));
            }
            StateKind::Compound => match &node.initial {
                None => checks.push(Validation::fail(DefinitionViolation::MissingChildInitial(
                    name.to_string(),
                ))),
                Some(initial) => checks.push(require(node.children.contains(initial), || {
                    DefinitionViolation::InitialNotChild {
                        parent: name.to_string(),
                        initial: initial.name().to_string(),
                    }
                })),
            },
            StateKind::Atomic => {}
        }

        for transition in &node.transitions {
            let trigger = transition.trigger.to_string();

            if let Some(target) = &transition.target {
                checks.push(require(definition.contains(target), || {
                    DefinitionViolation::UnknownTarget {
                        source_state: name.to_string(),
                        trigger: trigger.clone(),
                        target: target.name().to_string(),
                    }
                }));
            }

            if transition.trigger == Trigger::Done {
                checks.push(require(!node.children.is_empty(), || {
                    DefinitionViolation::DoneWithoutChildren(name.to_string())
                }));
            }

            if let Some(route) = &transition.retry {
                checks.push(require(transition.target.is_some(), || {
                    DefinitionViolation::RetryWithoutTarget(name.to_string())
                }));
                checks.push(require(definition.contains(&route.exhausted), || {
                    DefinitionViolation::UnknownTarget {
                        source_state: name.to_string(),
                        trigger: trigger.clone(),
                        target: route.exhausted.name().to_string(),
                    }
                }));
                checks.push(require(
                    definition.retry_policies.contains_key(&route.operation),
                    || DefinitionViolation::UnknownRetryPolicy {
                        source_state: name.to_string(),
                        operation: route.operation.clone(),
                    },
                ));
            }

            for operation in &transition.resets {
                checks.push(require(
                    definition.retry_policies.contains_key(operation),
                    || DefinitionViolation::UnknownRetryPolicy {
                        source_state: name.to_string(),
                        operation: operation.clone(),
                    },
                ));
            }
        }
    }

    for (operation, policy) in &definition.retry_policies {
        checks.push(require(policy.max_attempts > 0, || {
            DefinitionViolation::InvalidRetryPolicy(operation.clone())
        }));
        for state in &policy.reset_on {
            checks.push(require(definition.contains(state), || {
                DefinitionViolation::UnknownResetState {
                    operation: operation.clone(),
                    state: state.name().to_string(),
                }
            }));
        }
    }

    match Validation::all_vec(checks) {
        Validation::Success(_) => Ok(()),
        Validation::Failure(violations) => Err(DefinitionError::new(
            violations.iter().cloned().collect(),
        )),
    }
}
