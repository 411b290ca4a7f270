//! Builder for constructing machine definitions.

use crate::builder::error::DefinitionError;
use crate::builder::state::StateBuilder;
use crate::core::{Context, Event, State};
use crate::definition::{MachineDefinition, StateKind, StateNode};
use crate::retry::RetryPolicy;

/// Builder for machine definitions with a fluent API.
///
/// `build` flattens the declared state tree and validates it; every problem
/// found is reported in the returned [`DefinitionError`].
///
/// # Example
///
/// ```
/// use statecraft::builder::{DefinitionBuilder, StateBuilder};
/// use statecraft::state_enum;
///
/// state_enum! {
///     enum Light {
///         Green,
///         Yellow,
///         Red,
///     }
/// }
///
/// let definition = DefinitionBuilder::<Light, &'static str, ()>::new()
///     .initial(Light::Green)
///     .state(StateBuilder::new(Light::Green).on("NEXT", Light::Yellow))
///     .state(StateBuilder::new(Light::Yellow).on("NEXT", Light::Red))
///     .state(StateBuilder::new(Light::Red).on("NEXT", Light::Green))
///     .build()
///     .unwrap();
///
/// assert_eq!(definition.initial(), Some(&Light::Green));
/// ```
pub struct DefinitionBuilder<S: State, E: Event, C: Context> {
    initial: Option<S>,
    states: Vec<StateBuilder<S, E, C>>,
    retry_policies: Vec<(String, RetryPolicy<S>)>,
}

impl<S: State, E: Event, C: Context> DefinitionBuilder<S, E, C> {
    pub fn new() -> Self {
        Self {
            initial: None,
            states: Vec::new(),
            retry_policies: Vec::new(),
        }
    }

    /// Set the top-level initial state (required).
    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(state);
        self
    }

    /// Add a top-level state.
    pub fn state(mut self, state: StateBuilder<S, E, C>) -> Self {
        self.states.push(state);
        self
    }

    /// Declare the retry policy of a named operation.
    pub fn retry_policy(mut self, operation: impl Into<String>, policy: RetryPolicy<S>) -> Self {
        self.retry_policies.push((operation.into(), policy));
        self
    }

    /// Build and validate the definition.
    pub fn build(self) -> Result<MachineDefinition<S, E, C>, DefinitionError> {
        let mut definition = MachineDefinition::empty();
        definition.initial = self.initial;
        for (operation, policy) in self.retry_policies {
            if definition.retry_policies.contains_key(&operation) {
                definition.duplicate_policies.push(operation);
            } else {
                definition.retry_policies.insert(operation, policy);
            }
        }

        for state in self.states {
            insert(&mut definition, state, None);
        }

        definition.validate()?;
        Ok(definition)
    }
}

impl<S: State, E: Event, C: Context> Default for DefinitionBuilder<S, E, C> {
    fn default() -> Self {
        Self::new()
    }
}

fn insert<S: State, E: Event, C: Context>(
    definition: &mut MachineDefinition<S, E, C>,
    builder: StateBuilder<S, E, C>,
    parent: Option<S>,
) {
    if definition.nodes.contains_key(&builder.id) {
        definition.duplicates.push(builder.id);
        return;
    }

    let kind = if builder.is_final || builder.id.is_final() {
        StateKind::Final
    } else if !builder.children.is_empty() || builder.initial.is_some() {
        StateKind::Compound
    } else {
        StateKind::Atomic
    };

    let id = builder.id;
    let children: Vec<S> = builder.children.iter().map(|child| child.id.clone()).collect();

    definition.order.push(id.clone());
    definition.nodes.insert(
        id.clone(),
        StateNode {
            id: id.clone(),
            parent,
            children,
            initial: builder.initial,
            kind,
            entry: builder.entry,
            exit: builder.exit,
            transitions: builder.transitions,
            invocation: builder.invocation,
        },
    );

    for child in builder.children {
        insert(definition, child, Some(id.clone()));
    }
}
