//! Machine definitions.
//!
//! A definition is the static description of a machine: the state tree, the
//! transitions of every state, and the retry policies of named operations.
//! Definitions are built with [`crate::builder::DefinitionBuilder`], checked
//! once by [`MachineDefinition::validate`], and shared read-only by every
//! machine created from them.

mod node;
mod transition;
mod validation;

pub use node::{Invocation, ServiceFuture, StateKind, StateNode};
pub use transition::{Action, RetryRoute, Transition, Trigger};

use crate::builder::DefinitionError;
use crate::core::{Context, Event, State};
use crate::retry::RetryPolicy;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub struct MachineDefinition<S: State, E: Event, C: Context> {
    pub(crate) initial: Option<S>,
    pub(crate) nodes: HashMap<S, StateNode<S, E, C>>,
    pub(crate) order: Vec<S>,
    pub(crate) retry_policies: BTreeMap<String, RetryPolicy<S>>,
    pub(crate) duplicates: Vec<S>,
    pub(crate) duplicate_policies: Vec<String>,
}

impl<S: State, E: Event, C: Context> MachineDefinition<S, E, C> {
    pub(crate) fn empty() -> Self {
        Self {
            initial: None,
            nodes: HashMap::new(),
            order: Vec::new(),
            retry_policies: BTreeMap::new(),
            duplicates: Vec::new(),
            duplicate_policies: Vec::new(),
        }
    }

    /// Check the definition, reporting every violation found.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        validation::validate(self)
    }

    pub fn initial(&self) -> Option<&S> {
        self.initial.as_ref()
    }

    pub fn node(&self, state: &S) -> Option<&StateNode<S, E, C>> {
        self.nodes.get(state)
    }

    pub fn contains(&self, state: &S) -> bool {
        self.nodes.contains_key(state)
    }

    /// Declared states in declaration order (depth first).
    pub fn states(&self) -> impl Iterator<Item = &S> {
        self.order.iter()
    }

    pub fn retry_policy(&self, operation: &str) -> Option<&RetryPolicy<S>> {
        self.retry_policies.get(operation)
    }

    pub fn is_final(&self, state: &S) -> bool {
        self.node(state).is_some_and(StateNode::is_final)
    }

    /// Path from the top-level ancestor down to `state`, inclusive.
    pub fn path_to(&self, state: &S) -> Vec<S> {
        let mut path = vec![state.clone()];
        let mut cursor = self.node(state).and_then(|node| node.parent.clone());
        while let Some(parent) = cursor {
            cursor = self.node(&parent).and_then(|node| node.parent.clone());
            path.push(parent);
            if path.len() > self.nodes.len() {
                break;
            }
        }
        path.reverse();
        path
    }

    /// Initial descendants entered below `state`, outermost first, excluding `state`.
    pub fn initial_descendants(&self, state: &S) -> Vec<S> {
        let mut descendants = Vec::new();
        let mut cursor = self.node(state).and_then(|node| node.initial.clone());
        while let Some(child) = cursor {
            cursor = self.node(&child).and_then(|node| node.initial.clone());
            descendants.push(child);
            if descendants.len() > self.nodes.len() {
                break;
            }
        }
        descendants
    }

    /// True if `state` is `ancestor` or lies below it.
    pub fn is_within(&self, state: &S, ancestor: &S) -> bool {
        self.path_to(state).contains(ancestor)
    }
}

impl<S: State, E: Event, C: Context> fmt::Debug for MachineDefinition<S, E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineDefinition")
            .field("initial", &self.initial)
            .field("states", &self.order)
            .field("retry_policies", &self.retry_policies)
            .finish_non_exhaustive()
    }
}
