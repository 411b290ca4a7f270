//! Ordered execution of actions and the exit/entry sets of a transition.

use crate::core::{Context, Event, State};
use crate::definition::{Action, MachineDefinition};

/// Run `actions` in order, merging each patch before the next action runs.
pub fn run_actions<C: Context, E: Event>(
    context: &mut C,
    actions: &[Action<C, E>],
    event: Option<&E>,
) {
    for action in actions {
        let patch = action(context, event);
        context.merge(patch);
    }
}

/// States left and entered by one external transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionPlan<S> {
    /// Active states to exit, innermost first.
    pub exit: Vec<S>,
    /// States to enter, outermost first, ending at a leaf.
    pub enter: Vec<S>,
    /// Length of the configuration prefix that stays active.
    pub keep: usize,
}

impl<S: State> ExecutionPlan<S> {
    /// Plan a transition declared on `source` targeting `target`.
    ///
    /// The deepest state containing both ends stays active; every active
    /// state below it is exited even when it also contains the target, so a
    /// self transition exits and re-enters its source.
    pub fn external<E: Event, C: Context>(
        definition: &MachineDefinition<S, E, C>,
        configuration: &[S],
        source: &S,
        target: &S,
    ) -> Self {
        let source_path = definition.path_to(source);
        let target_path = definition.path_to(target);

        let common = source_path
            .iter()
            .zip(&target_path)
            .take_while(|(a, b)| a == b)
            .count();
        let keep = common
            .min(source_path.len().saturating_sub(1))
            .min(target_path.len().saturating_sub(1))
            .min(configuration.len());

        let exit = configuration[keep..].iter().rev().cloned().collect();
        let mut enter: Vec<S> = target_path[keep..].to_vec();
        enter.extend(definition.initial_descendants(target));

        Self { exit, enter, keep }
    }

    /// Plan the initial entry of a machine.
    pub fn initial<E: Event, C: Context>(definition: &MachineDefinition<S, E, C>, root: &S) -> Self {
        let mut enter = definition.path_to(root);
        enter.extend(definition.initial_descendants(root));
        Self {
            exit: Vec::new(),
            enter,
            keep: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{DefinitionBuilder, StateBuilder};
    use crate::core::JsonContext;
    use crate::state_enum;
    use serde_json::json;

    state_enum! {
        enum Player {
            Stopped,
            Active,
            Playing,
            Paused,
        }
    }

    fn player() -> MachineDefinition<Player, &'static str, ()> {
        DefinitionBuilder::new()
            .initial(Player::Stopped)
            .state(StateBuilder::new(Player::Stopped).on("PLAY", Player::Active))
            .state(
                StateBuilder::new(Player::Active)
                    .initial(Player::Playing)
                    .child(StateBuilder::new(Player::Playing).on("PAUSE", Player::Paused))
                    .child(StateBuilder::new(Player::Paused))
                    .on("STOP", Player::Stopped)
                    .on("RESTART", Player::Playing),
            )
            .build()
            .unwrap()
    }

    fn action<F>(f: F) -> Action<JsonContext, &'static str>
    where
        F: Fn(&JsonContext, Option<&&'static str>) -> serde_json::Value + Send + Sync + 'static,
    {
        Box::new(f)
    }

    #[test]
    fn actions_see_previous_patches() {
        let actions = vec![
            action(|_, _| json!({ "count": 1 })),
            action(|ctx, _| json!({ "count": ctx.get_u64("count").unwrap_or(0) + 1 })),
            action(|_, event| json!({ "last": event.copied() })),
        ];

        let mut ctx = JsonContext::new();
        run_actions(&mut ctx, &actions, Some(&"TICK"));

        assert_eq!(ctx.get_u64("count"), Some(2));
        assert_eq!(ctx.get_str("last"), Some("TICK"));
    }

    #[test]
    fn sibling_transition_keeps_parent() {
        let definition = player();
        let configuration = [Player::Active, Player::Playing];
        let plan =
            ExecutionPlan::external(&definition, &configuration, &Player::Playing, &Player::Paused);

        assert_eq!(plan.exit, vec![Player::Playing]);
        assert_eq!(plan.enter, vec![Player::Paused]);
        assert_eq!(plan.keep, 1);
    }

    #[test]
    fn parent_transition_exits_inner_states_first() {
        let definition = player();
        let configuration = [Player::Active, Player::Paused];
        let plan =
            ExecutionPlan::external(&definition, &configuration, &Player::Active, &Player::Stopped);

        assert_eq!(plan.exit, vec![Player::Paused, Player::Active]);
        assert_eq!(plan.enter, vec![Player::Stopped]);
    }

    #[test]
    fn entering_compound_descends_to_initial_leaf() {
        let definition = player();
        let plan =
            ExecutionPlan::external(&definition, &[Player::Stopped], &Player::Stopped, &Player::Active);

        assert_eq!(plan.exit, vec![Player::Stopped]);
        assert_eq!(plan.enter, vec![Player::Active, Player::Playing]);
    }

    #[test]
    fn transition_into_own_child_reenters_source() {
        let definition = player();
        let configuration = [Player::Active, Player::Paused];
        let plan =
            ExecutionPlan::external(&definition, &configuration, &Player::Active, &Player::Playing);

        assert_eq!(plan.exit, vec![Player::Paused, Player::Active]);
        assert_eq!(plan.enter, vec![Player::Active, Player::Playing]);
    }

    #[test]
    fn initial_plan_enters_outer_to_inner() {
        let definition = player();
        let plan = ExecutionPlan::initial(&definition, &Player::Active);
        assert_eq!(plan.enter, vec![Player::Active, Player::Playing]);
        assert!(plan.exit.is_empty());
    }
}
