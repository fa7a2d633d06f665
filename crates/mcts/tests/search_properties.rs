//! Property-based laws of the planner.

mod common;

use ccmcts::{
    CostConstrainedStatistic, HypothesisBeliefTracker, LambdaAdapter, Mcts, MctsParameters,
    RandomActions, RandomHeuristic, SearchResult, UctStatistic,
};
use common::{Arm, RiskChoiceState};
use proptest::prelude::*;
use std::time::Duration;

type Planner = Mcts<RiskChoiceState, CostConstrainedStatistic, RandomActions, RandomHeuristic>;

fn arms() -> Vec<Arm> {
    vec![Arm::new(0.0, 0.0), Arm::new(2.0, 0.8), Arm::new(0.5, 0.3)]
}

fn parameters(seed: u64, iterations: usize, cost_constraint: f64) -> MctsParameters {
    let mut params = MctsParameters::with_iterations(iterations);
    params.max_search_time = Duration::from_secs(3600);
    params.random_seed = seed;
    params.cost_constrained.lambda = 0.5;
    params.cost_constrained.kappa = 10.0;
    params.cost_constrained.cost_constraint = cost_constraint;
    params.cost_constrained.cost_lower_bound = 0.0;
    params.cost_constrained.cost_upper_bound = 1.0;
    params.cost_constrained.reward_lower_bound = 0.0;
    params.cost_constrained.reward_upper_bound = 2.0;
    params.cost_constrained.gradient_update_step = 0.1;
    params
}

fn run_search(params: MctsParameters) -> (Planner, SearchResult) {
    let state = RiskChoiceState::new(arms(), 1);
    let mut belief_tracker = HypothesisBeliefTracker::new(&params.belief_tracker);
    let mut planner = Planner::new(params, RandomHeuristic::default()).unwrap();
    let result = planner.search(state, &mut belief_tracker).unwrap();
    (planner, result)
}

proptest! {
    /// The returned action index is always within the action set.
    #[test]
    fn prop_best_action_bounded(
        seed in any::<u64>(),
        iterations in 1usize..300,
        cost_constraint in 0.0f64..1.0,
    ) {
        let (_, result) = run_search(parameters(seed, iterations, cost_constraint));
        prop_assert!(result.best_action < 3);
    }

    /// The root policy sums to one and has support on at most two arms.
    #[test]
    fn prop_policy_support_and_sum(
        seed in any::<u64>(),
        iterations in 1usize..300,
        cost_constraint in 0.0f64..1.0,
    ) {
        let (_, result) = run_search(parameters(seed, iterations, cost_constraint));
        prop_assert!((result.policy.sum() - 1.0).abs() < 1e-6);
        prop_assert!(result.policy.support_size() <= 2);
    }

    /// λ stays within its projection interval.
    #[test]
    fn prop_lambda_within_clip_range(
        seed in any::<u64>(),
        iterations in 1usize..300,
        cost_constraint in 0.0f64..1.0,
    ) {
        let params = parameters(seed, iterations, cost_constraint);
        let upper = LambdaAdapter::from_parameters(&params).upper_clip();
        let (_, result) = run_search(params);
        prop_assert!(result.lambda >= 0.0);
        prop_assert!(result.lambda <= upper + 1e-9);
    }

    /// Same seed and budgets produce identical results.
    #[test]
    fn prop_deterministic_under_fixed_seed(
        seed in any::<u64>(),
        iterations in 1usize..200,
    ) {
        let first = run_search(parameters(seed, iterations, 0.4)).1;
        let second = run_search(parameters(seed, iterations, 0.4)).1;
        prop_assert_eq!(first.best_action, second.best_action);
        prop_assert_eq!(first.policy, second.policy);
        prop_assert!((first.lambda - second.lambda).abs() < 1e-12);
    }

    /// Every backpropagation is booked: the per-action visit counts at
    /// the root sum to the root's total visits, one per iteration.
    #[test]
    fn prop_root_visit_counts_consistent(
        seed in any::<u64>(),
        iterations in 1usize..300,
    ) {
        let (planner, result) = run_search(parameters(seed, iterations, 0.4));
        let root = planner.root_statistic().unwrap();
        let reward = root.reward_statistic();
        let count_sum: u64 = reward
            .ucb_statistics()
            .values()
            .map(|pair| pair.action_count)
            .sum();
        prop_assert_eq!(count_sum, reward.total_node_visits());
        prop_assert_eq!(count_sum, result.iterations as u64);

        // reward and cost share one expanded-action set
        let cost = root.cost_statistic();
        prop_assert_eq!(reward.ucb_statistics().len(), cost.ucb_statistics().len());
    }
}

/// The plain UCB statistic drives the same search loop; without a cost
/// constraint it is simply reward-greedy.
#[test]
fn plain_uct_ego_statistic_is_reward_greedy() {
    let mut params = MctsParameters::with_iterations(2000);
    params.max_search_time = Duration::from_secs(3600);
    params.uct.lower_bound = 0.0;
    params.uct.upper_bound = 2.0;

    let arms = vec![Arm::new(0.0, 0.0), Arm::new(2.0, 0.5), Arm::new(0.5, 0.3)];
    let state = RiskChoiceState::new(arms, 1);
    let mut belief_tracker = HypothesisBeliefTracker::new(&params.belief_tracker);
    let mut planner: Mcts<RiskChoiceState, UctStatistic, RandomActions, RandomHeuristic> =
        Mcts::new(params, RandomHeuristic::default()).unwrap();
    let result = planner.search(state, &mut belief_tracker).unwrap();

    // highest expected reward regardless of risk
    assert_eq!(result.best_action, 1);
}

/// A looser budget never pays less reward in expectation.
#[test]
fn loosening_the_constraint_weakly_increases_expected_reward() {
    let expected_reward = |cost_constraint: f64| {
        let (planner, result) = run_search(parameters(1000, 3000, cost_constraint));
        let root = planner.root_statistic().unwrap();
        result
            .policy
            .iter()
            .map(|(action, p)| p * root.reward_statistic().action_value(action))
            .sum::<f64>()
    };

    let tight = expected_reward(0.05);
    let loose = expected_reward(0.9);
    assert!(loose + 0.05 >= tight);
}
