//! Cost-constrained node statistic.
//!
//! Combines two UCB estimators (reward and cost), filters statistically
//! indistinguishable near-optima, and solves the one-constraint linear
//! program whose solution is a stochastic policy on at most two actions
//! that meets the cost constraint in expectation.

use super::{EdgeSummary, HeuristicEstimate, NodeStatistic, SelectionContext, UctStatistic};
use crate::config::MctsParameters;
use crate::lambda::LambdaAdapter;
use ccmcts_core::{ActionIdx, AgentIdx, Cost, Domain, Policy, Reward};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::fmt;

/// Per-node decision statistic for cost-constrained search.
///
/// The reward estimator uses the configured reward bounds and discount γ;
/// the cost estimator uses the cost bounds and discount 1.0 (risk is not
/// discounted). Both share one expanded-action set, managed here: a node
/// expands every action once before it starts exploiting, so progressive
/// widening is governed by exhaustion of the shared unexpanded set.
///
/// λ is not stored here; selection and reporting read it from the
/// parameter object for the duration of one call.
#[derive(Clone, Debug)]
pub struct CostConstrainedStatistic {
    reward_statistic: UctStatistic,
    cost_statistic: UctStatistic,
    unexpanded_actions: Vec<ActionIdx>,
    mean_step_costs: BTreeMap<ActionIdx, Cost>,

    kappa: f64,
    action_filter_factor: f64,
    cost_constraint: Cost,
}

impl CostConstrainedStatistic {
    /// Create a statistic over `num_actions` actions.
    pub fn new(num_actions: usize, params: &MctsParameters) -> Self {
        let cc = &params.cost_constrained;
        let uct = &params.uct;
        Self {
            reward_statistic: UctStatistic::with_bounds(
                num_actions,
                cc.reward_lower_bound,
                cc.reward_upper_bound,
                params.discount_factor,
                uct.exploration_constant,
                uct.progressive_widening_k,
                uct.progressive_widening_alpha,
            ),
            // risk estimation applies no discount
            cost_statistic: UctStatistic::with_bounds(
                num_actions,
                cc.cost_lower_bound,
                cc.cost_upper_bound,
                1.0,
                uct.exploration_constant,
                uct.progressive_widening_k,
                uct.progressive_widening_alpha,
            ),
            unexpanded_actions: (0..num_actions).collect(),
            mean_step_costs: (0..num_actions).map(|a| (a, 0.0)).collect(),
            kappa: cc.kappa,
            action_filter_factor: cc.action_filter_factor,
            cost_constraint: cc.cost_constraint,
        }
    }

    /// The reward estimator.
    pub fn reward_statistic(&self) -> &UctStatistic {
        &self.reward_statistic
    }

    /// The cost estimator.
    pub fn cost_statistic(&self) -> &UctStatistic {
        &self.cost_statistic
    }

    /// Running mean of the immediate (non-discounted) cost collected on
    /// each traversal of the given action's edge.
    pub fn mean_step_cost(&self, action: ActionIdx) -> Cost {
        self.mean_step_costs.get(&action).copied().unwrap_or(0.0)
    }

    /// True once every action has been expanded at least once.
    pub fn policy_is_ready(&self) -> bool {
        self.unexpanded_actions.is_empty()
    }

    /// Normalized cost estimate of the given action.
    pub fn normalized_cost_value(&self, action: ActionIdx) -> f64 {
        self.cost_statistic.normalized_value(action)
    }

    /// The greedy selection procedure: mixed UCB score, feasibility
    /// filter, then the K=1 LP over the filtered set.
    ///
    /// With `rng` given, the realized action is sampled from the LP
    /// mixture; without it the selection is deterministic (the support
    /// member carrying the larger probability, ties toward the costlier
    /// arm), which makes reporting idempotent.
    pub fn greedy_policy(
        &self,
        kappa_local: f64,
        action_filter_factor_local: f64,
        lambda: f64,
        rng: Option<&mut ChaCha8Rng>,
    ) -> (ActionIdx, Policy) {
        let ucb_values = self.calculate_ucb_values(kappa_local, lambda);
        let feasible = self.filter_feasible_actions(&ucb_values, action_filter_factor_local);
        self.solve_lp_and_sample(&feasible, rng)
    }

    /// Expected cost of a policy under the current cost estimates.
    pub fn expected_policy_cost(&self, policy: &Policy) -> Cost {
        self.cost_statistic
            .ucb_statistics()
            .iter()
            .map(|(&action, pair)| policy.probability(action) * pair.action_value)
            .sum()
    }

    /// Mixed score per expanded action:
    /// `normalized_reward − λ·normalized_cost + κ·√(ln N / n_a)`,
    /// with an effectively infinite bonus for unvisited actions.
    fn calculate_ucb_values(&self, kappa_local: f64, lambda: f64) -> BTreeMap<ActionIdx, f64> {
        debug_assert_eq!(
            self.reward_statistic.num_expanded_actions(),
            self.cost_statistic.num_expanded_actions(),
            "reward and cost statistics must share the expanded-action set"
        );
        let total_visits = self.reward_statistic.total_node_visits();
        self.reward_statistic
            .ucb_statistics()
            .iter()
            .map(|(&action, pair)| {
                let exploration = if pair.action_count == 0 || total_visits == 0 {
                    f64::MAX
                } else {
                    let term = kappa_local
                        * ((total_visits as f64).ln() / pair.action_count as f64).sqrt();
                    if term.is_nan() {
                        f64::MAX
                    } else {
                        term
                    }
                };
                let value = self.reward_statistic.normalized_value(action)
                    - lambda * self.cost_statistic.normalized_value(action)
                    + exploration;
                (action, value)
            })
            .collect()
    }

    /// Keep the actions statistically indistinguishable from the score
    /// maximizer: `|u* − u[a]| ≤ ff · (s(a) + s*)` with
    /// `s(a) = √(ln n_a / n_a)` and unvisited actions treated as
    /// infinitely uncertain. Falls back to the maximizer alone if the
    /// comparison degenerates numerically.
    fn filter_feasible_actions(
        &self,
        ucb_values: &BTreeMap<ActionIdx, f64>,
        action_filter_factor_local: f64,
    ) -> Vec<ActionIdx> {
        let (maximizing_action, max_value) = max_by_value(ucb_values);
        let uncertainty = |action: ActionIdx| -> f64 {
            let count = self.reward_statistic.action_count(action);
            if count == 0 {
                f64::MAX
            } else {
                ((count as f64).ln() / count as f64).sqrt()
            }
        };
        let maximizer_uncertainty = uncertainty(maximizing_action);

        let mut feasible = Vec::new();
        for (&action, &value) in ucb_values {
            let relation = uncertainty(action) + maximizer_uncertainty;
            if (value - max_value).abs() <= action_filter_factor_local * relation {
                feasible.push(action);
            }
        }
        if feasible.is_empty() {
            feasible.push(maximizing_action);
        }
        feasible
    }

    /// Solve the one-constraint LP on the filtered set.
    ///
    /// The solution has support on at most the costliest and the
    /// cheapest filtered arm: deterministic when they coincide or when
    /// the constraint is either unsatisfiable (mass on the cheaper arm)
    /// or slack (mass on the costlier arm), otherwise the mixture
    /// `p·cost[a_max] + (1−p)·cost[a_min] = C_max` exactly.
    fn solve_lp_and_sample(
        &self,
        feasible_actions: &[ActionIdx],
        rng: Option<&mut ChaCha8Rng>,
    ) -> (ActionIdx, Policy) {
        let mut maximizing_action = feasible_actions[0];
        let mut minimizing_action = feasible_actions[0];
        for &action in feasible_actions {
            if self.cost_statistic.action_value(action)
                > self.cost_statistic.action_value(maximizing_action)
            {
                maximizing_action = action;
            } else if self.cost_statistic.action_value(action)
                < self.cost_statistic.action_value(minimizing_action)
            {
                minimizing_action = action;
            }
        }

        let mut distribution: BTreeMap<ActionIdx, f64> = self
            .cost_statistic
            .ucb_statistics()
            .keys()
            .map(|&action| (action, 0.0))
            .collect();

        if maximizing_action == minimizing_action {
            distribution.insert(minimizing_action, 1.0);
            let policy = Policy::new(distribution).expect("BUG: degenerate LP policy invalid");
            return (minimizing_action, policy);
        }

        let max_value = self.cost_statistic.action_value(maximizing_action);
        let min_value = self.cost_statistic.action_value(minimizing_action);
        if min_value >= self.cost_constraint {
            // constraint cannot be satisfied, pick the safer arm
            distribution.insert(minimizing_action, 1.0);
            let policy = Policy::new(distribution).expect("BUG: degenerate LP policy invalid");
            (minimizing_action, policy)
        } else if max_value <= self.cost_constraint {
            // constraint slack, the score maximizer side is affordable
            distribution.insert(maximizing_action, 1.0);
            let policy = Policy::new(distribution).expect("BUG: degenerate LP policy invalid");
            (maximizing_action, policy)
        } else {
            let probability_maximizer =
                (self.cost_constraint - min_value) / (max_value - min_value);
            distribution.insert(maximizing_action, probability_maximizer);
            distribution.insert(minimizing_action, 1.0 - probability_maximizer);
            let policy = Policy::new(distribution).expect("BUG: mixed LP policy invalid");
            let selected = match rng {
                Some(rng) => {
                    if rng.gen::<f64>() <= probability_maximizer {
                        maximizing_action
                    } else {
                        minimizing_action
                    }
                }
                None => {
                    if probability_maximizer >= 0.5 {
                        maximizing_action
                    } else {
                        minimizing_action
                    }
                }
            };
            (selected, policy)
        }
    }
}

impl<S: Domain> NodeStatistic<S> for CostConstrainedStatistic {
    fn new(num_actions: usize, _agent_idx: AgentIdx, params: &MctsParameters) -> Self {
        Self::new(num_actions, params)
    }

    fn choose_next_action(&mut self, _state: &S, ctx: &mut SelectionContext<'_>) -> ActionIdx {
        if self.unexpanded_actions.is_empty() {
            let lambda = ctx.params.cost_constrained.lambda;
            self.greedy_policy(
                self.kappa,
                self.action_filter_factor,
                lambda,
                Some(&mut *ctx.rng),
            )
            .0
        } else {
            // expansion: pick uniformly among the not yet tried actions
            let array_idx = ctx.rng.gen_range(0..self.unexpanded_actions.len());
            let selected = self.unexpanded_actions.swap_remove(array_idx);
            self.reward_statistic.expand_action(selected);
            self.cost_statistic.expand_action(selected);
            selected
        }
    }

    fn collect(&mut self, action: ActionIdx, immediate_reward: Reward, immediate_cost: Cost) {
        self.reward_statistic.collect(action, immediate_reward);
        self.cost_statistic.collect(action, immediate_cost);
    }

    fn update_statistic(&mut self, child: &Self) {
        self.reward_statistic
            .update_statistics_from_backpropagated(child.reward_statistic.latest_return());
        self.cost_statistic
            .update_statistics_from_backpropagated(child.cost_statistic.latest_return());

        // the step-cost mean is keyed by the action just taken on the
        // edge being backpropagated
        let (action, step_cost) = self
            .cost_statistic
            .collected()
            .expect("BUG: cost backpropagation without a collected edge");
        let count = self.cost_statistic.action_count(action);
        let mean = self.mean_step_costs.entry(action).or_insert(0.0);
        *mean += (step_cost - *mean) / count as f64;
    }

    fn update_from_heuristic(&mut self, estimate: &HeuristicEstimate) {
        self.reward_statistic
            .update_from_heuristic_value(estimate.reward);
        self.cost_statistic.update_from_heuristic_value(estimate.cost);
    }

    fn best_action(&self, params: &MctsParameters) -> ActionIdx {
        self.greedy_policy(
            0.0,
            self.action_filter_factor,
            params.cost_constrained.lambda,
            None,
        )
        .0
    }

    fn policy(&self, params: &MctsParameters) -> Policy {
        self.greedy_policy(
            0.0,
            self.action_filter_factor,
            params.cost_constrained.lambda,
            None,
        )
        .1
    }

    fn edge_summaries(&self) -> Vec<EdgeSummary> {
        self.reward_statistic
            .ucb_statistics()
            .iter()
            .map(|(&action, pair)| EdgeSummary {
                action,
                visits: pair.action_count,
                reward_value: pair.action_value,
                cost_value: self.cost_statistic.action_value(action),
            })
            .collect()
    }

    fn update_statistic_parameters(
        params: &mut MctsParameters,
        root: &Self,
        iteration: usize,
        rng: &mut ChaCha8Rng,
    ) {
        // adapt λ only once every root action has been explored
        if !root.policy_is_ready() {
            return;
        }
        let adapter = LambdaAdapter::from_parameters(params);
        let current = params.cost_constrained.lambda;
        params.cost_constrained.lambda = adapter.adapt(current, iteration, root, rng);
    }
}

impl fmt::Display for CostConstrainedStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reward: {} || cost: {}",
            self.reward_statistic, self.cost_statistic
        )
    }
}

/// Lowest-index key with the maximal value.
fn max_by_value(values: &BTreeMap<ActionIdx, f64>) -> (ActionIdx, f64) {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (&action, &value) in values {
        if value > best_value {
            best_value = value;
            best = action;
        }
    }
    (best, best_value)
}

/// Test handle: drive a statistic to a known state without a tree.
#[cfg(test)]
fn seeded_statistic(costs: &[(ActionIdx, f64, u64)], rewards: &[(ActionIdx, f64)]) -> CostConstrainedStatistic {
    let mut params = MctsParameters::default();
    params.cost_constrained.reward_lower_bound = 0.0;
    params.cost_constrained.reward_upper_bound = 1.0;
    params.cost_constrained.cost_constraint = 0.5;
    let num_actions = costs.len();
    let mut stat = CostConstrainedStatistic::new(num_actions, &params);
    stat.unexpanded_actions.clear();
    for &(action, cost_value, visits) in costs {
        stat.cost_statistic.expand_action(action);
        stat.reward_statistic.expand_action(action);
        for _ in 0..visits {
            stat.cost_statistic.collect(action, cost_value);
            stat.cost_statistic.update_statistics_from_backpropagated(0.0);
        }
    }
    for &(action, reward_value) in rewards {
        let visits = stat.cost_statistic.action_count(action);
        for _ in 0..visits {
            stat.reward_statistic.collect(action, reward_value);
            stat.reward_statistic.update_statistics_from_backpropagated(0.0);
        }
    }
    stat
}
