//! Plain UCB node statistic with progressive widening.

use super::{EdgeSummary, HeuristicEstimate, NodeStatistic, SelectionContext};
use crate::config::MctsParameters;
use ccmcts_core::{ActionIdx, AgentIdx, Cost, Domain, Policy, Reward};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::fmt;

/// Visit counter and running mean return for one action.
///
/// Invariant: if `action_count == 0` then `action_value == 0`; otherwise
/// `action_value` is the running mean of the returns seen for the action.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UcbPair {
    pub action_count: u64,
    pub action_value: f64,
}

/// Running mean and visit counters for one scalar return per action.
///
/// Tracks one node's value estimate, the per-action UCB pairs, and the
/// set of not yet expanded actions. Returns are expected to stay within
/// the configured `[lower_bound, upper_bound]`; normalized values lie in
/// `[0, 1]`.
#[derive(Clone, Debug)]
pub struct UctStatistic {
    value: f64,
    latest_return: f64,
    ucb_statistics: BTreeMap<ActionIdx, UcbPair>,
    total_node_visits: u64,
    unexpanded_actions: Vec<ActionIdx>,
    num_actions: usize,
    collected: Option<(ActionIdx, f64)>,

    lower_bound: f64,
    upper_bound: f64,
    discount_factor: f64,
    exploration_constant: f64,
    progressive_widening_k: f64,
    progressive_widening_alpha: f64,
}

impl UctStatistic {
    /// Create a statistic over `num_actions` actions with explicit bounds
    /// and discount. The cost-constrained statistic uses this to override
    /// bounds per sub-statistic and to disable discounting for cost.
    #[allow(clippy::too_many_arguments)]
    pub fn with_bounds(
        num_actions: usize,
        lower_bound: f64,
        upper_bound: f64,
        discount_factor: f64,
        exploration_constant: f64,
        progressive_widening_k: f64,
        progressive_widening_alpha: f64,
    ) -> Self {
        Self {
            value: 0.0,
            latest_return: 0.0,
            ucb_statistics: BTreeMap::new(),
            total_node_visits: 0,
            unexpanded_actions: (0..num_actions).collect(),
            num_actions,
            collected: None,
            lower_bound,
            upper_bound,
            discount_factor,
            exploration_constant,
            progressive_widening_k,
            progressive_widening_alpha,
        }
    }

    /// Node value estimate (running mean over all backpropagated returns).
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The return produced by the most recent backpropagation through
    /// this node. Parents consume this during their own update.
    pub fn latest_return(&self) -> f64 {
        self.latest_return
    }

    /// Total number of visits of this node.
    pub fn total_node_visits(&self) -> u64 {
        self.total_node_visits
    }

    /// The per-action UCB pairs of the expanded actions.
    pub fn ucb_statistics(&self) -> &BTreeMap<ActionIdx, UcbPair> {
        &self.ucb_statistics
    }

    /// Visit count of the given action (zero if unexpanded).
    pub fn action_count(&self, action: ActionIdx) -> u64 {
        self.ucb_statistics
            .get(&action)
            .map_or(0, |pair| pair.action_count)
    }

    /// Running mean return of the given action (zero if unexpanded).
    pub fn action_value(&self, action: ActionIdx) -> f64 {
        self.ucb_statistics
            .get(&action)
            .map_or(0.0, |pair| pair.action_value)
    }

    /// The edge and immediate return recorded for the ongoing traversal.
    pub fn collected(&self) -> Option<(ActionIdx, f64)> {
        self.collected
    }

    /// Record the edge taken below this node and its immediate return.
    pub fn collect(&mut self, action: ActionIdx, immediate: f64) {
        self.collected = Some((action, immediate));
    }

    /// Number of expanded actions.
    pub fn num_expanded_actions(&self) -> usize {
        self.ucb_statistics.len()
    }

    /// Move a specific action from the unexpanded set into the UCB table
    /// with a fresh pair. Used by owners that manage expansion themselves.
    pub fn expand_action(&mut self, action: ActionIdx) {
        self.unexpanded_actions.retain(|&a| a != action);
        self.ucb_statistics.entry(action).or_default();
    }

    /// Select the next action: expand while progressive widening allows,
    /// otherwise take the UCB maximizer over the expanded actions.
    pub fn choose_next_action(&mut self, rng: &mut ChaCha8Rng) -> ActionIdx {
        if self.require_progressive_widening() {
            let array_idx = rng.gen_range(0..self.unexpanded_actions.len());
            let selected = self.unexpanded_actions.swap_remove(array_idx);
            self.ucb_statistics.insert(selected, UcbPair::default());
            selected
        } else {
            self.ucb_max_action()
        }
    }

    /// Seed this node from a rollout value: the value becomes both the
    /// node estimate and the latest return; no action counter moves.
    pub fn update_from_heuristic_value(&mut self, backpropagated: f64) {
        self.value = backpropagated;
        self.latest_return = backpropagated;
        self.total_node_visits += 1;
    }

    /// Consume a child's backpropagated return for the collected edge.
    ///
    /// `latest_return = immediate + γ · child_return`; the edge's running
    /// mean and the node value are updated incrementally.
    pub fn update_statistics_from_backpropagated(&mut self, child_return: f64) {
        let (action, immediate) = self
            .collected
            .expect("BUG: backpropagation without a collected edge");
        self.latest_return = immediate + self.discount_factor * child_return;
        let pair = self.ucb_statistics.entry(action).or_default();
        pair.action_count += 1;
        pair.action_value += (self.latest_return - pair.action_value) / pair.action_count as f64;
        self.total_node_visits += 1;
        self.value += (self.latest_return - self.value) / self.total_node_visits as f64;
    }

    /// Overwrite the node estimate without touching any counter.
    pub fn set_heuristic_estimate(&mut self, backpropagated: f64) {
        self.value = backpropagated;
    }

    /// Normalized running mean of the given action.
    ///
    /// Precondition: the configured bounds are ordered and the returns
    /// stayed within them; a violation is a bug, asserted in debug builds
    /// and clamped (with a warning) in release builds.
    pub fn normalized_value(&self, action: ActionIdx) -> f64 {
        let normalized =
            (self.action_value(action) - self.lower_bound) / (self.upper_bound - self.lower_bound);
        debug_assert!(
            (-1e-9..=1.0 + 1e-9).contains(&normalized),
            "normalized action value {} for action {} outside [0, 1]",
            normalized,
            action
        );
        if !(0.0..=1.0).contains(&normalized) {
            tracing::warn!(
                action,
                normalized,
                "normalized action value outside [0, 1], clamping"
            );
        }
        normalized.clamp(0.0, 1.0)
    }

    /// Lowest-index action with the maximal running mean return.
    pub fn best_action(&self) -> ActionIdx {
        let mut best = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (&action, pair) in &self.ucb_statistics {
            if pair.action_value > best_value {
                best_value = pair.action_value;
                best = action;
            }
        }
        best
    }

    /// Whether the expansion policy asks for another child.
    ///
    /// Expand while `expanded ≤ k · N^α` and not every action has been
    /// expanded yet.
    fn require_progressive_widening(&self) -> bool {
        let widening_term = self.progressive_widening_k
            * (self.total_node_visits as f64).powf(self.progressive_widening_alpha);
        self.num_expanded_actions() as f64 <= widening_term
            && self.num_expanded_actions() < self.num_actions
    }

    /// Lowest-index maximizer of `normalized(q) + 2c·√(2·ln N / n_a)`.
    /// An unvisited expanded action scores infinite and wins outright.
    fn ucb_max_action(&self) -> ActionIdx {
        let mut best = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (&action, pair) in &self.ucb_statistics {
            let exploration = if pair.action_count == 0 {
                f64::INFINITY
            } else {
                2.0 * self.exploration_constant
                    * (2.0 * (self.total_node_visits as f64).ln() / pair.action_count as f64)
                        .sqrt()
            };
            let value = self.normalized_value(action) + exploration;
            if value > best_value {
                best_value = value;
                best = action;
            }
        }
        best
    }
}

impl<S: Domain> NodeStatistic<S> for UctStatistic {
    fn new(num_actions: usize, _agent_idx: AgentIdx, params: &MctsParameters) -> Self {
        Self::with_bounds(
            num_actions,
            params.uct.lower_bound,
            params.uct.upper_bound,
            params.discount_factor,
            params.uct.exploration_constant,
            params.uct.progressive_widening_k,
            params.uct.progressive_widening_alpha,
        )
    }

    fn choose_next_action(&mut self, _state: &S, ctx: &mut SelectionContext<'_>) -> ActionIdx {
        self.choose_next_action(ctx.rng)
    }

    fn collect(&mut self, action: ActionIdx, immediate_reward: Reward, _immediate_cost: Cost) {
        self.collect(action, immediate_reward);
    }

    fn update_statistic(&mut self, child: &Self) {
        self.update_statistics_from_backpropagated(child.latest_return);
    }

    fn update_from_heuristic(&mut self, estimate: &HeuristicEstimate) {
        self.update_from_heuristic_value(estimate.reward);
    }

    fn best_action(&self, _params: &MctsParameters) -> ActionIdx {
        self.best_action()
    }

    fn policy(&self, _params: &MctsParameters) -> Policy {
        Policy::deterministic(self.best_action())
    }

    fn edge_summaries(&self) -> Vec<EdgeSummary> {
        self.ucb_statistics
            .iter()
            .map(|(&action, pair)| EdgeSummary {
                action,
                visits: pair.action_count,
                reward_value: pair.action_value,
                cost_value: 0.0,
            })
            .collect()
    }
}

impl fmt::Display for UctStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V={:.2}, N={}", self.value, self.total_node_visits)?;
        for (action, pair) in &self.ucb_statistics {
            write!(
                f,
                " | a={}, q={:.3}, n={}",
                action, pair.action_value, pair.action_count
            )?;
        }
        Ok(())
    }
}
