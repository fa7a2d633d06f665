//! Node statistic variants.
//!
//! Every tree node carries one statistic per agent. The ego agent's
//! statistic drives action selection and accumulates the backpropagated
//! reward/cost returns; the other agents' statistics follow their sampled
//! hypotheses and keep per-hypothesis bookkeeping.

mod cost_constrained;
mod hypothesis;
mod random_actions;
mod ucb;

pub use cost_constrained::CostConstrainedStatistic;
pub use hypothesis::HypothesisStatistic;
pub use random_actions::RandomActions;
pub use ucb::{UcbPair, UctStatistic};

use crate::config::MctsParameters;
use ccmcts_core::{ActionIdx, AgentIdx, Cost, Domain, HypothesisAssignment, Policy, Reward};
use rand_chacha::ChaCha8Rng;

/// Accumulated rollout estimate for one agent: discounted reward and
/// undiscounted ego cost from a random playout.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicEstimate {
    pub reward: Reward,
    pub cost: Cost,
}

/// Per-iteration context threaded into statistic selection.
///
/// Carries the live parameter object (including the current λ), the
/// hypothesis assignment sampled for this iteration, and the driver's
/// random stream. Statistics hold no generator and no λ of their own.
pub struct SelectionContext<'a> {
    pub params: &'a MctsParameters,
    pub assignment: &'a HypothesisAssignment,
    pub rng: &'a mut ChaCha8Rng,
}

/// Per-edge snapshot for diagnostics and reporting.
#[derive(Clone, Debug)]
pub struct EdgeSummary {
    pub action: ActionIdx,
    pub visits: u64,
    pub reward_value: f64,
    pub cost_value: f64,
}

/// Capability abstraction for node statistics.
///
/// Variants: [`UctStatistic`] (plain UCB), [`CostConstrainedStatistic`]
/// (dual UCB + LP policy), [`HypothesisStatistic`] (opponent nodes) and
/// [`RandomActions`] (test stub).
pub trait NodeStatistic<S: Domain>: Sized {
    /// Construct a fresh statistic for a node with `num_actions` actions.
    fn new(num_actions: usize, agent_idx: AgentIdx, params: &MctsParameters) -> Self;

    /// Select the action to descend with at this node, expanding first
    /// where the expansion policy requires it.
    fn choose_next_action(&mut self, state: &S, ctx: &mut SelectionContext<'_>) -> ActionIdx;

    /// Record the edge traversed below this node together with the
    /// immediate reward and cost collected on it. Must be called before
    /// [`NodeStatistic::update_statistic`] for the same traversal.
    fn collect(&mut self, action: ActionIdx, immediate_reward: Reward, immediate_cost: Cost);

    /// Consume the child's latest backpropagated return.
    fn update_statistic(&mut self, child: &Self);

    /// Seed a fresh leaf from a rollout estimate. Increments the node
    /// visit counter but no action counter.
    fn update_from_heuristic(&mut self, estimate: &HeuristicEstimate);

    /// Deterministic best action for reporting. Repeated calls without
    /// intervening updates return the same action.
    fn best_action(&self, params: &MctsParameters) -> ActionIdx;

    /// Action distribution for reporting.
    fn policy(&self, params: &MctsParameters) -> Policy;

    /// Per-edge diagnostics at this node.
    fn edge_summaries(&self) -> Vec<EdgeSummary>;

    /// Hook invoked on the root statistic after each iteration. The
    /// cost-constrained variant adapts λ here; the default is a no-op.
    fn update_statistic_parameters(
        _params: &mut MctsParameters,
        _root: &Self,
        _iteration: usize,
        _rng: &mut ChaCha8Rng,
    ) {
    }
}
