//! Uniform-random node statistic, used as a baseline and test stub.

use super::{EdgeSummary, HeuristicEstimate, NodeStatistic, SelectionContext};
use crate::config::MctsParameters;
use ccmcts_core::{ActionIdx, AgentIdx, Cost, Domain, Policy, Reward};
use rand::Rng;

/// Picks uniformly among the available actions and only tracks the
/// latest return so backpropagation chains stay intact.
#[derive(Clone, Debug)]
pub struct RandomActions {
    num_actions: usize,
    latest_return: f64,
    collected: Option<(ActionIdx, f64)>,
    discount_factor: f64,
}

impl<S: Domain> NodeStatistic<S> for RandomActions {
    fn new(num_actions: usize, _agent_idx: AgentIdx, params: &MctsParameters) -> Self {
        Self {
            num_actions,
            latest_return: 0.0,
            collected: None,
            discount_factor: params.discount_factor,
        }
    }

    fn choose_next_action(&mut self, _state: &S, ctx: &mut SelectionContext<'_>) -> ActionIdx {
        ctx.rng.gen_range(0..self.num_actions)
    }

    fn collect(&mut self, action: ActionIdx, immediate_reward: Reward, _immediate_cost: Cost) {
        self.collected = Some((action, immediate_reward));
    }

    fn update_statistic(&mut self, child: &Self) {
        let (_, immediate) = self
            .collected
            .expect("BUG: backpropagation without a collected edge");
        self.latest_return = immediate + self.discount_factor * child.latest_return;
    }

    fn update_from_heuristic(&mut self, estimate: &HeuristicEstimate) {
        self.latest_return = estimate.reward;
    }

    fn best_action(&self, _params: &MctsParameters) -> ActionIdx {
        0
    }

    fn policy(&self, _params: &MctsParameters) -> Policy {
        Policy::uniform(self.num_actions).expect("BUG: node without actions")
    }

    fn edge_summaries(&self) -> Vec<EdgeSummary> {
        Vec::new()
    }
}
