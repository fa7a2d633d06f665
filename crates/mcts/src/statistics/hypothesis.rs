//! Node statistic for other agents, keyed by sampled hypothesis.
//!
//! At selection time the agent's action is dictated by the hypothesis
//! sampled for the current iteration; backpropagation books the observed
//! returns under that hypothesis so the value of an opponent action can
//! be inspected per candidate policy.

use super::{EdgeSummary, HeuristicEstimate, NodeStatistic, SelectionContext, UcbPair};
use crate::config::MctsParameters;
use ccmcts_core::{ActionIdx, AgentIdx, Cost, Domain, Policy, Reward};
use std::collections::BTreeMap;

/// Per-hypothesis action statistics of one other agent.
#[derive(Clone, Debug)]
pub struct HypothesisStatistic {
    agent_idx: AgentIdx,
    current_hypothesis: usize,
    latest_return: f64,
    ucb_statistics: BTreeMap<usize, BTreeMap<ActionIdx, UcbPair>>,
    total_node_visits: BTreeMap<usize, u64>,
    collected: Option<(ActionIdx, f64)>,
    discount_factor: f64,
}

impl HypothesisStatistic {
    /// Action statistics accumulated under the given hypothesis.
    pub fn ucb_statistics(&self, hypothesis: usize) -> Option<&BTreeMap<ActionIdx, UcbPair>> {
        self.ucb_statistics.get(&hypothesis)
    }

    /// Node visits accumulated under the given hypothesis.
    pub fn total_node_visits(&self, hypothesis: usize) -> u64 {
        self.total_node_visits.get(&hypothesis).copied().unwrap_or(0)
    }

    /// Aggregated visit counts per action across hypotheses.
    fn aggregated_counts(&self) -> BTreeMap<ActionIdx, u64> {
        let mut counts: BTreeMap<ActionIdx, u64> = BTreeMap::new();
        for stats in self.ucb_statistics.values() {
            for (&action, pair) in stats {
                *counts.entry(action).or_insert(0) += pair.action_count;
            }
        }
        counts
    }
}

impl<S: Domain> NodeStatistic<S> for HypothesisStatistic {
    fn new(_num_actions: usize, agent_idx: AgentIdx, params: &MctsParameters) -> Self {
        Self {
            agent_idx,
            current_hypothesis: 0,
            latest_return: 0.0,
            ucb_statistics: BTreeMap::new(),
            total_node_visits: BTreeMap::new(),
            collected: None,
            discount_factor: params.discount_factor,
        }
    }

    fn choose_next_action(&mut self, state: &S, ctx: &mut SelectionContext<'_>) -> ActionIdx {
        self.current_hypothesis = ctx
            .assignment
            .get(&self.agent_idx)
            .copied()
            .unwrap_or_default();
        state.plan_action(self.agent_idx, self.current_hypothesis, ctx.rng)
    }

    fn collect(&mut self, action: ActionIdx, immediate_reward: Reward, _immediate_cost: Cost) {
        self.collected = Some((action, immediate_reward));
    }

    fn update_statistic(&mut self, child: &Self) {
        let (action, immediate) = self
            .collected
            .expect("BUG: backpropagation without a collected edge");
        self.latest_return = immediate + self.discount_factor * child.latest_return;
        let pair = self
            .ucb_statistics
            .entry(self.current_hypothesis)
            .or_default()
            .entry(action)
            .or_default();
        pair.action_count += 1;
        pair.action_value += (self.latest_return - pair.action_value) / pair.action_count as f64;
        *self
            .total_node_visits
            .entry(self.current_hypothesis)
            .or_insert(0) += 1;
    }

    fn update_from_heuristic(&mut self, estimate: &HeuristicEstimate) {
        self.latest_return = estimate.reward;
    }

    fn best_action(&self, _params: &MctsParameters) -> ActionIdx {
        let counts = self.aggregated_counts();
        let mut best = 0;
        let mut best_count = 0;
        for (&action, &count) in &counts {
            if count > best_count {
                best_count = count;
                best = action;
            }
        }
        best
    }

    fn policy(&self, params: &MctsParameters) -> Policy {
        Policy::deterministic(NodeStatistic::<S>::best_action(self, params))
    }

    fn edge_summaries(&self) -> Vec<EdgeSummary> {
        self.aggregated_counts()
            .into_iter()
            .map(|(action, visits)| EdgeSummary {
                action,
                visits,
                reward_value: 0.0,
                cost_value: 0.0,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccmcts_core::{HypothesisId, JointAction};
    use rand::RngCore;

    // Opponent always plays its hypothesis id as the action.
    #[derive(Clone)]
    struct EchoDomain;

    impl Domain for EchoDomain {
        fn num_agents(&self) -> usize {
            2
        }
        fn num_actions(&self, _agent: AgentIdx) -> usize {
            3
        }
        fn execute(
            &self,
            _joint_action: &JointAction,
            _rng: &mut dyn RngCore,
        ) -> (Self, Vec<Reward>, Cost) {
            (EchoDomain, vec![0.0, 0.0], 0.0)
        }
        fn is_terminal(&self) -> bool {
            false
        }
        fn plan_action(
            &self,
            _agent: AgentIdx,
            hypothesis: HypothesisId,
            _rng: &mut dyn RngCore,
        ) -> ActionIdx {
            hypothesis
        }
        fn hypothesis_probability(
            &self,
            _hypothesis: HypothesisId,
            _agent: AgentIdx,
            _action: ActionIdx,
        ) -> f64 {
            1.0
        }
        fn num_hypotheses(&self, _agent: AgentIdx) -> usize {
            3
        }
        fn last_action(&self, _agent: AgentIdx) -> ActionIdx {
            0
        }
    }

    #[test]
    fn test_selection_follows_sampled_hypothesis() {
        use rand::SeedableRng;
        use rand_chacha::ChaCha8Rng;

        let params = MctsParameters::default();
        let mut stat: HypothesisStatistic = NodeStatistic::<EchoDomain>::new(3, 1, &params);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let assignment: ccmcts_core::HypothesisAssignment = [(1, 2)].into_iter().collect();
        let mut ctx = SelectionContext {
            params: &params,
            assignment: &assignment,
            rng: &mut rng,
        };
        let action = NodeStatistic::<EchoDomain>::choose_next_action(&mut stat, &EchoDomain, &mut ctx);
        assert_eq!(action, 2);
        assert_eq!(stat.current_hypothesis, 2);
    }

    #[test]
    fn test_updates_are_keyed_by_hypothesis() {
        let params = MctsParameters::default();
        let mut parent: HypothesisStatistic = NodeStatistic::<EchoDomain>::new(3, 1, &params);
        let mut child: HypothesisStatistic = NodeStatistic::<EchoDomain>::new(3, 1, &params);
        NodeStatistic::<EchoDomain>::update_from_heuristic(
            &mut child,
            &HeuristicEstimate {
                reward: 1.0,
                cost: 0.0,
            },
        );

        parent.current_hypothesis = 1;
        NodeStatistic::<EchoDomain>::collect(&mut parent, 2, 0.5, 0.0);
        NodeStatistic::<EchoDomain>::update_statistic(&mut parent, &child);

        assert!(parent.ucb_statistics(0).is_none());
        let pair = parent.ucb_statistics(1).unwrap().get(&2).unwrap();
        assert_eq!(pair.action_count, 1);
        // 0.5 + 0.9 · 1.0
        assert!((pair.action_value - 1.4).abs() < 1e-9);
        assert_eq!(parent.total_node_visits(1), 1);
    }
}
