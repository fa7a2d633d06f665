//! Leaf evaluation by random playout.

use crate::config::MctsParameters;
use crate::statistics::HeuristicEstimate;
use ccmcts_core::{Domain, HypothesisAssignment, JointAction, EGO_AGENT};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Trait for seeding a fresh leaf with value estimates, one per agent.
pub trait Heuristic<S: Domain> {
    /// Estimate accumulated reward (discounted) and ego cost
    /// (undiscounted) for every agent from the given state. A terminal
    /// state yields zero estimates.
    fn estimate(
        &self,
        state: &S,
        assignment: &HypothesisAssignment,
        params: &MctsParameters,
        rng: &mut ChaCha8Rng,
    ) -> Vec<HeuristicEstimate>;
}

/// Random-rollout heuristic: the ego agent plays uniformly random
/// actions, the other agents follow their sampled hypotheses.
#[derive(Clone, Debug)]
pub struct RandomHeuristic {
    max_rollout_depth: usize,
}

impl RandomHeuristic {
    /// Create a heuristic with the given playout depth limit.
    pub fn new(max_rollout_depth: usize) -> Self {
        Self { max_rollout_depth }
    }
}

impl Default for RandomHeuristic {
    fn default() -> Self {
        Self::new(30)
    }
}

impl<S: Domain> Heuristic<S> for RandomHeuristic {
    fn estimate(
        &self,
        state: &S,
        assignment: &HypothesisAssignment,
        params: &MctsParameters,
        rng: &mut ChaCha8Rng,
    ) -> Vec<HeuristicEstimate> {
        let num_agents = state.num_agents();
        let mut estimates = vec![HeuristicEstimate::default(); num_agents];
        let mut current = state.clone();
        let mut reward_discount = 1.0;
        let mut depth = 0;

        while !current.is_terminal() && depth < self.max_rollout_depth {
            let mut joint = JointAction::new(num_agents);
            joint.set(EGO_AGENT, rng.gen_range(0..current.num_actions(EGO_AGENT)));
            for agent in 1..num_agents {
                let hypothesis = assignment.get(&agent).copied().unwrap_or_default();
                joint.set(agent, current.plan_action(agent, hypothesis, rng));
            }

            let (next, rewards, ego_cost) = current.execute(&joint, rng);
            for (agent, estimate) in estimates.iter_mut().enumerate() {
                estimate.reward += reward_discount * rewards[agent];
            }
            // risk is not discounted
            estimates[EGO_AGENT].cost += ego_cost;

            reward_discount *= params.discount_factor;
            current = next;
            depth += 1;
        }
        estimates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccmcts_core::{ActionIdx, AgentIdx, Cost, HypothesisId, Reward};
    use rand::{RngCore, SeedableRng};

    // Terminal after `remaining` steps; every step pays reward 1 and
    // cost 0.5 to the ego agent.
    #[derive(Clone)]
    struct CountdownDomain {
        remaining: usize,
    }

    impl Domain for CountdownDomain {
        fn num_agents(&self) -> usize {
            1
        }
        fn num_actions(&self, _agent: AgentIdx) -> usize {
            1
        }
        fn execute(
            &self,
            _joint_action: &JointAction,
            _rng: &mut dyn RngCore,
        ) -> (Self, Vec<Reward>, Cost) {
            (
                Self {
                    remaining: self.remaining - 1,
                },
                vec![1.0],
                0.5,
            )
        }
        fn is_terminal(&self) -> bool {
            self.remaining == 0
        }
        fn plan_action(
            &self,
            _agent: AgentIdx,
            _hypothesis: HypothesisId,
            _rng: &mut dyn RngCore,
        ) -> ActionIdx {
            0
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
            0
        }
        fn last_action(&self, _agent: AgentIdx) -> ActionIdx {
            0
        }
    }

    #[test]
    fn test_rollout_discounts_reward_but_not_cost() {
        let mut params = MctsParameters::default();
        params.discount_factor = 0.5;
        let heuristic = RandomHeuristic::new(10);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let assignment = HypothesisAssignment::new();

        let estimates = heuristic.estimate(
            &CountdownDomain { remaining: 3 },
            &assignment,
            &params,
            &mut rng,
        );
        // reward: 1 + 0.5 + 0.25, cost: 3 · 0.5
        assert!((estimates[0].reward - 1.75).abs() < 1e-9);
        assert!((estimates[0].cost - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_terminal_state_estimates_zero() {
        let params = MctsParameters::default();
        let heuristic = RandomHeuristic::default();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let assignment = HypothesisAssignment::new();

        let estimates = heuristic.estimate(
            &CountdownDomain { remaining: 0 },
            &assignment,
            &params,
            &mut rng,
        );
        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates[0].reward, 0.0);
        assert_eq!(estimates[0].cost, 0.0);
    }

    #[test]
    fn test_rollout_respects_depth_limit() {
        let params = MctsParameters::default();
        let heuristic = RandomHeuristic::new(2);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let assignment = HypothesisAssignment::new();

        let estimates = heuristic.estimate(
            &CountdownDomain { remaining: 100 },
            &assignment,
            &params,
            &mut rng,
        );
        // 1 + 0.9 after two steps
        assert!((estimates[0].reward - 1.9).abs() < 1e-9);
    }
}
