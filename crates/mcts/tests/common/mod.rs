//! Shared test domain: a bandit-style state with risky arms.

use ccmcts_core::{ActionIdx, AgentIdx, Cost, Domain, HypothesisId, JointAction, Reward};
use rand::{Rng, RngCore};

/// One arm: pulling it yields, with probability `risk`, cost 1.0 and no
/// reward, otherwise `goal_reward` and no cost.
#[derive(Clone, Copy, Debug)]
pub struct Arm {
    pub goal_reward: f64,
    pub risk: f64,
}

impl Arm {
    pub fn new(goal_reward: f64, risk: f64) -> Self {
        Self { goal_reward, risk }
    }
}

/// Single-agent test environment: one action per arm, terminal after
/// `n_steps` pulls. Arm 0 is conventionally the zero-reward zero-risk
/// "stay" arm.
#[derive(Clone, Debug)]
pub struct RiskChoiceState {
    arms: Vec<Arm>,
    remaining_steps: u32,
}

impl RiskChoiceState {
    pub fn new(arms: Vec<Arm>, n_steps: u32) -> Self {
        Self {
            arms,
            remaining_steps: n_steps,
        }
    }
}

impl Domain for RiskChoiceState {
    fn num_agents(&self) -> usize {
        1
    }

    fn num_actions(&self, _agent: AgentIdx) -> usize {
        self.arms.len()
    }

    fn execute(
        &self,
        joint_action: &JointAction,
        rng: &mut dyn RngCore,
    ) -> (Self, Vec<Reward>, Cost) {
        let arm = self.arms[joint_action.ego()];
        let collides = rng.gen::<f64>() < arm.risk;
        let reward = if collides { 0.0 } else { arm.goal_reward };
        let cost = if collides { 1.0 } else { 0.0 };
        (
            Self {
                arms: self.arms.clone(),
                remaining_steps: self.remaining_steps - 1,
            },
            vec![reward],
            cost,
        )
    }

    fn is_terminal(&self) -> bool {
        self.remaining_steps == 0
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
