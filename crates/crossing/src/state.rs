//! A 1-D crossing environment.
//!
//! All agents move on one axis. The ego agent earns its goal reward by
//! reaching the goal position; if it occupies the crossing point at the
//! same time as any other agent, it collides, pays the full ego cost and
//! the episode ends.

use crate::policy::DesiredGapPolicy;
use ccmcts_core::{ActionIdx, AgentIdx, Cost, Domain, HypothesisId, JointAction, Reward};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Reward for reaching the goal position.
const GOAL_REWARD: f64 = 100.0;

/// Reward for colliding at the crossing point.
const COLLISION_REWARD: f64 = -1000.0;

/// Ego cost booked on a collision.
const COLLISION_COST: f64 = 1.0;

/// Movement alternatives of every agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Wait,
    Forward,
    Backward,
}

impl Action {
    /// Dense action index.
    pub fn to_index(self) -> ActionIdx {
        match self {
            Action::Wait => 0,
            Action::Forward => 1,
            Action::Backward => 2,
        }
    }

    /// Action for a dense index.
    ///
    /// # Panics
    /// Panics on an index outside `[0, 3)`.
    pub fn from_index(index: ActionIdx) -> Self {
        match index {
            0 => Action::Wait,
            1 => Action::Forward,
            2 => Action::Backward,
            _ => panic!("BUG: action index {} out of range", index),
        }
    }

    /// Position displacement of the action.
    pub fn displacement(self) -> i32 {
        match self {
            Action::Wait => 0,
            Action::Forward => 1,
            Action::Backward => -1,
        }
    }

    /// Number of actions.
    pub const COUNT: usize = 3;
}

/// Geometry of the crossing corridor.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CrossingParameters {
    /// Length of the corridor; the crossing point sits at its middle.
    pub state_length: i32,

    /// Position at which the ego agent has reached its goal.
    pub ego_goal_position: i32,
}

impl CrossingParameters {
    /// Position shared by all agents' paths.
    pub fn crossing_point(&self) -> i32 {
        (self.state_length - 1) / 2 + 1
    }
}

impl Default for CrossingParameters {
    fn default() -> Self {
        Self {
            state_length: 41,
            ego_goal_position: 35,
        }
    }
}

/// Position and last action of one agent.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct AgentState {
    pub position: i32,
    pub last_action: Option<Action>,
}

/// One state of the crossing environment.
#[derive(Clone, Debug)]
pub struct CrossingState {
    parameters: CrossingParameters,
    hypotheses: Vec<DesiredGapPolicy>,
    ego: AgentState,
    others: Vec<AgentState>,
    terminal: bool,
    collision: bool,
    goal_reached: bool,
}

impl CrossingState {
    /// Initial state with every agent at position 0.
    pub fn new(
        parameters: CrossingParameters,
        hypotheses: Vec<DesiredGapPolicy>,
        num_other_agents: usize,
    ) -> Self {
        Self::with_agents(
            parameters,
            hypotheses,
            AgentState::default(),
            vec![AgentState::default(); num_other_agents],
        )
    }

    /// State with explicit agent placements.
    pub fn with_agents(
        parameters: CrossingParameters,
        hypotheses: Vec<DesiredGapPolicy>,
        ego: AgentState,
        others: Vec<AgentState>,
    ) -> Self {
        Self {
            parameters,
            hypotheses,
            ego,
            others,
            terminal: false,
            collision: false,
            goal_reached: false,
        }
    }

    /// Signed distance from the given other agent to the ego agent.
    pub fn distance_to_ego(&self, agent: AgentIdx) -> i32 {
        self.ego.position - self.others[agent - 1].position
    }

    /// The ego agent's state.
    pub fn ego_state(&self) -> &AgentState {
        &self.ego
    }

    /// The other agents' states, indexed by `agent - 1`.
    pub fn other_states(&self) -> &[AgentState] {
        &self.others
    }

    /// True if the episode ended in a collision.
    pub fn ego_collided(&self) -> bool {
        self.collision
    }

    /// True if the ego agent reached its goal position.
    pub fn ego_goal_reached(&self) -> bool {
        self.goal_reached
    }
}

impl Domain for CrossingState {
    fn num_agents(&self) -> usize {
        1 + self.others.len()
    }

    fn num_actions(&self, _agent: AgentIdx) -> usize {
        Action::COUNT
    }

    fn execute(
        &self,
        joint_action: &JointAction,
        _rng: &mut dyn RngCore,
    ) -> (Self, Vec<Reward>, Cost) {
        let ego_action = Action::from_index(joint_action.ego());
        let next_ego = AgentState {
            position: self.ego.position + ego_action.displacement(),
            last_action: Some(ego_action),
        };

        let next_others: Vec<AgentState> = self
            .others
            .iter()
            .enumerate()
            .map(|(offset, other)| {
                let action = Action::from_index(joint_action.get(offset + 1));
                AgentState {
                    position: other.position + action.displacement(),
                    last_action: Some(action),
                }
            })
            .collect();

        // the goal check runs on the pre-move ego position
        let goal_reached = self.ego.position >= self.parameters.ego_goal_position;
        let crossing_point = self.parameters.crossing_point();
        let collision = next_others
            .iter()
            .any(|other| next_ego.position == crossing_point && other.position == crossing_point);

        let mut rewards = vec![0.0; self.num_agents()];
        rewards[0] = if goal_reached { GOAL_REWARD } else { 0.0 }
            + if collision { COLLISION_REWARD } else { 0.0 };
        let ego_cost = if collision { COLLISION_COST } else { 0.0 };

        let next = Self {
            parameters: self.parameters,
            hypotheses: self.hypotheses.clone(),
            ego: next_ego,
            others: next_others,
            terminal: goal_reached || collision,
            collision,
            goal_reached,
        };
        (next, rewards, ego_cost)
    }

    fn is_terminal(&self) -> bool {
        self.terminal
    }

    fn plan_action(
        &self,
        agent: AgentIdx,
        hypothesis: HypothesisId,
        rng: &mut dyn RngCore,
    ) -> ActionIdx {
        self.hypotheses[hypothesis]
            .act(self.distance_to_ego(agent), rng)
            .to_index()
    }

    fn hypothesis_probability(
        &self,
        hypothesis: HypothesisId,
        agent: AgentIdx,
        action: ActionIdx,
    ) -> f64 {
        self.hypotheses[hypothesis]
            .probability(self.distance_to_ego(agent), Action::from_index(action))
    }

    fn num_hypotheses(&self, _agent: AgentIdx) -> usize {
        self.hypotheses.len()
    }

    fn last_action(&self, agent: AgentIdx) -> ActionIdx {
        let state = if agent == 0 {
            &self.ego
        } else {
            &self.others[agent - 1]
        };
        state.last_action.unwrap_or(Action::Wait).to_index()
    }
}
