//! Episode runner: the planner against the true opponent policies.
//!
//! The other agents act according to policies unknown to the planner;
//! the belief tracker is updated from every observed transition, so the
//! planner's hypothesis posterior sharpens as the episode progresses.

use crate::policy::DesiredGapPolicy;
use crate::state::CrossingState;
use ccmcts::{
    CostConstrainedStatistic, HypothesisBeliefTracker, HypothesisStatistic, Mcts, MctsParameters,
    RandomHeuristic,
};
use ccmcts_core::{AgentIdx, Domain, JointAction, Probability, Result, EGO_AGENT};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Planner type used for episodes.
pub type CrossingPlanner =
    Mcts<CrossingState, CostConstrainedStatistic, HypothesisStatistic, RandomHeuristic>;

/// Outcome of one environment step.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StepOutcome {
    pub ego_reward: f64,
    pub ego_cost: f64,
    pub terminal: bool,
    pub collision: bool,
    pub goal_reached: bool,
}

/// Outcome of one full episode.
#[derive(Clone, Debug, Serialize)]
pub struct EpisodeOutcome {
    pub last_step: StepOutcome,
    pub max_steps_reached: bool,
    pub num_steps: usize,
    /// Belief snapshots per step, when requested.
    pub beliefs: Vec<BTreeMap<AgentIdx, Vec<Probability>>>,
}

/// Steps the true (unknown-to-the-planner) opponent policies against the
/// planner until the episode terminates.
pub struct EpisodeRunner {
    true_policies: Vec<DesiredGapPolicy>,
    planner: CrossingPlanner,
    belief_tracker: HypothesisBeliefTracker,
    current_state: CrossingState,
    max_steps: usize,
    rng: ChaCha8Rng,
}

impl EpisodeRunner {
    /// Create a runner. `true_policies` holds one policy per other
    /// agent; the belief tracker is initialized from the initial state.
    ///
    /// # Errors
    /// Fails on an invalid parameter object.
    pub fn new(
        initial_state: CrossingState,
        true_policies: Vec<DesiredGapPolicy>,
        parameters: MctsParameters,
        max_steps: usize,
    ) -> Result<Self> {
        let mut belief_tracker = HypothesisBeliefTracker::new(&parameters.belief_tracker);
        belief_tracker.initialize(&initial_state);
        let rng = ChaCha8Rng::seed_from_u64(parameters.random_seed.wrapping_add(1));
        let planner = CrossingPlanner::new(parameters, RandomHeuristic::default())?;
        Ok(Self {
            true_policies,
            planner,
            belief_tracker,
            current_state: initial_state,
            max_steps,
            rng,
        })
    }

    /// Current belief snapshot.
    pub fn beliefs(&self) -> &BTreeMap<AgentIdx, Vec<Probability>> {
        self.belief_tracker.beliefs()
    }

    /// The current environment state.
    pub fn state(&self) -> &CrossingState {
        &self.current_state
    }

    /// Plan one ego action, let the true policies act, execute the joint
    /// action and update the belief from the observed transition.
    ///
    /// # Errors
    /// Propagates planner errors.
    pub fn step(&mut self) -> Result<StepOutcome> {
        if self.current_state.is_terminal() {
            return Ok(StepOutcome {
                terminal: true,
                collision: self.current_state.ego_collided(),
                goal_reached: self.current_state.ego_goal_reached(),
                ..StepOutcome::default()
            });
        }

        let search = self
            .planner
            .search(self.current_state.clone(), &mut self.belief_tracker)?;

        let mut joint = JointAction::new(self.current_state.num_agents());
        joint.set(EGO_AGENT, search.best_action);
        for (offset, policy) in self.true_policies.iter().enumerate() {
            let agent = offset + 1;
            let distance = self.current_state.distance_to_ego(agent);
            joint.set(agent, policy.act(distance, &mut self.rng).to_index());
        }

        let (next_state, rewards, ego_cost) = self.current_state.execute(&joint, &mut self.rng);
        let previous_state = std::mem::replace(&mut self.current_state, next_state);
        self.belief_tracker
            .belief_update(&previous_state, &self.current_state);

        let outcome = StepOutcome {
            ego_reward: rewards[EGO_AGENT],
            ego_cost,
            terminal: self.current_state.is_terminal(),
            collision: self.current_state.ego_collided(),
            goal_reached: self.current_state.ego_goal_reached(),
        };
        debug!(
            ego_action = search.best_action,
            lambda = search.lambda,
            reward = outcome.ego_reward,
            cost = outcome.ego_cost,
            "episode step"
        );
        Ok(outcome)
    }

    /// Run until the episode terminates or the step limit is reached.
    ///
    /// # Errors
    /// Propagates planner errors.
    pub fn run(&mut self, save_beliefs: bool) -> Result<EpisodeOutcome> {
        let mut num_steps = 0;
        let mut beliefs = Vec::new();
        loop {
            let step = self.step()?;
            if save_beliefs {
                beliefs.push(self.belief_tracker.beliefs().clone());
            }
            let max_steps_reached = num_steps >= self.max_steps;
            if step.terminal || max_steps_reached {
                return Ok(EpisodeOutcome {
                    last_step: step,
                    max_steps_reached,
                    num_steps,
                    beliefs,
                });
            }
            num_steps += 1;
        }
    }
}
