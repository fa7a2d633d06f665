use crate::{ActionIdx, AgentIdx, Cost, HypothesisId, JointAction, Probability, Reward};
use rand::RngCore;

/// An environment abstraction for cost-constrained hypothesis planning.
///
/// A `Domain` value is one immutable environment state. The ego agent is
/// always agent `0`; agents `1..num_agents()` are the other agents whose
/// behavior the planner models as a finite set of candidate policies
/// ("hypotheses") per agent.
///
/// Stochastic operations receive the caller's generator so that the
/// planner keeps a single seeded random stream: with a fixed seed, fixed
/// budgets, and a deterministic domain, two planning calls produce
/// identical results.
pub trait Domain: Clone {
    /// Total number of agents including the ego agent.
    fn num_agents(&self) -> usize;

    /// Number of actions available to the given agent in this state.
    fn num_actions(&self, agent: AgentIdx) -> usize;

    /// Apply one action per agent, returning the successor state, one
    /// reward per agent, and the ego agent's immediate cost.
    fn execute(&self, joint_action: &JointAction, rng: &mut dyn RngCore)
        -> (Self, Vec<Reward>, Cost);

    /// True if no further actions can be taken from this state.
    fn is_terminal(&self) -> bool;

    /// The action agent `agent` takes in this state under the given
    /// hypothesis. Stochastic opponent policies draw from `rng`.
    fn plan_action(
        &self,
        agent: AgentIdx,
        hypothesis: HypothesisId,
        rng: &mut dyn RngCore,
    ) -> ActionIdx;

    /// Likelihood of `action` for agent `agent` under `hypothesis`,
    /// evaluated in this state. Used by belief updates.
    fn hypothesis_probability(
        &self,
        hypothesis: HypothesisId,
        agent: AgentIdx,
        action: ActionIdx,
    ) -> Probability;

    /// Number of candidate policies modeled for the given agent.
    fn num_hypotheses(&self, agent: AgentIdx) -> usize;

    /// The action the given agent took on the transition into this state.
    fn last_action(&self, agent: AgentIdx) -> ActionIdx;
}
