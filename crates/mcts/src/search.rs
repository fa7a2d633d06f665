//! The MCTS driver: selection, expansion, rollout, backpropagation.

use crate::belief::HypothesisBeliefTracker;
use crate::config::MctsParameters;
use crate::heuristic::Heuristic;
use crate::node::{NodeId, StageNode};
use crate::statistics::{EdgeSummary, HeuristicEstimate, NodeStatistic, SelectionContext};
use crate::tree::Tree;
use ccmcts_core::{
    ActionIdx, Domain, HypothesisAssignment, JointAction, PlannerError, Policy, Result, EGO_AGENT,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::marker::PhantomData;
use std::time::{Duration, Instant};
use tracing::debug;

/// Result of one planning call.
#[derive(Clone, Debug)]
pub struct SearchResult {
    /// Deterministic best ego action at the root. For a terminal root
    /// this is the sentinel no-op action `0`; callers are expected to
    /// check terminality themselves.
    pub best_action: ActionIdx,

    /// Root action distribution.
    pub policy: Policy,

    /// λ after the final adaptation step.
    pub lambda: f64,

    /// Iterations actually run (may undercut the budget on timeout).
    pub iterations: usize,

    /// Wall-clock time spent.
    pub elapsed: Duration,

    /// Per-action reward/cost means and visits at the root.
    pub edges: Vec<EdgeSummary>,
}

/// Monte-Carlo tree search over a [`Domain`].
///
/// Generic over the ego statistic `E`, the other agents' statistic `O`,
/// and the leaf heuristic `H`. The driver owns the parameter object
/// (λ persists here across planning calls within one episode) and the
/// single seeded random stream; the tree is rebuilt per call and kept
/// for inspection until the next one.
pub struct Mcts<S: Domain, E, O, H> {
    parameters: MctsParameters,
    heuristic: H,
    rng: ChaCha8Rng,
    tree: Option<Tree<S, E, O>>,
    _domain: PhantomData<S>,
}

impl<S, E, O, H> Mcts<S, E, O, H>
where
    S: Domain,
    E: NodeStatistic<S>,
    O: NodeStatistic<S>,
    H: Heuristic<S>,
{
    /// Create a driver from validated parameters.
    ///
    /// # Errors
    /// Returns a configuration error if the parameters are inconsistent.
    pub fn new(parameters: MctsParameters, heuristic: H) -> Result<Self> {
        parameters.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(parameters.random_seed);
        Ok(Self {
            parameters,
            heuristic,
            rng,
            tree: None,
            _domain: PhantomData,
        })
    }

    /// The live parameter object (λ included).
    pub fn parameters(&self) -> &MctsParameters {
        &self.parameters
    }

    /// Root statistic of the most recent search, if any.
    pub fn root_statistic(&self) -> Option<&E> {
        self.tree.as_ref().map(|tree| &tree.root().ego_statistic)
    }

    /// Run the search from `root_state`, sampling opponent hypotheses
    /// from `belief_tracker` each iteration.
    ///
    /// Loops until the iteration budget or the wall-clock budget is
    /// exhausted, then reports the root statistic's best action.
    ///
    /// # Errors
    /// Returns `PlannerError::EmptyActionSet` if the ego agent has no
    /// actions in `root_state`.
    pub fn search(
        &mut self,
        root_state: S,
        belief_tracker: &mut HypothesisBeliefTracker,
    ) -> Result<SearchResult> {
        let start = Instant::now();
        if root_state.num_actions(EGO_AGENT) == 0 {
            return Err(PlannerError::EmptyActionSet(EGO_AGENT));
        }
        if root_state.is_terminal() {
            // sentinel no-op result
            return Ok(SearchResult {
                best_action: 0,
                policy: Policy::deterministic(0),
                lambda: self.parameters.cost_constrained.lambda,
                iterations: 0,
                elapsed: start.elapsed(),
                edges: Vec::new(),
            });
        }

        let num_agents = root_state.num_agents();
        let root = StageNode::new(
            root_state,
            None,
            vec![0.0; num_agents],
            0.0,
            &self.parameters,
        );
        self.tree = Some(Tree::new(root));

        let mut iterations = 0;
        for iteration in 0..self.parameters.max_iterations {
            if start.elapsed() >= self.parameters.max_search_time {
                break;
            }
            let assignment = belief_tracker.sample_current_hypothesis();
            self.iterate(&assignment);

            let tree = self.tree.as_ref().expect("BUG: tree vanished mid-search");
            E::update_statistic_parameters(
                &mut self.parameters,
                &tree.root().ego_statistic,
                iteration,
                &mut self.rng,
            );
            iterations = iteration + 1;
        }

        let tree = self.tree.as_ref().expect("BUG: tree vanished mid-search");
        let root_statistic = &tree.root().ego_statistic;
        let result = SearchResult {
            best_action: root_statistic.best_action(&self.parameters),
            policy: root_statistic.policy(&self.parameters),
            lambda: self.parameters.cost_constrained.lambda,
            iterations,
            elapsed: start.elapsed(),
            edges: root_statistic.edge_summaries(),
        };
        debug!(
            best_action = result.best_action,
            lambda = result.lambda,
            iterations = result.iterations,
            nodes = tree.len(),
            "search finished"
        );
        Ok(result)
    }

    /// One iteration: descend from the root, expand at most one node,
    /// seed it from the heuristic, backpropagate along the path.
    fn iterate(&mut self, assignment: &HypothesisAssignment) {
        let tree = self.tree.as_mut().expect("BUG: iterate without a tree");
        let mut path = vec![NodeId::ROOT];
        let mut current = NodeId::ROOT;

        loop {
            if tree.get(current).state.is_terminal() {
                // descent stops here, zero future return
                let node = tree.get_mut(current);
                let zero = HeuristicEstimate::default();
                node.ego_statistic.update_from_heuristic(&zero);
                for statistic in node.other_statistics.iter_mut() {
                    statistic.update_from_heuristic(&zero);
                }
                break;
            }

            // selection: the ego statistic picks, the others follow
            // their sampled hypotheses
            let (joint, next_state, rewards, ego_cost) = {
                let node = tree.get_mut(current);
                let StageNode {
                    state,
                    ego_statistic,
                    other_statistics,
                    ..
                } = node;
                let num_agents = state.num_agents();
                let mut joint = JointAction::new(num_agents);
                let mut ctx = SelectionContext {
                    params: &self.parameters,
                    assignment,
                    rng: &mut self.rng,
                };
                joint.set(EGO_AGENT, ego_statistic.choose_next_action(state, &mut ctx));
                for (offset, statistic) in other_statistics.iter_mut().enumerate() {
                    joint.set(offset + 1, statistic.choose_next_action(state, &mut ctx));
                }
                // re-execute on every traversal so stochastic edge
                // outcomes are re-sampled, not frozen at expansion
                let (next_state, rewards, ego_cost) = state.execute(&joint, &mut self.rng);
                (joint, next_state, rewards, ego_cost)
            };

            if let Some(&child_id) = tree.get(current).children.get(&joint) {
                let child = tree.get_mut(child_id);
                child.state = next_state;
                child.immediate_rewards = rewards;
                child.ego_cost = ego_cost;
                path.push(child_id);
                current = child_id;
                continue;
            }

            // expansion of a single new leaf
            let child = StageNode::new(
                next_state,
                Some(joint.clone()),
                rewards,
                ego_cost,
                &self.parameters,
            );
            let child_id = tree.add(child);
            tree.get_mut(current).children.insert(joint, child_id);
            path.push(child_id);

            let estimates = self.heuristic.estimate(
                &tree.get(child_id).state,
                assignment,
                &self.parameters,
                &mut self.rng,
            );
            let child = tree.get_mut(child_id);
            child.ego_statistic.update_from_heuristic(&estimates[EGO_AGENT]);
            for (offset, statistic) in child.other_statistics.iter_mut().enumerate() {
                statistic.update_from_heuristic(&estimates[offset + 1]);
            }
            break;
        }

        // backpropagation along the recorded descent path
        for pair in path.windows(2).rev() {
            let (parent, child) = tree.parent_child_mut(pair[0], pair[1]);
            let joint = child
                .joint_action
                .as_ref()
                .expect("BUG: non-root node without incoming joint action");
            parent.ego_statistic.collect(
                joint.ego(),
                child.immediate_rewards[EGO_AGENT],
                child.ego_cost,
            );
            parent.ego_statistic.update_statistic(&child.ego_statistic);
            for (offset, statistic) in parent.other_statistics.iter_mut().enumerate() {
                statistic.collect(joint.get(offset + 1), child.immediate_rewards[offset + 1], 0.0);
                statistic.update_statistic(&child.other_statistics[offset]);
            }
        }
    }
}
