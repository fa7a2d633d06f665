//! Stage nodes of the search tree.
//!
//! Uses arena allocation with indices; backpropagation walks the descent
//! path recorded during selection, so nodes carry no parent links.

use crate::config::MctsParameters;
use crate::statistics::NodeStatistic;
use ccmcts_core::{Cost, Domain, JointAction, Reward, EGO_AGENT};
use std::collections::BTreeMap;

/// Index into the node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The root node is always at index 0.
    pub const ROOT: NodeId = NodeId(0);
}

/// One node per (tree position, hypothesis assignment along the path).
///
/// Holds the environment state, the statistic of every agent, and the
/// edge data of the transition that led here. The edge rewards and cost
/// are refreshed on every traversal so stochastic transition outcomes
/// are re-sampled rather than frozen at expansion time.
#[derive(Debug)]
pub struct StageNode<S: Domain, E, O> {
    /// Environment state at this node.
    pub state: S,

    /// Joint action on the incoming edge (`None` for the root).
    pub joint_action: Option<JointAction>,

    /// Immediate per-agent rewards sampled on the latest traversal of
    /// the incoming edge.
    pub immediate_rewards: Vec<Reward>,

    /// Immediate ego cost sampled on the latest traversal of the
    /// incoming edge.
    pub ego_cost: Cost,

    /// The ego agent's decision statistic.
    pub ego_statistic: E,

    /// Statistics of the other agents, indexed by `agent - 1`.
    pub other_statistics: Vec<O>,

    /// Children keyed by joint action.
    pub children: BTreeMap<JointAction, NodeId>,
}

impl<S, E, O> StageNode<S, E, O>
where
    S: Domain,
    E: NodeStatistic<S>,
    O: NodeStatistic<S>,
{
    /// Create a node for the given state, building fresh statistics for
    /// every agent.
    pub fn new(
        state: S,
        joint_action: Option<JointAction>,
        immediate_rewards: Vec<Reward>,
        ego_cost: Cost,
        params: &MctsParameters,
    ) -> Self {
        let ego_statistic = E::new(state.num_actions(EGO_AGENT), EGO_AGENT, params);
        let other_statistics = (1..state.num_agents())
            .map(|agent| O::new(state.num_actions(agent), agent, params))
            .collect();
        Self {
            state,
            joint_action,
            immediate_rewards,
            ego_cost,
            ego_statistic,
            other_statistics,
            children: BTreeMap::new(),
        }
    }
}
