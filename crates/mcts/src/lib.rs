//! Cost-constrained Monte-Carlo tree search under latent opponent
//! behavior.
//!
//! An ego decision-maker maximizes expected cumulative reward while
//! keeping expected cumulative cost below a hard constraint, in an
//! environment whose other agents follow unknown policies drawn from a
//! finite hypothesis set. Each planning call runs a bounded budget of
//! tree rollouts, samples opponent behaviors from a posterior belief,
//! and returns the best ego action; the belief is updated between calls
//! from the actions actually observed.
//!
//! # Components
//!
//! - [`UctStatistic`] - running UCB estimator with progressive widening
//! - [`CostConstrainedStatistic`] - dual reward/cost estimators, action
//!   filtering, and the LP-derived stochastic policy
//! - [`LambdaAdapter`] - projected-gradient update of the Lagrangian
//!   multiplier between iterations
//! - [`HypothesisBeliefTracker`] - posterior over each agent's hypothesis
//! - [`Mcts`] - the search driver
//!
//! The planner is single-threaded and synchronous; with a fixed seed,
//! fixed budgets, and a deterministic domain, two planning calls produce
//! identical results.

pub mod belief;
pub mod config;
pub mod heuristic;
mod lambda;
mod node;
pub mod search;
pub mod statistics;
mod tree;

pub use belief::HypothesisBeliefTracker;
pub use config::{
    BeliefTrackerParameters, CostConstrainedParameters, MctsParameters, PosteriorType,
    UctParameters,
};
pub use heuristic::{Heuristic, RandomHeuristic};
pub use lambda::LambdaAdapter;
pub use search::{Mcts, SearchResult};
pub use statistics::{
    CostConstrainedStatistic, EdgeSummary, HeuristicEstimate, HypothesisStatistic, NodeStatistic,
    RandomActions, SelectionContext, UcbPair, UctStatistic,
};
