//! 1-D crossing toy domain for the cost-constrained planner.
//!
//! An ego agent and one or more other agents move along a shared axis
//! with a single crossing point. The other agents follow desired-gap
//! policies whose parameters the planner does not know; it plans against
//! a posterior over a finite set of candidate policies instead.

mod episode;
mod policy;
mod state;

pub use episode::{CrossingPlanner, EpisodeOutcome, EpisodeRunner, StepOutcome};
pub use policy::DesiredGapPolicy;
pub use state::{Action, AgentState, CrossingParameters, CrossingState};
