//! Core abstractions for cost-constrained hypothesis MCTS.
//!
//! This crate provides the [`Domain`] trait that environments implement to
//! be searchable, together with the common index types and the invariant
//! enforcing value types shared by the planner crates.
//!
//! # Types
//!
//! - [`Domain`] - Trait for environment states
//! - [`JointAction`] - One action per agent, indexed by agent id
//! - [`Policy`] - Probability distribution over actions (sums to 1.0)
//! - [`HypothesisAssignment`] - One sampled hypothesis per other agent

mod domain;
mod error;
mod types;

pub use domain::Domain;
pub use error::{PlannerError, Result};
pub use types::{
    ActionIdx, AgentIdx, Cost, HypothesisAssignment, HypothesisId, JointAction, Policy,
    Probability, Reward, EGO_AGENT,
};
