//! Opponent policies for the crossing domain.

use crate::state::Action;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// A desired-gap policy: the agent samples a desired gap to the ego
/// vehicle from an inclusive range and moves to close the difference.
///
/// The action likelihood exposed to belief updates is the fraction of
/// gaps in the range that produce the action, matching the sampling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredGapPolicy {
    min_gap: i32,
    max_gap: i32,
}

impl DesiredGapPolicy {
    /// Create a policy over the inclusive gap range `[min_gap, max_gap]`.
    ///
    /// # Panics
    /// Panics if the range is empty.
    pub fn new(min_gap: i32, max_gap: i32) -> Self {
        assert!(min_gap <= max_gap, "desired gap range must be non-empty");
        Self { min_gap, max_gap }
    }

    /// Act on the signed distance to the ego vehicle, sampling the
    /// desired gap from the range.
    pub fn act(&self, distance_to_ego: i32, rng: &mut dyn RngCore) -> Action {
        let desired_gap = rng.gen_range(self.min_gap..=self.max_gap);
        Self::action_for_gap(distance_to_ego, desired_gap)
    }

    /// The deterministic action once a desired gap is fixed.
    pub fn action_for_gap(distance_to_ego: i32, desired_gap: i32) -> Action {
        match distance_to_ego - desired_gap {
            difference if difference > 0 => Action::Forward,
            0 => Action::Wait,
            _ => Action::Backward,
        }
    }

    /// Likelihood of `action` at the given distance: the fraction of
    /// gaps in the range that map to it.
    pub fn probability(&self, distance_to_ego: i32, action: Action) -> f64 {
        let matching = (self.min_gap..=self.max_gap)
            .filter(|&gap| Self::action_for_gap(distance_to_ego, gap) == action)
            .count();
        matching as f64 / (self.max_gap - self.min_gap + 1) as f64
    }
}
