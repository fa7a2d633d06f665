//! Planner configuration parameters.
//!
//! One parameter object covers the driver budgets, the plain UCB
//! statistic, the cost-constrained statistic, and the belief tracker.
//! The Lagrangian multiplier `lambda` lives here as well: the adapter
//! mutates the driver's copy between iterations and the statistics read
//! it by argument during selection.

use ccmcts_core::{PlannerError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Planner configuration parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MctsParameters {
    /// Maximum number of search iterations per planning call.
    pub max_iterations: usize,

    /// Wall-clock budget per planning call. Checked once per iteration;
    /// there are no internal suspension points.
    pub max_search_time: Duration,

    /// Seed for the driver's random stream (selection, LP sampling,
    /// rollouts, stochastic domain transitions).
    pub random_seed: u64,

    /// Reward discount factor γ. Cost is never discounted.
    pub discount_factor: f64,

    /// Plain UCB statistic parameters.
    pub uct: UctParameters,

    /// Cost-constrained statistic parameters.
    pub cost_constrained: CostConstrainedParameters,

    /// Hypothesis belief tracker parameters.
    pub belief_tracker: BeliefTrackerParameters,
}

/// Parameters of the plain UCB statistic.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UctParameters {
    /// Lower bound of returns seen by this statistic.
    pub lower_bound: f64,

    /// Upper bound of returns seen by this statistic.
    pub upper_bound: f64,

    /// Exploration constant of the UCB selection rule.
    pub exploration_constant: f64,

    /// Progressive widening coefficient k.
    pub progressive_widening_k: f64,

    /// Progressive widening exponent α.
    pub progressive_widening_alpha: f64,
}

/// Parameters of the cost-constrained statistic and the λ adapter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CostConstrainedParameters {
    /// Lagrangian multiplier trading reward against cost. Mutated by the
    /// λ adapter between iterations; persists across planning calls.
    pub lambda: f64,

    /// Exploration coefficient κ of the mixed selection score.
    pub kappa: f64,

    /// Width factor of the statistical near-optimum filter.
    pub action_filter_factor: f64,

    /// Upper bound on expected cumulative ego cost.
    pub cost_constraint: f64,

    /// Lower bound of cost returns.
    pub cost_lower_bound: f64,

    /// Upper bound of cost returns.
    pub cost_upper_bound: f64,

    /// Lower bound of reward returns.
    pub reward_lower_bound: f64,

    /// Upper bound of reward returns.
    pub reward_upper_bound: f64,

    /// Base step size of the projected λ gradient.
    pub gradient_update_step: f64,

    /// Scale τ of the λ projection interval.
    pub tau_gradient_clip: f64,
}

/// How the belief tracker blends the likelihood history into a posterior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PosteriorType {
    /// Running product of the likelihoods in the history window.
    Product,
    /// Mean of the likelihoods in the history window.
    Sum,
}

/// Parameters of the hypothesis belief tracker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BeliefTrackerParameters {
    /// Number of observed transitions kept per agent.
    pub history_length: usize,

    /// Posterior blend over the likelihood history.
    pub posterior_type: PosteriorType,

    /// Seed of the tracker's own sampling stream.
    pub random_seed_hypothesis_sampling: u64,
}

impl Default for MctsParameters {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            max_search_time: Duration::from_secs(1),
            random_seed: 1000,
            discount_factor: 0.9,
            uct: UctParameters {
                lower_bound: -1000.0,
                upper_bound: 100.0,
                exploration_constant: 0.7,
                progressive_widening_k: 4.0,
                progressive_widening_alpha: 0.25,
            },
            cost_constrained: CostConstrainedParameters {
                lambda: 2.0,
                kappa: 10.0,
                action_filter_factor: 1.0,
                cost_constraint: 0.1,
                cost_lower_bound: 0.0,
                cost_upper_bound: 1.0,
                reward_lower_bound: -1000.0,
                reward_upper_bound: 100.0,
                gradient_update_step: 1.0,
                tau_gradient_clip: 1.0,
            },
            belief_tracker: BeliefTrackerParameters {
                history_length: 10,
                posterior_type: PosteriorType::Product,
                random_seed_hypothesis_sampling: 2000,
            },
        }
    }
}

impl MctsParameters {
    /// Create parameters with the given iteration budget.
    pub fn with_iterations(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..Default::default()
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns `PlannerError::InvalidParameter` on inverted bounds,
    /// out-of-range factors, or empty budgets. Not recoverable; callers
    /// are expected to fail construction.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(PlannerError::invalid_parameter(
                "max_iterations",
                "must be at least 1",
            ));
        }
        if !(0.0..1.0).contains(&self.discount_factor) {
            return Err(PlannerError::invalid_parameter(
                "discount_factor",
                format!("{} is outside [0, 1)", self.discount_factor),
            ));
        }
        check_bounds(
            "uct.lower_bound/upper_bound",
            self.uct.lower_bound,
            self.uct.upper_bound,
        )?;
        check_bounds(
            "cost_constrained.reward_lower_bound/reward_upper_bound",
            self.cost_constrained.reward_lower_bound,
            self.cost_constrained.reward_upper_bound,
        )?;
        check_bounds(
            "cost_constrained.cost_lower_bound/cost_upper_bound",
            self.cost_constrained.cost_lower_bound,
            self.cost_constrained.cost_upper_bound,
        )?;
        if self.uct.progressive_widening_k <= 0.0 {
            return Err(PlannerError::invalid_parameter(
                "uct.progressive_widening_k",
                "must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.uct.progressive_widening_alpha) {
            return Err(PlannerError::invalid_parameter(
                "uct.progressive_widening_alpha",
                format!(
                    "{} is outside [0, 1]",
                    self.uct.progressive_widening_alpha
                ),
            ));
        }
        if self.cost_constrained.lambda < 0.0 {
            return Err(PlannerError::invalid_parameter(
                "cost_constrained.lambda",
                "must be non-negative",
            ));
        }
        if self.cost_constrained.kappa < 0.0 {
            return Err(PlannerError::invalid_parameter(
                "cost_constrained.kappa",
                "must be non-negative",
            ));
        }
        if self.cost_constrained.action_filter_factor < 0.0 {
            return Err(PlannerError::invalid_parameter(
                "cost_constrained.action_filter_factor",
                "must be non-negative",
            ));
        }
        if self.cost_constrained.tau_gradient_clip <= 0.0 {
            return Err(PlannerError::invalid_parameter(
                "cost_constrained.tau_gradient_clip",
                "must be positive",
            ));
        }
        if self.belief_tracker.history_length == 0 {
            return Err(PlannerError::invalid_parameter(
                "belief_tracker.history_length",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

fn check_bounds(name: &'static str, lower: f64, upper: f64) -> Result<()> {
    if lower < upper {
        Ok(())
    } else {
        Err(PlannerError::invalid_parameter(
            name,
            format!("lower bound {} must be below upper bound {}", lower, upper),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(MctsParameters::default().validate().is_ok());
    }

    #[test]
    fn test_with_iterations() {
        let params = MctsParameters::with_iterations(123);
        assert_eq!(params.max_iterations, 123);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let mut params = MctsParameters::default();
        params.uct.lower_bound = params.uct.upper_bound;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_inverted_cost_bounds_rejected() {
        let mut params = MctsParameters::default();
        params.cost_constrained.cost_upper_bound = -1.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_discount_factor_one_rejected() {
        let mut params = MctsParameters::default();
        params.discount_factor = 1.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_negative_lambda_rejected() {
        let mut params = MctsParameters::default();
        params.cost_constrained.lambda = -0.5;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let mut params = MctsParameters::default();
        params.max_iterations = 0;
        assert!(params.validate().is_err());
    }
}
