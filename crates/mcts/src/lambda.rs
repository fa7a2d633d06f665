//! Projected-gradient adaptation of the Lagrangian multiplier.
//!
//! Invoked once per iteration after backpropagation. Reads the root
//! statistic's constraint violation and nudges λ along the gradient with
//! a decaying step size, then projects onto the admissible interval.

use crate::config::MctsParameters;
use crate::statistics::CostConstrainedStatistic;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

/// One projected-gradient step on λ.
#[derive(Clone, Copy, Debug)]
pub struct LambdaAdapter {
    gradient_update_step: f64,
    cost_constraint: f64,
    tau_gradient_clip: f64,
    discount_factor: f64,
    reward_span: f64,
}

impl LambdaAdapter {
    /// Build an adapter from the live parameter object.
    pub fn from_parameters(params: &MctsParameters) -> Self {
        let cc = &params.cost_constrained;
        Self {
            gradient_update_step: cc.gradient_update_step,
            cost_constraint: cc.cost_constraint,
            tau_gradient_clip: cc.tau_gradient_clip,
            discount_factor: params.discount_factor,
            reward_span: cc.reward_upper_bound - cc.reward_lower_bound,
        }
    }

    /// Decaying step size `step₀ / (0.1·i + 1)`.
    pub fn step_size(&self, iteration: usize) -> f64 {
        self.gradient_update_step / (0.1 * iteration as f64 + 1.0)
    }

    /// Upper end of the projection interval,
    /// `(R_hi − R_lo) / (τ · (1 − γ))`.
    pub fn upper_clip(&self) -> f64 {
        self.reward_span / (self.tau_gradient_clip * (1.0 - self.discount_factor))
    }

    /// Compute the next λ from the root statistic.
    ///
    /// The gradient signal is the normalized cost of the strictly best
    /// arm (filter factor 0) minus the constraint; the result is clipped
    /// to `[0, upper_clip]`.
    pub fn adapt(
        &self,
        current_lambda: f64,
        iteration: usize,
        root_statistic: &CostConstrainedStatistic,
        rng: &mut ChaCha8Rng,
    ) -> f64 {
        let (selected, _) = root_statistic.greedy_policy(0.0, 0.0, current_lambda, Some(rng));
        let normalized_cost = root_statistic.normalized_cost_value(selected);
        let gradient = normalized_cost - self.cost_constraint;
        let updated = current_lambda + self.step_size(iteration) * gradient;
        let clipped = updated.clamp(0.0, self.upper_clip());
        trace!(
            iteration,
            selected,
            normalized_cost,
            gradient,
            lambda = clipped,
            "lambda gradient step"
        );
        clipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> LambdaAdapter {
        let mut params = MctsParameters::default();
        params.cost_constrained.gradient_update_step = 1.0;
        params.cost_constrained.reward_lower_bound = 0.0;
        params.cost_constrained.reward_upper_bound = 1.0;
        params.cost_constrained.tau_gradient_clip = 1.0;
        params.discount_factor = 0.9;
        LambdaAdapter::from_parameters(&params)
    }

    #[test]
    fn test_step_size_decays() {
        let adapter = adapter();
        assert!((adapter.step_size(0) - 1.0).abs() < 1e-9);
        assert!((adapter.step_size(10) - 0.5).abs() < 1e-9);
        assert!(adapter.step_size(100) < adapter.step_size(10));
    }

    #[test]
    fn test_upper_clip() {
        let adapter = adapter();
        // (1 - 0) / (1 · (1 - 0.9)) = 10
        assert!((adapter.upper_clip() - 10.0).abs() < 1e-9);
    }
}
