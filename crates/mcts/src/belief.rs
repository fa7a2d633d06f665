//! Posterior belief over each other agent's hypothesis.
//!
//! The tracker keeps one probability vector per other agent, updated from
//! the likelihood of the agent's observed action under every candidate
//! hypothesis. Hypotheses that explain observed actions gain posterior
//! weight, hypotheses that do not lose it.

use crate::config::{BeliefTrackerParameters, PosteriorType};
use ccmcts_core::{AgentIdx, Domain, HypothesisAssignment, Probability};
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, VecDeque};
use tracing::trace;

/// Tracks and samples hypothesis beliefs for all other agents.
#[derive(Clone, Debug)]
pub struct HypothesisBeliefTracker {
    beliefs: BTreeMap<AgentIdx, Vec<Probability>>,
    likelihood_history: BTreeMap<AgentIdx, VecDeque<Vec<Probability>>>,
    history_length: usize,
    posterior_type: PosteriorType,
    rng: ChaCha8Rng,
}

impl HypothesisBeliefTracker {
    /// Create a tracker with its own seeded sampling stream.
    pub fn new(params: &BeliefTrackerParameters) -> Self {
        Self {
            beliefs: BTreeMap::new(),
            likelihood_history: BTreeMap::new(),
            history_length: params.history_length,
            posterior_type: params.posterior_type,
            rng: ChaCha8Rng::seed_from_u64(params.random_seed_hypothesis_sampling),
        }
    }

    /// Set every other agent's belief to the uniform prior over its
    /// hypotheses, leaving the likelihood history untouched. Called once
    /// at the start of an episode.
    pub fn initialize<S: Domain>(&mut self, state: &S) {
        for agent in 1..state.num_agents() {
            let num_hypotheses = state.num_hypotheses(agent);
            if num_hypotheses == 0 {
                continue;
            }
            self.beliefs
                .insert(agent, vec![1.0 / num_hypotheses as f64; num_hypotheses]);
        }
    }

    /// Draw one hypothesis per other agent from the current beliefs.
    ///
    /// Agents the tracker has never observed fall back to hypothesis 0.
    pub fn sample_current_hypothesis(&mut self) -> HypothesisAssignment {
        let mut assignment = HypothesisAssignment::new();
        for (&agent, belief) in &self.beliefs {
            let hypothesis = match WeightedIndex::new(belief.iter().copied()) {
                Ok(distribution) => distribution.sample(&mut self.rng),
                // degenerate belief, should have been reset on update
                Err(_) => 0,
            };
            assignment.insert(agent, hypothesis);
        }
        assignment
    }

    /// Update every other agent's posterior from the observed transition
    /// `previous → current`.
    ///
    /// For each hypothesis the likelihood of the agent's observed action
    /// is evaluated in the previous state, appended to a bounded history
    /// window, and blended with the uniform prior according to the
    /// configured posterior type.
    pub fn belief_update<S: Domain>(&mut self, previous: &S, current: &S) {
        for agent in 1..previous.num_agents() {
            let num_hypotheses = previous.num_hypotheses(agent);
            if num_hypotheses == 0 {
                continue;
            }
            let observed = current.last_action(agent);
            let likelihoods: Vec<Probability> = (0..num_hypotheses)
                .map(|hypothesis| previous.hypothesis_probability(hypothesis, agent, observed))
                .collect();

            let history = self.likelihood_history.entry(agent).or_default();
            history.push_back(likelihoods);
            while history.len() > self.history_length {
                history.pop_front();
            }

            let prior = 1.0 / num_hypotheses as f64;
            let mut posterior: Vec<Probability> = (0..num_hypotheses)
                .map(|hypothesis| {
                    let blended = match self.posterior_type {
                        PosteriorType::Product => history
                            .iter()
                            .map(|likelihoods| likelihoods[hypothesis])
                            .product::<f64>(),
                        PosteriorType::Sum => {
                            history
                                .iter()
                                .map(|likelihoods| likelihoods[hypothesis])
                                .sum::<f64>()
                                / history.len() as f64
                        }
                    };
                    prior * blended
                })
                .collect();

            let total: f64 = posterior.iter().sum();
            if total > 0.0 {
                for p in &mut posterior {
                    *p /= total;
                }
            } else {
                // no hypothesis explains the history, reset to the prior
                posterior = vec![prior; num_hypotheses];
            }
            trace!(agent, observed, belief = ?posterior, "belief update");
            self.beliefs.insert(agent, posterior);
        }
    }

    /// Snapshot of the per-agent beliefs for external logging.
    pub fn beliefs(&self) -> &BTreeMap<AgentIdx, Vec<Probability>> {
        &self.beliefs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccmcts_core::{ActionIdx, Cost, HypothesisId, JointAction, Reward};
    use rand::RngCore;

    // Two hypotheses: hypothesis 0 always plays action 0, hypothesis 1
    // always plays action 1. The observed action is fixed per state.
    #[derive(Clone)]
    struct TwoHypothesisDomain {
        observed_action: ActionIdx,
    }

    impl Domain for TwoHypothesisDomain {
        fn num_agents(&self) -> usize {
            2
        }
        fn num_actions(&self, _agent: AgentIdx) -> usize {
            2
        }
        fn execute(
            &self,
            joint_action: &JointAction,
            _rng: &mut dyn RngCore,
        ) -> (Self, Vec<Reward>, Cost) {
            (
                Self {
                    observed_action: joint_action.get(1),
                },
                vec![0.0, 0.0],
                0.0,
            )
        }
        fn is_terminal(&self) -> bool {
            false
        }
        fn plan_action(
            &self,
            _agent: AgentIdx,
            hypothesis: HypothesisId,
            _rng: &mut dyn RngCore,
        ) -> ActionIdx {
            hypothesis
        }
        fn hypothesis_probability(
            &self,
            hypothesis: HypothesisId,
            _agent: AgentIdx,
            action: ActionIdx,
        ) -> f64 {
            if hypothesis == action {
                0.9
            } else {
                0.1
            }
        }
        fn num_hypotheses(&self, _agent: AgentIdx) -> usize {
            2
        }
        fn last_action(&self, _agent: AgentIdx) -> ActionIdx {
            self.observed_action
        }
    }

    fn tracker(posterior_type: PosteriorType) -> HypothesisBeliefTracker {
        HypothesisBeliefTracker::new(&BeliefTrackerParameters {
            history_length: 4,
            posterior_type,
            random_seed_hypothesis_sampling: 2000,
        })
    }

    #[test]
    fn test_posterior_moves_toward_explaining_hypothesis() {
        let mut tracker = tracker(PosteriorType::Product);
        let previous = TwoHypothesisDomain { observed_action: 0 };
        let current = TwoHypothesisDomain { observed_action: 1 };

        tracker.belief_update(&previous, &current);
        let first = tracker.beliefs()[&1].clone();
        assert!(first[1] > first[0]);

        tracker.belief_update(&previous, &current);
        let second = tracker.beliefs()[&1].clone();
        // repeated consistent evidence sharpens the posterior
        assert!(second[1] > first[1]);
        assert!(second[0] < first[0]);
    }

    #[test]
    fn test_posterior_normalizes() {
        for posterior_type in [PosteriorType::Product, PosteriorType::Sum] {
            let mut tracker = tracker(posterior_type);
            let previous = TwoHypothesisDomain { observed_action: 0 };
            let current = TwoHypothesisDomain { observed_action: 1 };
            for _ in 0..6 {
                tracker.belief_update(&previous, &current);
            }
            let sum: f64 = tracker.beliefs()[&1].iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_sampling_follows_sharp_belief() {
        let mut tracker = tracker(PosteriorType::Product);
        let previous = TwoHypothesisDomain { observed_action: 0 };
        let current = TwoHypothesisDomain { observed_action: 1 };
        for _ in 0..4 {
            tracker.belief_update(&previous, &current);
        }
        // belief on hypothesis 1 is (0.9/0.1)^4 : 1, sampling almost
        // surely returns it; check a majority over a few draws
        let hits = (0..20)
            .filter(|_| tracker.sample_current_hypothesis()[&1] == 1)
            .count();
        assert!(hits >= 15);
    }

    #[test]
    fn test_sample_empty_without_updates() {
        let mut tracker = tracker(PosteriorType::Product);
        assert!(tracker.sample_current_hypothesis().is_empty());
    }

    #[test]
    fn test_initialize_sets_uniform_prior() {
        let mut tracker = tracker(PosteriorType::Product);
        tracker.initialize(&TwoHypothesisDomain { observed_action: 0 });
        assert_eq!(tracker.beliefs()[&1], vec![0.5, 0.5]);
        // sampling draws from the uniform prior without an update
        let assignment = tracker.sample_current_hypothesis();
        assert!(assignment[&1] < 2);
    }
}
