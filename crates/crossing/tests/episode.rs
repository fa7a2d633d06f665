//! End-to-end episodes on the crossing environment.

use ccmcts::MctsParameters;
use ccmcts_crossing::{
    AgentState, CrossingParameters, CrossingState, DesiredGapPolicy, EpisodeRunner,
};
use std::time::Duration;

fn episode_parameters(seed: u64) -> MctsParameters {
    let mut params = MctsParameters::with_iterations(400);
    params.max_search_time = Duration::from_secs(3600);
    params.random_seed = seed;
    params.discount_factor = 0.9;
    params.cost_constrained.lambda = 1.0;
    params.cost_constrained.kappa = 10.0;
    params.cost_constrained.cost_constraint = 0.1;
    params.cost_constrained.cost_lower_bound = 0.0;
    params.cost_constrained.cost_upper_bound = 1.0;
    params.cost_constrained.reward_lower_bound = -1000.0;
    params.cost_constrained.reward_upper_bound = 100.0;
    params.belief_tracker.history_length = 40;
    params.belief_tracker.random_seed_hypothesis_sampling = seed.wrapping_add(7);
    params
}

fn small_crossing() -> CrossingParameters {
    CrossingParameters {
        state_length: 13,
        ego_goal_position: 8,
    }
}

#[test]
fn episode_terminates_within_step_limit() {
    let hypotheses = vec![DesiredGapPolicy::new(1, 2), DesiredGapPolicy::new(4, 5)];
    let state = CrossingState::new(small_crossing(), hypotheses, 1);
    let true_policy = DesiredGapPolicy::new(4, 5);
    let mut runner =
        EpisodeRunner::new(state, vec![true_policy], episode_parameters(1000), 40).unwrap();

    let outcome = runner.run(false).unwrap();
    assert!(outcome.num_steps <= 40);
    assert!(outcome.last_step.terminal || outcome.max_steps_reached);
}

#[test]
fn belief_converges_to_the_true_hypothesis() {
    // the two candidate gap policies produce disjoint actions at most
    // distances, so observed actions identify the true one quickly
    let hypotheses = vec![DesiredGapPolicy::new(1, 1), DesiredGapPolicy::new(5, 5)];
    let parameters = small_crossing();
    // start the other agent behind the ego so the gap matters
    let state = CrossingState::with_agents(
        parameters,
        hypotheses,
        AgentState {
            position: 3,
            last_action: None,
        },
        vec![AgentState {
            position: 0,
            last_action: None,
        }],
    );
    let true_policy = DesiredGapPolicy::new(5, 5);
    let mut runner =
        EpisodeRunner::new(state, vec![true_policy], episode_parameters(1000), 40).unwrap();

    let outcome = runner.run(true).unwrap();
    let final_beliefs = outcome
        .beliefs
        .last()
        .expect("episode recorded no belief snapshots");
    let belief = &final_beliefs[&1];
    assert!(
        belief[1] > 0.9,
        "belief on the true hypothesis stayed at {:?}",
        belief
    );
}

#[test]
fn terminal_episode_reports_immediately() {
    let hypotheses = vec![DesiredGapPolicy::new(1, 2)];
    let parameters = small_crossing();
    // ego already at the goal: first step terminates the episode
    let state = CrossingState::with_agents(
        parameters,
        hypotheses,
        AgentState {
            position: parameters.ego_goal_position,
            last_action: None,
        },
        vec![AgentState::default()],
    );
    let true_policy = DesiredGapPolicy::new(1, 2);
    let mut runner =
        EpisodeRunner::new(state, vec![true_policy], episode_parameters(1000), 10).unwrap();

    let outcome = runner.run(false).unwrap();
    assert_eq!(outcome.num_steps, 0);
    assert!(outcome.last_step.terminal);
    assert!(outcome.last_step.goal_reached);
}
