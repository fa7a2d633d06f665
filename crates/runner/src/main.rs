//! Episode harness for the cost-constrained planner.
//!
//! Runs batches of crossing episodes against configurable true opponent
//! policies, prints summary statistics, and optionally saves the full
//! per-episode records as JSON for offline analysis.

use anyhow::{Context, Result};
use ccmcts::MctsParameters;
use ccmcts_crossing::{
    CrossingParameters, CrossingState, DesiredGapPolicy, EpisodeOutcome, EpisodeRunner,
};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Cost-constrained crossing episode runner.
#[derive(Parser)]
#[command(name = "ccmcts-runner")]
#[command(about = "Run crossing episodes with the cost-constrained MCTS planner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch of episodes.
    Run {
        /// Number of episodes.
        #[arg(short, long, default_value = "10")]
        episodes: usize,

        /// Step limit per episode.
        #[arg(long, default_value = "60")]
        max_steps: usize,

        /// MCTS iterations per planning call.
        #[arg(short, long, default_value = "1000")]
        iterations: usize,

        /// Wall-clock budget per planning call, in milliseconds.
        #[arg(long, default_value = "1000")]
        search_time_ms: u64,

        /// Base random seed; episode i runs with seed + 1000·i.
        #[arg(long, default_value = "1000")]
        seed: u64,

        /// Upper bound on expected cumulative ego cost.
        #[arg(long, default_value = "0.1")]
        cost_constraint: f64,

        /// Index of the candidate policy the other agent truly follows.
        #[arg(long, default_value = "1")]
        true_hypothesis: usize,

        /// Save the per-episode records to this JSON file.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Record belief snapshots in the saved episodes.
        #[arg(long)]
        save_beliefs: bool,
    },
}

/// Candidate opponent policies the planner reasons over. The true
/// policy of each episode is drawn from the same set.
fn candidate_policies() -> Vec<DesiredGapPolicy> {
    vec![DesiredGapPolicy::new(1, 3), DesiredGapPolicy::new(4, 6)]
}

fn episode_parameters(
    seed: u64,
    iterations: usize,
    search_time_ms: u64,
    cost_constraint: f64,
) -> MctsParameters {
    let mut params = MctsParameters::with_iterations(iterations);
    params.max_search_time = Duration::from_millis(search_time_ms);
    params.random_seed = seed;
    params.discount_factor = 0.9;
    params.cost_constrained.lambda = 1.0;
    params.cost_constrained.kappa = 10.0;
    params.cost_constrained.cost_constraint = cost_constraint;
    params.cost_constrained.cost_lower_bound = 0.0;
    params.cost_constrained.cost_upper_bound = 1.0;
    params.cost_constrained.reward_lower_bound = -1000.0;
    params.cost_constrained.reward_upper_bound = 100.0;
    params.belief_tracker.history_length = 20;
    params.belief_tracker.random_seed_hypothesis_sampling = seed.wrapping_add(7);
    params
}

/// One episode's record as written to the output file.
#[derive(Serialize)]
struct EpisodeRecord {
    seed: u64,
    true_hypothesis: usize,
    outcome: EpisodeOutcome,
}

fn run_episode(
    seed: u64,
    max_steps: usize,
    iterations: usize,
    search_time_ms: u64,
    cost_constraint: f64,
    true_hypothesis: usize,
    save_beliefs: bool,
) -> Result<EpisodeRecord> {
    let hypotheses = candidate_policies();
    let true_policy = hypotheses[true_hypothesis];
    let state = CrossingState::new(CrossingParameters::default(), hypotheses, 1);
    let parameters = episode_parameters(seed, iterations, search_time_ms, cost_constraint);
    let mut runner = EpisodeRunner::new(state, vec![true_policy], parameters, max_steps)
        .context("failed to construct the episode runner")?;
    let outcome = runner.run(save_beliefs).context("episode failed")?;
    Ok(EpisodeRecord {
        seed,
        true_hypothesis,
        outcome,
    })
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    episodes: usize,
    max_steps: usize,
    iterations: usize,
    search_time_ms: u64,
    seed: u64,
    cost_constraint: f64,
    true_hypothesis: usize,
    output: Option<PathBuf>,
    save_beliefs: bool,
) -> Result<()> {
    anyhow::ensure!(
        true_hypothesis < candidate_policies().len(),
        "true hypothesis index {} out of range",
        true_hypothesis
    );

    println!(
        "Running {} episodes ({} iterations/plan, cost constraint {})",
        episodes, iterations, cost_constraint
    );
    let start = Instant::now();

    let records: Vec<EpisodeRecord> = (0..episodes)
        .into_par_iter()
        .map(|i| {
            let episode_seed = seed.wrapping_add(i as u64 * 1000);
            run_episode(
                episode_seed,
                max_steps,
                iterations,
                search_time_ms,
                cost_constraint,
                true_hypothesis,
                save_beliefs,
            )
        })
        .collect::<Result<_>>()?;

    let elapsed = start.elapsed();
    let collisions = records
        .iter()
        .filter(|r| r.outcome.last_step.collision)
        .count();
    let goals = records
        .iter()
        .filter(|r| r.outcome.last_step.goal_reached)
        .count();
    let timeouts = records.iter().filter(|r| r.outcome.max_steps_reached).count();
    let avg_steps = records.iter().map(|r| r.outcome.num_steps).sum::<usize>() as f64
        / records.len().max(1) as f64;

    println!("\nCompleted in {:.2}s", elapsed.as_secs_f64());
    println!(
        "Goals: {}/{} ({:.1}%)",
        goals,
        episodes,
        100.0 * goals as f64 / episodes.max(1) as f64
    );
    println!(
        "Collisions: {}/{} ({:.1}%)",
        collisions,
        episodes,
        100.0 * collisions as f64 / episodes.max(1) as f64
    );
    println!("Step-limit timeouts: {}", timeouts);
    println!("Average episode length: {:.1} steps", avg_steps);

    if let Some(path) = output {
        let file = File::create(&path)
            .with_context(|| format!("failed to create output file {:?}", path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &records)
            .context("failed to serialize episode records")?;
        println!("Records saved to {:?}", path);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            episodes,
            max_steps,
            iterations,
            search_time_ms,
            seed,
            cost_constraint,
            true_hypothesis,
            output,
            save_beliefs,
        } => cmd_run(
            episodes,
            max_steps,
            iterations,
            search_time_ms,
            seed,
            cost_constraint,
            true_hypothesis,
            output,
            save_beliefs,
        ),
    }
}
