//! Episode runner for MCTS planning in grid worlds.
//!
//! Plays whole episodes by searching before every step and reports returns,
//! episode lengths and how often the goal was reached. Episodes can be saved
//! as JSON records for later analysis.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use mdp_core::Environment;
use mdp_gridworld::{Cell, GridWorld, LineWorld, Move};
use mdp_mcts::{Mcts, MctsConfig, RolloutEvaluator};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

/// Reward for reaching the end of a line world.
const LINE_GOAL_REWARD: f64 = 10.0;

/// MCTS planning in grid-world MDPs.
#[derive(Parser)]
#[command(name = "mdp-episode")]
#[command(about = "Run MCTS-driven episodes in grid-world environments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play episodes from the start cell until the goal or the step limit.
    Run {
        #[arg(short, long, value_enum, default_value = "classic")]
        world: World,

        /// Number of episodes to play.
        #[arg(short, long, default_value = "10")]
        episodes: usize,

        /// Maximum number of steps per episode.
        #[arg(long, default_value = "100")]
        max_steps: usize,

        /// Output directory for episode files.
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        search: SearchArgs,
    },

    /// Run one search from a given cell and print the root statistics.
    Plan {
        #[arg(short, long, value_enum, default_value = "classic")]
        world: World,

        #[arg(long, default_value = "0")]
        row: usize,

        #[arg(long, default_value = "0")]
        col: usize,

        /// Softmax temperature for the printed distribution.
        #[arg(short, long, default_value = "1.0")]
        temperature: f64,

        #[command(flatten)]
        search: SearchArgs,
    },
}

/// Search settings shared by every command.
#[derive(Args, Clone, Debug)]
struct SearchArgs {
    /// Number of MCTS iterations per step.
    #[arg(short, long, default_value = "1000")]
    iterations: usize,

    /// UCB1 exploration weight.
    #[arg(long, default_value = "1.0")]
    exploration: f64,

    /// Discount factor applied per step.
    #[arg(long, default_value = "0.9")]
    discount: f64,

    /// Maximum rollout depth.
    #[arg(long, default_value = "100")]
    horizon: usize,

    /// Number of cells in the line world.
    #[arg(long, default_value = "5")]
    line_cells: usize,

    /// Random seed for reproducibility.
    #[arg(long, default_value = "42")]
    seed: u64,
}

impl SearchArgs {
    fn config(&self) -> MctsConfig {
        MctsConfig::with_iterations(self.iterations)
            .exploration_weight(self.exploration)
            .discount_factor(self.discount)
            .rollout_horizon(self.horizon)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum World {
    /// 5x5 grid with two obstacles and a water cell.
    Classic,
    /// 5x5 cat world with monsters, a food goal and slippery moves.
    Cats,
    /// 4x12 cliff walk; falling off sends the agent back to start.
    Cliff,
    /// Deterministic corridor with the goal at the right end.
    Line,
}

/// A single step of an episode.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct EpisodeStep {
    state: Cell,
    action: Move,
    reward: f64,
    next_state: Cell,
}

/// A complete episode.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct EpisodeRecord {
    world: World,
    seed: u64,
    steps: Vec<EpisodeStep>,

    /// Sum of rewards, undiscounted.
    total_reward: f64,

    /// Sum of rewards discounted by the search's discount factor.
    discounted_return: f64,

    reached_goal: bool,
}

/// Aggregate statistics over many episodes.
#[derive(Debug, PartialEq)]
struct Summary {
    episodes: usize,
    mean_reward: f64,
    mean_length: f64,
    goal_rate: f64,
}

impl Summary {
    fn from_records(records: &[EpisodeRecord]) -> Self {
        let n = records.len().max(1) as f64;
        Self {
            episodes: records.len(),
            mean_reward: records.iter().map(|r| r.total_reward).sum::<f64>() / n,
            mean_length: records.iter().map(|r| r.steps.len()).sum::<usize>() as f64 / n,
            goal_rate: records.iter().filter(|r| r.reached_goal).count() as f64 / n,
        }
    }
}

/// Play one episode from the environment's start cell.
///
/// The transition RNG and the planner's RNG are seeded separately so the
/// dynamics do not depend on how many draws a search made.
fn play_episode<E>(
    mut env: E,
    world: World,
    config: &MctsConfig,
    seed: u64,
    max_steps: usize,
) -> Result<EpisodeRecord>
where
    E: Environment<State = Cell, Action = Move>,
{
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let planner_rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
    let mut mcts = Mcts::new(config.clone(), RolloutEvaluator::uniform(), planner_rng);

    let mut state = env.reset();
    let mut steps = Vec::new();
    let mut total_reward = 0.0;
    let mut discounted_return = 0.0;
    let mut discount = 1.0;
    let mut reached_goal = env.is_terminal(&state);

    while !reached_goal && steps.len() < max_steps {
        let Some(action) = mcts
            .select_action(&mut env, &state)
            .with_context(|| format!("search failed at {}", state))?
        else {
            break;
        };

        let transition = env
            .step(action, &mut rng)?
            .validated()
            .with_context(|| format!("bad transition from {} via {}", state, action))?;

        total_reward += transition.reward;
        discounted_return += discount * transition.reward;
        discount *= config.discount_factor;

        steps.push(EpisodeStep {
            state,
            action,
            reward: transition.reward,
            next_state: transition.state,
        });

        state = transition.state;
        reached_goal = transition.done || env.is_terminal(&state);
    }

    Ok(EpisodeRecord {
        world,
        seed,
        steps,
        total_reward,
        discounted_return,
        reached_goal,
    })
}

/// Play `episodes` episodes in parallel, one derived seed each.
fn play_episodes<E>(
    env: &E,
    world: World,
    config: &MctsConfig,
    episodes: usize,
    seed: u64,
    max_steps: usize,
) -> Result<Vec<EpisodeRecord>>
where
    E: Environment<State = Cell, Action = Move> + Clone + Sync,
{
    (0..episodes)
        .into_par_iter()
        .map(|i| {
            let episode_seed = seed.wrapping_add(i as u64 * 1000);
            play_episode(env.clone(), world, config, episode_seed, max_steps)
                .with_context(|| format!("episode {} failed", i))
        })
        .collect()
}

/// Save each episode to a separate JSON file.
fn save_episodes(records: &[EpisodeRecord], output: &PathBuf) -> Result<()> {
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory: {:?}", output))?;

    for (i, record) in records.iter().enumerate() {
        let filename = output.join(format!("episode_{:06}.json", i));
        let file =
            File::create(&filename).with_context(|| format!("Failed to create file: {:?}", filename))?;
        serde_json::to_writer_pretty(BufWriter::new(file), record)
            .with_context(|| format!("Failed to serialize episode {}", i))?;
    }
    Ok(())
}

/// Run the run command.
fn cmd_run(
    world: World,
    episodes: usize,
    max_steps: usize,
    output: Option<PathBuf>,
    search: SearchArgs,
) -> Result<()> {
    let config = search.config();
    config.validate().context("invalid search settings")?;

    println!(
        "Playing {} {:?} episodes with {} iterations/step",
        episodes, world, search.iterations
    );
    println!("Seed: {}", search.seed);

    let start = Instant::now();
    let records = match world {
        World::Classic => play_episodes(&GridWorld::classic(), world, &config, episodes, search.seed, max_steps),
        World::Cats => play_episodes(&GridWorld::cat_vs_monsters(), world, &config, episodes, search.seed, max_steps),
        World::Cliff => play_episodes(&GridWorld::cliff_walking(), world, &config, episodes, search.seed, max_steps),
        World::Line => play_episodes(
            &LineWorld::new(search.line_cells, LINE_GOAL_REWARD),
            world,
            &config,
            episodes,
            search.seed,
            max_steps,
        ),
    }?;

    let summary = Summary::from_records(&records);
    println!("\nCompleted in {:.2}s", start.elapsed().as_secs_f64());
    println!("Episodes: {}", summary.episodes);
    println!("Mean reward: {:.3}", summary.mean_reward);
    println!("Mean length: {:.1} steps", summary.mean_length);
    println!("Goal reached: {:.1}%", summary.goal_rate * 100.0);

    if let Some(output) = output {
        save_episodes(&records, &output)?;
        println!("Files saved to: {:?}", output);
    }

    Ok(())
}

/// Search once from `cell` and print every root child.
fn plan_from<E>(mut env: E, cell: Cell, config: &MctsConfig, temperature: f64, seed: u64) -> Result<()>
where
    E: Environment<State = Cell, Action = Move>,
{
    let mut mcts = Mcts::new(config.clone(), RolloutEvaluator::uniform(), ChaCha8Rng::seed_from_u64(seed));
    let result = mcts.search(&mut env, &cell)?;

    println!("Search from {}: {} iterations, {} nodes", cell, result.iterations, mcts.tree().len());
    println!("Root value: {:.4}", result.root_value);
    println!("================================================");
    for child in &result.children {
        println!("{:>6}  visits {:>7}  value {:>9.4}", child.action, child.visits, child.value);
    }

    if let Some(policy) = result.softmax(temperature)? {
        println!("\nSoftmax (temperature {}):", temperature);
        for (action, p) in policy.distribution.iter() {
            println!("{:>6}  {:.4}", action, p);
        }
        println!("Most likely: {}", policy.distribution.most_likely());
        println!("Best value: {:.4}", policy.best_value);
    }

    match result.best_action {
        Some(action) => println!("\nRecommended: {}", action),
        None => println!("\nNo actions available"),
    }
    Ok(())
}

/// Run the plan command.
fn cmd_plan(world: World, row: usize, col: usize, temperature: f64, search: SearchArgs) -> Result<()> {
    let config = search.config();
    config.validate().context("invalid search settings")?;
    let cell = Cell::new(row, col);

    match world {
        World::Line => {
            let env = LineWorld::new(search.line_cells, LINE_GOAL_REWARD);
            if row != 0 || col >= env.len() {
                bail!("cell {} is not on a line of {} cells", cell, env.len());
            }
            plan_from(env, cell, &config, temperature, search.seed)
        }
        grid => {
            let env = match grid {
                World::Cats => GridWorld::cat_vs_monsters(),
                World::Cliff => GridWorld::cliff_walking(),
                _ => GridWorld::classic(),
            };
            if !env.layout().is_open(cell) {
                bail!("cell {} is outside the {:?} grid or blocked", cell, world);
            }
            plan_from(env, cell, &config, temperature, search.seed)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            world,
            episodes,
            max_steps,
            output,
            search,
        } => cmd_run(world, episodes, max_steps, output, search),
        Commands::Plan {
            world,
            row,
            col,
            temperature,
            search,
        } => cmd_plan(world, row, col, temperature, search),
    }
}
