use std::{fs, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use burn::{backend::Autodiff, config::Config};
use clap::{Args, Parser, Subcommand};
use log::info;
use lunar_ac::{
    algo::actor_critic::ActorCriticConfig,
    checkpoint::{Checkpointer, NetworkSpec},
    env::DiscreteActionSpace,
    eval::{evaluate, load_policy},
    gym::{lunar_lander::STATE_DIM, LunarLander, SimulatorCommand},
    plot::{plot_reward_histogram, plot_training_curve},
    runner::MAX_EPISODE_STEPS,
    train::{train, TrainingConfig},
};
use once_cell::sync::Lazy;

#[cfg(not(feature = "wgpu"))]
mod backend {
    pub use burn::backend::ndarray::{NdArray as Inner, NdArrayDevice as Device};
}

#[cfg(feature = "wgpu")]
mod backend {
    pub use burn::backend::wgpu::{Wgpu as Inner, WgpuDevice as Device};
}

type LanderBackend = Autodiff<backend::Inner>;

static DEVICE: Lazy<backend::Device> = Lazy::new(backend::Device::default);

const DEFAULT_SIMULATOR: &str = "python3 scripts/gym_bridge.py LunarLander-v3";

#[derive(Parser, Debug)]
#[command(version, about = "One-step actor-critic agent for LunarLander")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Train a new agent, checkpointing whenever the rolling average improves
    Train(TrainArgs),
    /// Run a checkpointed agent without learning and report its rewards
    Evaluate(EvalArgs),
    /// Write the default training configuration as JSON
    Config {
        #[arg(long, default_value = "training.json")]
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct SimulatorArgs {
    /// Command that starts the simulator bridge
    #[arg(long, default_value = DEFAULT_SIMULATOR)]
    simulator: String,
    /// Open a window and render every step
    #[arg(long)]
    render: bool,
    #[arg(long)]
    seed: Option<u64>,
}

impl SimulatorArgs {
    fn command(&self) -> Result<SimulatorCommand> {
        let mut command = SimulatorCommand::parse(&self.simulator)?;
        if self.render {
            command.args.push("--render".to_string());
        }
        Ok(command)
    }
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Training configuration (JSON); defaults are used when absent
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the episode budget
    #[arg(long)]
    episodes: Option<usize>,
    #[arg(long, default_value = "checkpoints")]
    checkpoint_dir: PathBuf,
    #[command(flatten)]
    sim: SimulatorArgs,
}

#[derive(Args, Debug)]
struct EvalArgs {
    #[arg(long, default_value = "checkpoints")]
    checkpoint_dir: PathBuf,
    #[arg(long, default_value_t = 100)]
    episodes: usize,
    #[arg(long, default_value_t = MAX_EPISODE_STEPS)]
    max_steps: usize,
    #[arg(long, default_value_t = 200.0)]
    solved_threshold: f32,
    /// Where to write the reward histogram (SVG)
    #[arg(long, default_value = "evaluation.svg")]
    histogram: PathBuf,
    #[arg(long, default_value_t = 30)]
    bins: usize,
    #[command(flatten)]
    sim: SimulatorArgs,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Cmd::Train(args) => run_training(args),
        Cmd::Evaluate(args) => run_evaluation(args),
        Cmd::Config { output } => {
            default_config()
                .save(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            info!("default configuration written to {}", output.display());
            Ok(())
        }
    }
}

fn default_config() -> TrainingConfig {
    TrainingConfig::new(ActorCriticConfig::new())
}

fn run_training(args: TrainArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => TrainingConfig::load(path)
            .map_err(|e| anyhow!("cannot load {}: {e:?}", path.display()))?,
        None => default_config(),
    };
    if let Some(episodes) = args.episodes {
        config.max_episodes = episodes;
    }
    if args.sim.seed.is_some() {
        config.agent.seed = args.sim.seed;
    }
    config.render |= args.sim.render;

    let mut env = LunarLander::new(&args.sim.command()?, config.agent.seed)?;
    let num_actions = env.num_actions();
    let mut agent = config.agent.init::<LanderBackend>(STATE_DIM, num_actions, &*DEVICE);

    let spec = NetworkSpec {
        actor: config.agent.actor_config(STATE_DIM, num_actions),
        critic: config.agent.critic_config(STATE_DIM),
    };
    let mut checkpointer = Checkpointer::new(&args.checkpoint_dir, spec)?;
    config.save(args.checkpoint_dir.join("training.json"))?;

    info!("training for up to {} episodes", config.max_episodes);
    let summary = train(&mut agent, &mut env, &config, &mut checkpointer)?;

    let summary_path = args.checkpoint_dir.join("summary.json");
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;

    let curve_path = args.checkpoint_dir.join("training.svg");
    plot_training_curve(
        &curve_path,
        summary.history.rewards(),
        &summary.history.rolling_series(),
        config.solved_threshold,
    )?;

    match summary.best_checkpoint {
        Some(best) => info!(
            "best rolling average {:.2} after episode {}, saved in {}",
            best.rolling_average,
            best.episode + 1,
            args.checkpoint_dir.display()
        ),
        None => info!("no checkpoint written: fewer than {} episodes", config.rolling_window),
    }
    info!(
        "summary written to {}, curve to {}",
        summary_path.display(),
        curve_path.display()
    );
    Ok(())
}

fn run_evaluation(args: EvalArgs) -> Result<()> {
    let (mut policy, _) = load_policy::<backend::Inner>(&args.checkpoint_dir, args.sim.seed, &*DEVICE)?;
    let mut env = LunarLander::new(&args.sim.command()?, args.sim.seed)?;

    let report = evaluate(
        &mut env,
        &mut policy,
        args.episodes,
        args.max_steps,
        args.sim.render,
        args.solved_threshold,
    )?;

    let report_path = args.histogram.with_extension("json");
    fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;
    plot_reward_histogram(&args.histogram, &report.rewards, args.bins)?;

    info!(
        "rewards written to {}, histogram to {}",
        report_path.display(),
        args.histogram.display()
    );
    Ok(())
}
