//! The training loop: run an episode, learn from it, track the rolling
//! average, checkpoint on improvement, stop once solved or out of budget.

use burn::{prelude::*, tensor::backend::AutodiffBackend};
use log::{info, warn};
use serde::Serialize;

use crate::{
    algo::actor_critic::{ActorCriticAgent, ActorCriticConfig, ActorModel, CriticModel},
    checkpoint::{CheckpointInfo, Checkpointer},
    env::Environment,
    error,
    history::RewardHistory,
    runner::run_episode,
    traits::ToTensor,
};

/// Everything that shapes a training run
#[derive(Config, Debug)]
pub struct TrainingConfig {
    /// Agent hyperparameters
    pub agent: ActorCriticConfig,
    /// Episode budget
    #[config(default = 2000)]
    pub max_episodes: usize,
    /// Hard cap on steps per episode
    #[config(default = 1000)]
    pub max_steps: usize,
    /// Episodes in the rolling average
    #[config(default = 100)]
    pub rolling_window: usize,
    /// Rolling average above which the task counts as solved
    #[config(default = 200.0)]
    pub solved_threshold: f32,
    /// Shuffle an episode's transitions before replaying them
    #[config(default = "true")]
    pub shuffle: bool,
    /// Gate checkpoints on the window that precedes the latest episode instead
    /// of the trailing window. Only kept to reproduce older runs.
    #[config(default = "false")]
    pub lagged_checkpoint_window: bool,
    /// Log progress every n episodes
    #[config(default = 10)]
    pub log_interval: usize,
    /// Render every step
    #[config(default = "false")]
    pub render: bool,
}

/// Why training stopped
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrainingOutcome {
    /// The rolling average exceeded the solved threshold after `episode`
    Solved { episode: usize, rolling_average: f32 },
    BudgetExhausted,
}

/// Result of a training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub episodes: usize,
    pub outcome: TrainingOutcome,
    pub best_checkpoint: Option<CheckpointInfo>,
    pub history: RewardHistory,
}

impl TrainingSummary {
    pub fn solved(&self) -> bool {
        matches!(self.outcome, TrainingOutcome::Solved { .. })
    }
}

/// Train `agent` on `env` until solved or until the episode budget runs out
pub fn train<B, Actor, Critic, E>(
    agent: &mut ActorCriticAgent<B, Actor, Critic>,
    env: &mut E,
    config: &TrainingConfig,
    checkpointer: &mut Checkpointer,
) -> error::Result<TrainingSummary>
where
    B: AutodiffBackend,
    Actor: ActorModel<B>,
    Critic: CriticModel<B>,
    E: Environment,
    Vec<E::State>: ToTensor<B, 2, Float>,
{
    if config.lagged_checkpoint_window {
        warn!(
            "checkpoints are gated on the {} episodes before the latest one, not the trailing window",
            config.rolling_window
        );
    }

    let log_interval = config.log_interval.max(1);
    let mut history = RewardHistory::new(config.rolling_window);
    let mut outcome = TrainingOutcome::BudgetExhausted;

    for episode in 0..config.max_episodes {
        let record = run_episode(env, agent, config.max_steps, config.render)?;
        let steps = record.steps();
        let reward = record.total_reward;
        let truncated = record.truncated;

        let metrics = agent.train_episode(record.transitions, config.shuffle)?;
        history.push(reward);

        let checkpoint_average = if config.lagged_checkpoint_window {
            history.lagged_rolling_average()
        } else {
            history.rolling_average()
        };
        checkpointer.consider::<B, _, _>(episode, checkpoint_average, agent.actor(), agent.critic())?;

        let rolling_average = history.rolling_average();

        if (episode + 1) % log_interval == 0 {
            info!(
                "Episode {} | Reward: {:.2} | Steps: {}{} | Rolling: {} | Actor loss: {:.4} | Critic loss: {:.4}",
                episode + 1,
                reward,
                steps,
                if truncated { " (capped)" } else { "" },
                rolling_average.map_or_else(|| "-".to_string(), |avg| format!("{avg:.2}")),
                metrics.mean_actor_loss,
                metrics.mean_critic_loss,
            );
        }

        if let Some(avg) = rolling_average {
            if avg > config.solved_threshold {
                info!(
                    "solved after {} episodes: rolling average {:.2} > {:.2}",
                    episode + 1,
                    avg,
                    config.solved_threshold
                );
                outcome = TrainingOutcome::Solved {
                    episode,
                    rolling_average: avg,
                };
                break;
            }
        }
    }

    if outcome == TrainingOutcome::BudgetExhausted {
        info!("episode budget of {} exhausted", config.max_episodes);
    }

    Ok(TrainingSummary {
        episodes: history.len(),
        outcome,
        best_checkpoint: checkpointer.best(),
        history,
    })
}
