//! Evaluation of trained networks: no updates, only sampled actions.
//!
//! The actor runs on a plain (non-autodiff) backend, so no gradient graph is
//! recorded while evaluating.

use std::path::Path;

use burn::{prelude::*, tensor::activation::softmax};
use log::info;
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;

use crate::{
    algo::sampler::sample_action,
    checkpoint::{load_checkpoint, CheckpointInfo},
    env::Environment,
    error::{Error, Result},
    nn::MLP,
    runner::{run_episode, Policy},
    traits::ToTensor,
};

/// A frozen actor that samples actions from π(·|s)
pub struct ActorPolicy<B: Backend> {
    actor: MLP<B>,
    device: B::Device,
    rng: StdRng,
}

impl<B: Backend> ActorPolicy<B> {
    /// Wrap an actor network; `seed` drives action sampling, entropy when absent
    pub fn new(actor: MLP<B>, seed: Option<u64>, device: &B::Device) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            actor,
            device: device.clone(),
            rng,
        }
    }

    pub fn action_probabilities<S>(&self, state: &S) -> Result<Vec<f32>>
    where
        S: Clone,
        Vec<S>: ToTensor<B, 2, Float>,
    {
        let state: Tensor<B, 2> = vec![state.clone()].to_tensor(&self.device);
        softmax(self.actor.forward(state), 1)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| Error::Tensor(format!("{e:?}")))
    }
}

impl<B, S> Policy<S> for ActorPolicy<B>
where
    B: Backend,
    S: Clone,
    Vec<S>: ToTensor<B, 2, Float>,
{
    fn act(&mut self, state: &S) -> Result<usize> {
        let probs = self.action_probabilities(state)?;
        Ok(sample_action(&probs, &mut self.rng))
    }
}

/// Per-episode rewards of an evaluation run and their summary statistics
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub rewards: Vec<f32>,
    pub steps: Vec<usize>,
    pub mean: f32,
    pub std: f32,
    pub min: f32,
    pub max: f32,
    /// Fraction of episodes whose reward reached the solved threshold
    pub solved_fraction: f32,
}

impl EvaluationReport {
    pub fn new(rewards: Vec<f32>, steps: Vec<usize>, solved_threshold: f32) -> Self {
        let n = rewards.len().max(1) as f32;
        let mean = rewards.iter().sum::<f32>() / n;
        let variance = rewards.iter().map(|r| (r - mean).powi(2)).sum::<f32>() / n;
        let min = rewards.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = rewards.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let solved = rewards.iter().filter(|r| **r >= solved_threshold).count();

        Self {
            mean,
            std: variance.sqrt(),
            min: if rewards.is_empty() { 0.0 } else { min },
            max: if rewards.is_empty() { 0.0 } else { max },
            solved_fraction: solved as f32 / n,
            rewards,
            steps,
        }
    }
}

/// Run `episodes` episodes with `policy` and collect their rewards
pub fn evaluate<E, P>(
    env: &mut E,
    policy: &mut P,
    episodes: usize,
    max_steps: usize,
    render: bool,
    solved_threshold: f32,
) -> Result<EvaluationReport>
where
    E: Environment,
    P: Policy<E::State>,
{
    let mut rewards = Vec::with_capacity(episodes);
    let mut steps = Vec::with_capacity(episodes);

    for episode in 0..episodes {
        let record = run_episode(env, policy, max_steps, render)?;
        info!(
            "Evaluation episode {}/{} | Reward: {:.2} | Steps: {}",
            episode + 1,
            episodes,
            record.total_reward,
            record.steps()
        );
        rewards.push(record.total_reward);
        steps.push(record.steps());
    }

    let report = EvaluationReport::new(rewards, steps, solved_threshold);
    info!(
        "evaluation: mean {:.2} ± {:.2} | min {:.2} | max {:.2} | solved {:.0}%",
        report.mean,
        report.std,
        report.min,
        report.max,
        report.solved_fraction * 100.0
    );
    Ok(report)
}

/// Restore the actor of a checkpoint as an evaluation policy
pub fn load_policy<B: Backend>(
    dir: &Path,
    seed: Option<u64>,
    device: &B::Device,
) -> Result<(ActorPolicy<B>, CheckpointInfo)> {
    let checkpoint = load_checkpoint::<B>(dir, device)?;
    info!(
        "loaded checkpoint from episode {} (rolling average {:.2})",
        checkpoint.info.episode + 1,
        checkpoint.info.rolling_average
    );

    Ok((ActorPolicy::new(checkpoint.actor, seed, device), checkpoint.info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        algo::actor_critic::ActorCriticConfig,
        checkpoint::{Checkpointer, NetworkSpec},
        env::Step,
        error::Error,
        runner::tests::FixedPolicy,
    };
    use burn::{
        backend::{
            ndarray::{NdArray, NdArrayDevice},
            Autodiff,
        },
        module::AutodiffModule,
    };

    type TestBackend = Autodiff<NdArray>;

    /// Episode `i` lasts `i + 1` steps with reward 10 each
    struct GrowingEnv {
        episode: usize,
        t: usize,
    }

    impl Environment for GrowingEnv {
        type State = [f32; 8];
        type Action = usize;

        fn reset(&mut self) -> Result<Self::State> {
            self.episode += 1;
            self.t = 0;
            Ok([0.0; 8])
        }

        fn step(&mut self, _action: usize) -> Result<Step<Self::State>> {
            self.t += 1;
            Ok(Step {
                state: [self.t as f32; 8],
                reward: 10.0,
                done: self.t >= self.episode,
            })
        }
    }

    #[test]
    fn test_report_statistics() {
        let report = EvaluationReport::new(vec![100.0, 200.0, 300.0, 240.0], vec![1, 2, 3, 4], 200.0);

        assert_eq!(report.mean, 210.0);
        assert_eq!(report.min, 100.0);
        assert_eq!(report.max, 300.0);
        assert_eq!(report.solved_fraction, 0.75);
        assert!((report.std - 72.8011).abs() < 1e-3);
    }

    #[test]
    fn test_empty_report() {
        let report = EvaluationReport::new(vec![], vec![], 200.0);
        assert_eq!(report.mean, 0.0);
        assert_eq!(report.min, 0.0);
        assert_eq!(report.solved_fraction, 0.0);
    }

    #[test]
    fn test_evaluate_collects_every_episode() {
        let mut env = GrowingEnv { episode: 0, t: 0 };
        let report = evaluate(&mut env, &mut FixedPolicy(0), 4, 1000, false, 200.0).unwrap();

        assert_eq!(report.rewards, vec![10.0, 20.0, 30.0, 40.0]);
        assert_eq!(report.steps, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_evaluate_respects_step_cap() {
        let mut env = GrowingEnv { episode: 0, t: 0 };
        let report = evaluate(&mut env, &mut FixedPolicy(0), 5, 3, false, 200.0).unwrap();
        assert!(report.steps.iter().all(|s| *s <= 3));
    }

    #[test]
    fn test_loaded_policy_matches_trained_actor() {
        let dir = tempfile::tempdir().unwrap();
        let device = NdArrayDevice::default();
        let config = ActorCriticConfig::new().with_hidden_layers(vec![8]).with_seed(Some(1));

        let mut trained = config.init::<TestBackend>(8, 4, &device);
        trained
            .train_transition(&crate::runner::Transition {
                state: [0.1; 8],
                action: 2,
                reward: 5.0,
                next_state: [0.2; 8],
                done: true,
            })
            .unwrap();

        let spec = NetworkSpec {
            actor: config.actor_config(8, 4),
            critic: config.critic_config(8),
        };
        let mut checkpointer = Checkpointer::new(dir.path(), spec).unwrap();
        checkpointer
            .consider::<TestBackend, _, _>(100, Some(50.0), trained.actor(), trained.critic())
            .unwrap();

        let (mut policy, info) = load_policy::<NdArray>(dir.path(), Some(3), &device).unwrap();
        assert_eq!(info.rolling_average, 50.0);

        let probe = [0.3_f32; 8];
        let loaded = policy.action_probabilities(&probe).unwrap();
        let expected = trained.action_probabilities(&probe).unwrap();
        assert_eq!(loaded.len(), 4);
        for (a, b) in loaded.iter().zip(&expected) {
            assert!((a - b).abs() < 1e-6);
        }

        let mut env = GrowingEnv { episode: 0, t: 0 };
        let report = evaluate(&mut env, &mut policy, 3, 1000, false, 200.0).unwrap();
        assert_eq!(report.rewards.len(), 3);
        assert_eq!(policy.action_probabilities(&probe).unwrap(), loaded);
    }

    #[test]
    fn test_policy_from_live_actor() {
        let device = NdArrayDevice::default();
        let agent = ActorCriticConfig::new()
            .with_hidden_layers(vec![8])
            .init::<TestBackend>(8, 4, &device);

        let mut policy = ActorPolicy::new(agent.actor().valid(), Some(5), &device);
        let state = [0.5_f32; 8];
        let probs = policy.action_probabilities(&state).unwrap();
        let expected = agent.action_probabilities(&state).unwrap();
        for (a, b) in probs.iter().zip(&expected) {
            assert!((a - b).abs() < 1e-6);
        }
        assert!(policy.act(&state).unwrap() < 4);
    }

    #[test]
    fn test_missing_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_policy::<NdArray>(dir.path(), None, &NdArrayDevice::default());
        assert!(matches!(result, Err(Error::MissingCheckpoint(_))));
    }
}
