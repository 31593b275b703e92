//! One-step Actor-Critic with a TD(0) advantage
//!
//! The agent keeps two separate networks:
//! - **Actor network**: outputs action logits, turned into π(a|s) with a softmax
//! - **Critic network**: estimates the state value V(s)
//!
//! Learning is fully online. Every transition `(s, a, r, s', done)` produces
//! exactly one gradient step on each network:
//!
//! ```text
//! target    = r                    if done
//!           = r + γ·V(s')          otherwise
//! advantage = target - V(s)
//!
//! critic loss = (V(s) - target)²          (target held constant)
//! actor loss  = -advantage · log π(a|s)   (only the taken action's slot)
//! ```
//!
//! There is no batching, no n-step return and no entropy bonus, so updates are
//! noisy. The transitions of an episode can be shuffled before they are
//! replayed, which is the only decorrelation applied.
//!
//! # Usage
//!
//! ```rust,ignore
//! use burn::backend::{Autodiff, NdArray};
//! use lunar_ac::{algo::actor_critic::ActorCriticConfig, runner::run_episode};
//!
//! type Backend = Autodiff<NdArray>;
//!
//! let device = Default::default();
//! let mut agent = ActorCriticConfig::new().init::<Backend>(8, 4, &device);
//!
//! let episode = run_episode(&mut env, &mut agent, 1000, false)?;
//! let metrics = agent.train_episode(episode.transitions, true)?;
//! println!("advantage: {:.3}", metrics.mean_advantage);
//! ```
//!
//! Reference: Sutton & Barto, "Reinforcement Learning: An Introduction", §13.5

use burn::{
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{adaptor::OptimizerAdaptor, Adam, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{
        activation::{log_softmax, softmax},
        backend::AutodiffBackend,
    },
};
use log::debug;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Serialize;

use crate::{
    algo::sampler::sample_action,
    env::ensure_finite,
    error::{self, Error},
    nn::{MLPConfig, MLP},
    runner::{Policy, Transition},
    traits::ToTensor,
};

/// Actor model trait for discrete actions
///
/// `[batch, state_dim]` → `[batch, num_actions]` logits (pre-softmax)
pub trait ActorModel<B: AutodiffBackend>: AutodiffModule<B> {
    fn forward(&self, state: Tensor<B, 2>) -> Tensor<B, 2>;
}

/// Critic model trait
///
/// `[batch, state_dim]` → `[batch, 1]` state values
pub trait CriticModel<B: AutodiffBackend>: AutodiffModule<B> {
    fn forward(&self, state: Tensor<B, 2>) -> Tensor<B, 2>;
}

impl<B: AutodiffBackend> ActorModel<B> for MLP<B> {
    fn forward(&self, state: Tensor<B, 2>) -> Tensor<B, 2> {
        MLP::forward(self, state)
    }
}

impl<B: AutodiffBackend> CriticModel<B> for MLP<B> {
    fn forward(&self, state: Tensor<B, 2>) -> Tensor<B, 2> {
        MLP::forward(self, state)
    }
}

/// Hyperparameters of the [`ActorCriticAgent`]
#[derive(Config, Debug)]
pub struct ActorCriticConfig {
    /// Discount factor γ
    #[config(default = 0.99)]
    pub gamma: f32,
    /// Actor learning rate
    #[config(default = 1e-4)]
    pub lr_actor: f64,
    /// Critic learning rate
    #[config(default = 5e-4)]
    pub lr_critic: f64,
    /// Hidden layer widths, shared by actor and critic
    #[config(default = "vec![64, 64]")]
    pub hidden_layers: Vec<usize>,
    /// Clip every gradient component to `[-v, v]`
    pub gradient_clip: Option<f32>,
    /// Seed for action sampling and episode shuffling. Entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl ActorCriticConfig {
    pub fn actor_config(&self, state_dim: usize, num_actions: usize) -> MLPConfig {
        MLPConfig::new(state_dim, self.hidden_layers.clone(), num_actions)
    }

    pub fn critic_config(&self, state_dim: usize) -> MLPConfig {
        MLPConfig::new(state_dim, self.hidden_layers.clone(), 1)
    }

    /// Build fresh MLP networks and wrap them in an agent
    pub fn init<B: AutodiffBackend>(
        &self,
        state_dim: usize,
        num_actions: usize,
        device: &B::Device,
    ) -> ActorCriticAgent<B, MLP<B>, MLP<B>> {
        let actor = self.actor_config(state_dim, num_actions).init(device);
        let critic = self.critic_config(state_dim).init(device);
        ActorCriticAgent::new(actor, critic, num_actions, self, device)
    }
}

/// The TD(0) target for one transition
#[inline]
pub fn td_target(reward: f32, next_value: f32, done: bool, gamma: f32) -> f32 {
    if done {
        reward
    } else {
        reward + gamma * next_value
    }
}

/// What a single transition update computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UpdateMetrics {
    /// V(s) before the update
    pub value: f32,
    /// V(s') before the update, ignored for terminal transitions
    pub next_value: f32,
    pub target: f32,
    pub advantage: f32,
    pub actor_loss: f32,
    pub critic_loss: f32,
}

/// Means of the [`UpdateMetrics`] of one episode
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EpisodeMetrics {
    pub updates: usize,
    pub mean_actor_loss: f32,
    pub mean_critic_loss: f32,
    pub mean_advantage: f32,
    pub mean_value: f32,
}

impl EpisodeMetrics {
    fn record(&mut self, update: &UpdateMetrics) {
        self.updates += 1;
        let n = self.updates as f32;
        // incremental means
        self.mean_actor_loss += (update.actor_loss - self.mean_actor_loss) / n;
        self.mean_critic_loss += (update.critic_loss - self.mean_critic_loss) / n;
        self.mean_advantage += (update.advantage - self.mean_advantage) / n;
        self.mean_value += (update.value - self.mean_value) / n;
    }
}

/// One-step actor-critic agent for discrete action spaces
///
/// Generic over:
/// - `B`: Autodiff backend (e.g., `Autodiff<NdArray>`, `Autodiff<Wgpu>`)
/// - `Actor`: network implementing [`ActorModel`]
/// - `Critic`: network implementing [`CriticModel`]
///
/// States are any type `S` for which `Vec<S>` converts to a `[batch, features]` tensor,
/// e.g. `[f32; 8]`.
pub struct ActorCriticAgent<B, Actor, Critic>
where
    B: AutodiffBackend,
    Actor: AutodiffModule<B>,
    Critic: AutodiffModule<B>,
{
    actor: Actor,
    critic: Critic,
    optimizer_actor: OptimizerAdaptor<Adam, Actor, B>,
    optimizer_critic: OptimizerAdaptor<Adam, Critic, B>,
    device: B::Device,

    gamma: f32,
    lr_actor: f64,
    lr_critic: f64,
    num_actions: usize,

    rng: StdRng,
    total_updates: usize,
}

impl<B, Actor, Critic> ActorCriticAgent<B, Actor, Critic>
where
    B: AutodiffBackend,
    Actor: ActorModel<B>,
    Critic: CriticModel<B>,
{
    pub fn new(
        actor: Actor,
        critic: Critic,
        num_actions: usize,
        config: &ActorCriticConfig,
        device: &B::Device,
    ) -> Self {
        let clipping = config.gradient_clip.map(GradientClippingConfig::Value);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            actor,
            critic,
            optimizer_actor: AdamConfig::new().with_grad_clipping(clipping.clone()).init(),
            optimizer_critic: AdamConfig::new().with_grad_clipping(clipping).init(),
            device: device.clone(),
            gamma: config.gamma,
            lr_actor: config.lr_actor,
            lr_critic: config.lr_critic,
            num_actions,
            rng,
            total_updates: 0,
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn critic(&self) -> &Critic {
        &self.critic
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    /// Number of transition updates applied so far
    pub fn total_updates(&self) -> usize {
        self.total_updates
    }

    fn state_tensor<S>(&self, state: &S) -> Tensor<B, 2>
    where
        S: Clone,
        Vec<S>: ToTensor<B, 2, Float>,
    {
        vec![state.clone()].to_tensor(&self.device)
    }

    /// π(·|s) as plain probabilities
    pub fn action_probabilities<S>(&self, state: &S) -> error::Result<Vec<f32>>
    where
        S: Clone,
        Vec<S>: ToTensor<B, 2, Float>,
    {
        let logits = self.actor.forward(self.state_tensor(state));
        tensor_to_vec(softmax(logits, 1))
    }

    /// V(s)
    pub fn value<S>(&self, state: &S) -> error::Result<f32>
    where
        S: Clone,
        Vec<S>: ToTensor<B, 2, Float>,
    {
        let value = self.critic.forward(self.state_tensor(state));
        tensor_to_vec(value)?
            .first()
            .copied()
            .ok_or_else(|| Error::Tensor("critic produced an empty output".to_string()))
    }

    /// Sample an action from π(·|s)
    pub fn select_action<S>(&mut self, state: &S) -> error::Result<usize>
    where
        S: Clone,
        Vec<S>: ToTensor<B, 2, Float>,
    {
        let probs = self.action_probabilities(state)?;
        Ok(sample_action(&probs, &mut self.rng))
    }

    /// Apply one critic step and one actor step for a single transition
    pub fn train_transition<S>(&mut self, transition: &Transition<S>) -> error::Result<UpdateMetrics>
    where
        S: Clone,
        Vec<S>: ToTensor<B, 2, Float>,
    {
        if transition.action >= self.num_actions {
            return Err(Error::InvalidAction(transition.action));
        }

        let states = self.state_tensor(&transition.state);
        ensure_finite(&tensor_to_vec(states.clone())?)?;
        ensure_finite(&tensor_to_vec(self.state_tensor(&transition.next_state))?)?;

        let value = self.check_finite("value", self.value(&transition.state)?)?;
        let next_value = self.check_finite("next value", self.value(&transition.next_state)?)?;
        let target = td_target(transition.reward, next_value, transition.done, self.gamma);
        let target = self.check_finite("target", target)?;
        let advantage = target - value;

        // Critic: regress V(s) toward the constant target
        let critic_loss = {
            let predicted = self.critic.forward(states.clone());
            let target_tensor: Tensor<B, 1> = vec![target].to_tensor(&self.device);
            let loss = (predicted - target_tensor.unsqueeze::<2>()).powf_scalar(2.0).mean();
            let loss_val = self.check_finite("critic loss", loss.clone().into_scalar().elem::<f32>())?;

            let grads = GradientsParams::from_grads(loss.backward(), &self.critic);
            self.critic = self.optimizer_critic.step(self.lr_critic, self.critic.clone(), grads);
            loss_val
        };

        // Actor: policy gradient on the taken action only
        let actor_loss = {
            let log_probs = log_softmax(self.actor.forward(states), 1);
            let mut mask = vec![0.0_f32; self.num_actions];
            mask[transition.action] = 1.0;
            let mask: Tensor<B, 1> = mask.to_tensor(&self.device);

            let loss = (log_probs * mask.unsqueeze::<2>()).sum().mul_scalar(-advantage);
            let loss_val = self.check_finite("actor loss", loss.clone().into_scalar().elem::<f32>())?;

            let grads = GradientsParams::from_grads(loss.backward(), &self.actor);
            self.actor = self.optimizer_actor.step(self.lr_actor, self.actor.clone(), grads);
            loss_val
        };

        self.total_updates += 1;

        Ok(UpdateMetrics {
            value,
            next_value,
            target,
            advantage,
            actor_loss,
            critic_loss,
        })
    }

    /// Replay an episode's transitions, one update each
    pub fn train_episode<S>(
        &mut self,
        mut transitions: Vec<Transition<S>>,
        shuffle: bool,
    ) -> error::Result<EpisodeMetrics>
    where
        S: Clone,
        Vec<S>: ToTensor<B, 2, Float>,
    {
        if shuffle {
            transitions.shuffle(&mut self.rng);
        }

        let mut metrics = EpisodeMetrics::default();
        for transition in &transitions {
            metrics.record(&self.train_transition(transition)?);
        }

        debug!(
            "trained on {} transitions | actor loss {:.4} | critic loss {:.4} | advantage {:.4}",
            metrics.updates, metrics.mean_actor_loss, metrics.mean_critic_loss, metrics.mean_advantage
        );

        Ok(metrics)
    }

    fn check_finite(&self, quantity: &'static str, value: f32) -> error::Result<f32> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Error::DivergentTraining {
                update: self.total_updates,
                quantity,
                value,
            })
        }
    }
}

impl<B, Actor, Critic, S> Policy<S> for ActorCriticAgent<B, Actor, Critic>
where
    B: AutodiffBackend,
    Actor: ActorModel<B>,
    Critic: CriticModel<B>,
    S: Clone,
    Vec<S>: ToTensor<B, 2, Float>,
{
    fn act(&mut self, state: &S) -> error::Result<usize> {
        self.select_action(state)
    }
}

fn tensor_to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> error::Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| Error::Tensor(format!("{e:?}")))
}
