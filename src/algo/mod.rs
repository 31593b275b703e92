/// One-step Actor-Critic
pub mod actor_critic;

/// Categorical action sampling
pub mod sampler;
