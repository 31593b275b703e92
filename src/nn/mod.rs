//! Neural network building blocks for the actor and the critic

pub mod mlp;

pub use mlp::{MLPConfig, MLP};
