//! The environment abstraction the agent interacts with

use crate::error::{Error, Result};

/// The outcome of a single environment step
#[derive(Debug, Clone, PartialEq)]
pub struct Step<S> {
    /// The observation after the action was applied
    pub state: S,
    pub reward: f32,
    /// The episode ended (terminated or truncated by the environment)
    pub done: bool,
}

/// A reinforcement learning environment
///
/// Implementations wrap a simulator. Every call may fail because the
/// simulator usually lives outside this process.
pub trait Environment {
    /// The observation type. Cloned once per step, so it should be cheap.
    type State: Clone;

    /// The action type. Built from the index chosen by the policy.
    type Action: Copy + TryFrom<usize>;

    /// Start a new episode and return the initial observation
    fn reset(&mut self) -> Result<Self::State>;

    /// Apply an action and advance the simulation by one step
    fn step(&mut self, action: Self::Action) -> Result<Step<Self::State>>;

    /// Draw the current frame. Environments without a display do nothing.
    fn render(&mut self) -> Result<()> {
        Ok(())
    }
}

/// An [`Environment`] whose actions are a finite, ordered set
pub trait DiscreteActionSpace: Environment {
    /// All actions, ordered by their index
    fn actions(&self) -> Vec<Self::Action>;

    fn num_actions(&self) -> usize {
        self.actions().len()
    }
}

/// Reject observations holding NaN or infinite values
///
/// A single non-finite input poisons every first-layer weight on the next
/// backward pass while the losses can stay finite.
pub fn ensure_finite(values: &[f32]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(Error::NonFiniteObservation {
            index,
            value: values[index],
        }),
        None => Ok(()),
    }
}
