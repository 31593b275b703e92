//! Environment adapters for external simulators

pub mod lunar_lander;

pub use lunar_lander::{LanderAction, LanderState, LunarLander, SimulatorCommand};
