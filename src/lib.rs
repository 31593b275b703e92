//! One-step actor-critic for the LunarLander control task
//!
//! An actor network picks one of four thruster actions, a critic network
//! estimates state values, and both are updated after every transition using a
//! TD(0) advantage. The simulator itself lives outside this crate and is
//! reached through the [`Environment`](env::Environment) trait.

pub mod algo;
pub mod checkpoint;
pub mod env;
pub mod error;
pub mod eval;
pub mod gym;
pub mod history;
pub mod nn;
pub mod plot;
pub mod runner;
pub mod train;
pub mod traits;

pub use error::{Error, Result};
