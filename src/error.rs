//! Error taxonomy shared by every stage of a run
//!
//! Nothing here is retried: an error aborts the current phase (training or
//! evaluation) and is reported by the binary.

use std::{io, path::PathBuf};

/// Errors raised while talking to the simulator, training, checkpointing or plotting
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The simulator process could not be started
    #[error("simulator `{command}` could not be started: {source}")]
    EnvironmentUnavailable {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The simulator process exited or closed its pipes
    #[error("simulator closed the connection")]
    EnvironmentClosed,

    /// The simulator sent something we could not understand
    #[error("simulator protocol error: {0}")]
    Protocol(String),

    /// The simulator reported a failure of its own
    #[error("simulator error: {0}")]
    Simulator(String),

    #[error("observation has {got} values, expected {expected}")]
    InvalidObservation { expected: usize, got: usize },

    /// The observation holds NaN or an infinite value
    #[error("observation value {value} at index {index} is not finite")]
    NonFiniteObservation { index: usize, value: f32 },

    #[error("action index {0} is outside the action space")]
    InvalidAction(usize),

    /// A loss or value estimate became NaN or infinite
    #[error("training diverged at update {update}: {quantity} is {value}")]
    DivergentTraining {
        update: usize,
        quantity: &'static str,
        value: f32,
    },

    #[error("tensor data error: {0}")]
    Tensor(String),

    /// burn's recorder failed to write or read a network
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("no checkpoint found in {0}")]
    MissingCheckpoint(PathBuf),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("plotting error: {0}")]
    Plot(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
