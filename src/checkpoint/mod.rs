//! Persisting and restoring the actor and critic networks.

mod checkpointer;

pub use checkpointer::{load_checkpoint, CheckpointInfo, Checkpointer, LoadedCheckpoint, NetworkSpec};
