//! Best-model checkpointing.
//!
//! A checkpoint is a directory holding, for each network, its architecture
//! (`actor.json`, `critic.json`) and its weights (`actor.bin`, `critic.bin`),
//! plus `checkpoint.json` describing the rolling average that produced it.
//! Every save overwrites the previous one; nothing is rolled back if a write
//! fails halfway.

use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    config::Config,
    module::Module,
    record::{BinFileRecorder, FullPrecisionSettings},
    tensor::backend::Backend,
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    nn::{MLPConfig, MLP},
};

const ACTOR_CONFIG: &str = "actor.json";
const CRITIC_CONFIG: &str = "critic.json";
const ACTOR_WEIGHTS: &str = "actor.bin";
const CRITIC_WEIGHTS: &str = "critic.bin";
const METADATA: &str = "checkpoint.json";

/// Architectures of the two networks, stored alongside their weights
#[derive(Debug, Clone)]
pub struct NetworkSpec {
    pub actor: MLPConfig,
    pub critic: MLPConfig,
}

/// What produced the stored checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckpointInfo {
    /// Zero-based index of the episode after which the networks were saved
    pub episode: usize,
    /// The rolling average that beat every previous one
    pub rolling_average: f32,
}

/// Networks restored from a checkpoint directory
#[derive(Debug)]
pub struct LoadedCheckpoint<B: Backend> {
    pub actor: MLP<B>,
    pub critic: MLP<B>,
    pub spec: NetworkSpec,
    pub info: CheckpointInfo,
}

/// Saves both networks whenever the rolling average reaches a new best.
pub struct Checkpointer {
    dir: PathBuf,
    spec: NetworkSpec,
    best: Option<CheckpointInfo>,
    saves: usize,
}

impl Checkpointer {
    /// Create a new checkpointer.
    ///
    /// Creates the checkpoint directory if it doesn't exist. Any checkpoint
    /// already there is overwritten by the first improvement of this run.
    pub fn new(dir: impl Into<PathBuf>, spec: NetworkSpec) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            spec,
            best: None,
            saves: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The best checkpoint written during this run
    pub fn best(&self) -> Option<CheckpointInfo> {
        self.best
    }

    /// Number of checkpoints written during this run
    pub fn saves(&self) -> usize {
        self.saves
    }

    /// Save the networks if `rolling_average` beats every previous value.
    ///
    /// `None` means the rolling window is not full yet; no decision is made.
    /// Returns whether a checkpoint was written.
    pub fn consider<B, A, C>(
        &mut self,
        episode: usize,
        rolling_average: Option<f32>,
        actor: &A,
        critic: &C,
    ) -> Result<bool>
    where
        B: Backend,
        A: Module<B>,
        C: Module<B>,
    {
        let Some(average) = rolling_average else {
            return Ok(false);
        };

        let improved = self.best.map_or(true, |best| average > best.rolling_average);
        if !improved {
            return Ok(false);
        }

        let info = CheckpointInfo {
            episode,
            rolling_average: average,
        };
        self.save::<B, A, C>(actor, critic, &info)?;
        self.best = Some(info);
        self.saves += 1;

        info!(
            "episode {}: new best rolling average {:.2}, checkpoint saved to {}",
            episode + 1,
            average,
            self.dir.display()
        );
        Ok(true)
    }

    fn save<B, A, C>(&self, actor: &A, critic: &C, info: &CheckpointInfo) -> Result<()>
    where
        B: Backend,
        A: Module<B>,
        C: Module<B>,
    {
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();

        self.spec.actor.save(self.dir.join(ACTOR_CONFIG))?;
        self.spec.critic.save(self.dir.join(CRITIC_CONFIG))?;

        actor
            .clone()
            .save_file(self.dir.join(ACTOR_WEIGHTS), &recorder)
            .map_err(|e| Error::Checkpoint(e.to_string()))?;
        critic
            .clone()
            .save_file(self.dir.join(CRITIC_WEIGHTS), &recorder)
            .map_err(|e| Error::Checkpoint(e.to_string()))?;

        fs::write(self.dir.join(METADATA), serde_json::to_string_pretty(info)?)?;
        Ok(())
    }
}

/// Rebuild both networks from a checkpoint directory.
pub fn load_checkpoint<B: Backend>(dir: &Path, device: &B::Device) -> Result<LoadedCheckpoint<B>> {
    if !dir.join(METADATA).exists() {
        return Err(Error::MissingCheckpoint(dir.to_path_buf()));
    }

    let load_config = |name: &str| {
        MLPConfig::load(dir.join(name)).map_err(|e| Error::Config(format!("{name}: {e:?}")))
    };
    let spec = NetworkSpec {
        actor: load_config(ACTOR_CONFIG)?,
        critic: load_config(CRITIC_CONFIG)?,
    };

    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    let actor = spec
        .actor
        .init::<B>(device)
        .load_file(dir.join(ACTOR_WEIGHTS), &recorder, device)
        .map_err(|e| Error::Checkpoint(e.to_string()))?;
    let critic = spec
        .critic
        .init::<B>(device)
        .load_file(dir.join(CRITIC_WEIGHTS), &recorder, device)
        .map_err(|e| Error::Checkpoint(e.to_string()))?;

    let info = serde_json::from_str(&fs::read_to_string(dir.join(METADATA))?)?;

    Ok(LoadedCheckpoint {
        actor,
        critic,
        spec,
        info,
    })
}
