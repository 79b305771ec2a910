// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's named
// MessagePack recorder (gzip compressed).
//
// What gets saved in a run directory:
//   1. model_epoch_{n}.mpk.gz — weights after epoch n
//   2. latest_epoch.json      — which epoch was last saved
//   3. train_config.json      — the run's TrainConfig
//
// Records always use FullPrecisionSettings: weights trained as
// float16 are widened to float32 when stored.
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::Serialize;
use std::{fs, path::{Path, PathBuf}};

type RunRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

const LATEST_EPOCH_FILE: &str = "latest_epoch.json";
const CONFIG_FILE: &str = "train_config.json";

/// Load a module record from `path` (extension optional).
///
/// Used for pretrained backbone weights as well as checkpoints.
pub fn load_record<B: Backend, M: Module<B>>(
    path:   impl AsRef<Path>,
    device: &B::Device,
) -> Result<M::Record> {
    let path = path.as_ref().to_path_buf();
    RunRecorder::new()
        .load(path.clone(), device)
        .with_context(|| format!("Cannot load weights from '{}'", path.display()))
}

/// Manages saving and loading of model checkpoints.
/// All files are stored in the run directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Save model weights for a given epoch and move the
    /// latest-epoch pointer to it.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, epoch: usize) -> Result<()> {
        // Recorder adds the .mpk.gz extension
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        RunRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| {
                format!("Failed to save checkpoint to '{}'", path.display())
            })?;

        let latest_path = self.dir.join(LATEST_EPOCH_FILE);
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write {LATEST_EPOCH_FILE}"))?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    pub fn save_config<T: Serialize>(&self, cfg: &T) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Epoch number of the most recent checkpoint.
    /// Errors if no checkpoint was written yet.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_EPOCH_FILE);
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{}'", path.display()))?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}
