// ============================================================
// Layer 6 — Run Directories
// ============================================================
// Every run writes its metrics, config and checkpoints into a
// fresh directory named after the run and its start time:
//
//   CNN, in-memory pipeline  → logs/download_{batch}-{timestamp}
//   CNN, prefetch pipeline   → log_prefetch/{batch}_{timestamp}
//   ResNet50                 → logs/{timestamp}
//
// Timestamps look like 20240131-174502.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::{fs, path::{Path, PathBuf}};

use crate::data::pipeline::Pipeline;
use crate::domain::options::{BatchSize, ModelKind};

pub fn timestamp(now: DateTime<Local>) -> String {
    now.format("%Y%m%d-%H%M%S").to_string()
}

/// Path of a run directory relative to the logs root.
pub fn run_dir_name(
    model:      ModelKind,
    pipeline:   Pipeline,
    batch_size: BatchSize,
    stamp:      &str,
) -> PathBuf {
    match (model, pipeline) {
        (ModelKind::Cnn, Pipeline::InMemory) => {
            Path::new("logs").join(format!("download_{batch_size}-{stamp}"))
        }
        (ModelKind::Cnn, Pipeline::Prefetch) => {
            Path::new("log_prefetch").join(format!("{batch_size}_{stamp}"))
        }
        (ModelKind::ResNet50, _) => Path::new("logs").join(stamp),
    }
}

/// Create the run directory under `root` for a run starting now.
pub fn create_run_dir(
    root:       &Path,
    model:      ModelKind,
    pipeline:   Pipeline,
    batch_size: BatchSize,
) -> Result<PathBuf> {
    let dir = root.join(run_dir_name(model, pipeline, batch_size, &timestamp(Local::now())));
    fs::create_dir_all(&dir)
        .with_context(|| format!("Cannot create run directory '{}'", dir.display()))?;
    tracing::info!("Run directory: '{}'", dir.display());
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::domain::options::CNN_BATCH_SIZES;

    fn batch(n: usize) -> BatchSize {
        BatchSize::from_choices(n, &CNN_BATCH_SIZES).unwrap()
    }

    #[test]
    fn test_timestamp_format() {
        let t = Local.with_ymd_and_hms(2024, 1, 31, 17, 45, 2).unwrap();
        assert_eq!(timestamp(t), "20240131-174502");
    }

    #[test]
    fn test_run_dir_names() {
        let stamp = "20240131-174502";
        assert_eq!(
            run_dir_name(ModelKind::Cnn, Pipeline::InMemory, batch(64), stamp),
            PathBuf::from("logs/download_64-20240131-174502")
        );
        assert_eq!(
            run_dir_name(ModelKind::Cnn, Pipeline::Prefetch, batch(128), stamp),
            PathBuf::from("log_prefetch/128_20240131-174502")
        );
        assert_eq!(
            run_dir_name(ModelKind::ResNet50, Pipeline::InMemory, batch(32), stamp),
            PathBuf::from("logs/20240131-174502")
        );
    }

    #[test]
    fn test_create_run_dir() {
        let root = std::env::temp_dir()
            .join(format!("cifar-bench-runs-{}", std::process::id()));
        let dir = create_run_dir(&root, ModelKind::Cnn, Pipeline::Prefetch, batch(8)).unwrap();
        assert!(dir.is_dir());
        assert!(dir.starts_with(root.join("log_prefetch")));
        fs::remove_dir_all(&root).ok();
    }
}
