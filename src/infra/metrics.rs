// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:        the epoch number (1, 2, 3, ...)
//   - loss:         mean training loss
//   - accuracy:     training accuracy
//   - val_loss:     mean loss on the test set
//   - val_accuracy: accuracy on the test set
//
// Output file: {run_dir}/metrics.csv
//
// Example CSV output:
//   epoch,loss,accuracy,val_loss,val_accuracy
//   1,1.512300,0.448100,1.231800,0.561200
//   2,1.142000,0.596700,1.068400,0.622900
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

use crate::domain::history::EpochMetrics;

pub const CSV_HEADER: &str = "epoch,loss,accuracy,val_loss,val_accuracy";

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "{CSV_HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.loss,
            m.accuracy,
            m.val_loss,
            m.val_accuracy,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.loss,
            m.val_loss,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
