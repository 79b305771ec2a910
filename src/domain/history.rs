// ============================================================
// Layer 3 — Training History
// ============================================================
// Per-epoch results of a fit, in epoch order. The plots and the
// metrics CSV are both produced from this.

use serde::{Deserialize, Serialize};

/// One row of metrics for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Average loss over the training batches
    pub loss: f64,

    /// Fraction of training samples classified correctly, in [0, 1]
    pub accuracy: f64,

    /// Average loss on the validation data
    pub val_loss: f64,

    /// Fraction of validation samples classified correctly
    pub val_accuracy: f64,
}

impl EpochMetrics {
    pub fn new(
        epoch:        usize,
        loss:         f64,
        accuracy:     f64,
        val_loss:     f64,
        val_accuracy: f64,
    ) -> Self {
        Self { epoch, loss, accuracy, val_loss, val_accuracy }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    epochs: Vec<EpochMetrics>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, metrics: EpochMetrics) {
        self.epochs.push(metrics);
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn loss(&self) -> Vec<f64> {
        self.series(|m| m.loss)
    }

    pub fn accuracy(&self) -> Vec<f64> {
        self.series(|m| m.accuracy)
    }

    pub fn val_loss(&self) -> Vec<f64> {
        self.series(|m| m.val_loss)
    }

    pub fn val_accuracy(&self) -> Vec<f64> {
        self.series(|m| m.val_accuracy)
    }

    fn series(&self, f: impl Fn(&EpochMetrics) -> f64) -> Vec<f64> {
        self.epochs.iter().map(f).collect()
    }
}
