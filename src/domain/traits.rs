// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to datasets through this trait
// only, so a different on-disk format (or an in-memory fixture
// in tests) can stand in for the CIFAR-10 binary reader.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::image::DatasetSplits;

// ─── ImageSource ──────────────────────────────────────────────────────────────
/// Any component that can produce labelled train/test images.
///
/// Implementations:
///   - Cifar10Loader → reads the CIFAR-10 binary batches,
///                     downloading them first if needed
pub trait ImageSource {
    /// Load both partitions of the dataset.
    fn load_splits(&self) -> Result<DatasetSplits>;
}
