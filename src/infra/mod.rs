// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything a run writes to disk:
//
//   run_dir.rs    — Timestamped log directory per run
//
//   checkpoint.rs — Saving and loading model weights with
//                   Burn's recorder, plus the run's TrainConfig
//                   as JSON
//
//   metrics.rs    — Per-epoch metrics appended to a CSV file
//
//   profiler.rs   — Step timings for a window of training
//                   steps, plus wall time per epoch
//
//   plot.rs       — PNG charts of the dataset and of the
//                   training history
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Run directory naming and creation
pub mod run_dir;

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Step and epoch timings
pub mod profiler;

/// Dataset and history plots
pub mod plot;
