// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from the CIFAR-10 archive
// all the way to device-ready tensor batches.
//
// The pipeline flows in this order:
//
//   cifar-10-binary.tar.gz
//       │
//       ▼
//   download          → fetches and unpacks the archive once
//       │
//       ▼
//   Cifar10Loader     → parses the binary batch files
//       │
//       ▼
//   sampler           → keeps a random training subset
//       │
//       ▼
//   CifarDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   CifarBatcher      → stacks images into tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the CIFAR-10 binary batch files
pub mod cifar;

/// Downloads and unpacks the CIFAR-10 archive
pub mod download;

/// Random training subsets
pub mod sampler;

/// Implements Burn's Dataset trait for CIFAR images
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// In-memory and prefetch DataLoader construction
pub mod pipeline;
