// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model, loss and training code lives here.
//
// What's in this layer:
//
//   classifier.rs — The Classifier trait both models implement,
//                   plus the two loss objectives and accuracy
//
//   cnn.rs        — Small three-conv CNN trained from scratch
//
//   resnet.rs     — ResNet50 backbone with a dense head,
//                   the transfer-learning model
//
//   summary.rs    — Printable per-layer parameter tables
//
//   trainer.rs    — The training loop: forward, loss, backward,
//                   optimiser step, validation, checkpointing
//
//   backend.rs    — Maps device + precision flags onto a
//                   concrete Burn backend
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Classifier trait, objectives and accuracy
pub mod classifier;

/// Small CNN architecture
pub mod cnn;

/// ResNet50 transfer-learning architecture
pub mod resnet;

/// Keras-style model summaries
pub mod summary;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Backend selection from device and precision
pub mod backend;
