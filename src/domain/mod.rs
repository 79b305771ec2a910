// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing a training run: images and
// labels, the validated command-line options, and the history
// a fit produces.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

// A CIFAR-10 image with its label
pub mod image;

// Batch size, GPU mode and precision policy
pub mod options;

// Per-epoch training metrics
pub mod history;

// Core abstractions (traits) that other layers implement
pub mod traits;
