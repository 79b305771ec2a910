// ============================================================
// Layer 3 — Labeled Image Domain Type
// ============================================================
// One CIFAR-10 example: 32x32 RGB pixels plus the class index.
//
// Pixels are stored channel-major (all red values, then green,
// then blue), each plane row-major. This is the layout of the
// CIFAR-10 binary files and also the [C, H, W] layout Burn's
// Conv2d expects, so no transposition is needed anywhere.

use serde::{Deserialize, Serialize};

pub const IMAGE_SIDE: usize = 32;
pub const CHANNELS: usize = 3;
pub const PIXELS_PER_IMAGE: usize = CHANNELS * IMAGE_SIDE * IMAGE_SIDE;
pub const NUM_CLASSES: usize = 10;

pub const CLASS_NAMES: [&str; NUM_CLASSES] = [
    "airplane", "automobile", "bird", "cat", "deer",
    "dog", "frog", "horse", "ship", "truck",
];

/// A single image with its integer label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledImage {
    /// 3 x 32 x 32 bytes, channel-major
    pub pixels: Vec<u8>,
    /// Class index in 0..10
    pub label: u8,
}

impl LabeledImage {
    pub fn new(pixels: Vec<u8>, label: u8) -> Self {
        Self { pixels, label }
    }

    pub fn class_name(&self) -> &'static str {
        CLASS_NAMES
            .get(self.label as usize)
            .copied()
            .unwrap_or("unknown")
    }

    /// Intensity of channel `c` at row `y`, column `x`.
    pub fn pixel(&self, c: usize, y: usize, x: usize) -> u8 {
        self.pixels[c * IMAGE_SIDE * IMAGE_SIDE + y * IMAGE_SIDE + x]
    }

    /// (r, g, b) triple at row `y`, column `x`.
    pub fn rgb(&self, y: usize, x: usize) -> (u8, u8, u8) {
        (self.pixel(0, y, x), self.pixel(1, y, x), self.pixel(2, y, x))
    }
}

/// Train and test partitions of a dataset.
#[derive(Debug, Clone, Default)]
pub struct DatasetSplits {
    pub train: Vec<LabeledImage>,
    pub test:  Vec<LabeledImage>,
}
