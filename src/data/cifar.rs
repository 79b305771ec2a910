// ============================================================
// Layer 4 — CIFAR-10 Loader
// ============================================================
// Reads the CIFAR-10 "binary version" distribution.
//
// On-disk layout (after unpacking the archive):
//   {data_dir}/cifar-10-batches-bin/
//     data_batch_1.bin .. data_batch_5.bin   ← 10 000 images each
//     test_batch.bin                         ← 10 000 images
//
// Every file is a flat sequence of 3073-byte records:
//   [label: u8][red plane: 1024 u8][green: 1024 u8][blue: 1024 u8]
// Planes are row-major 32x32, so a record maps directly onto a
// LabeledImage without reordering.

use anyhow::{bail, Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::data::download;
use crate::domain::image::{DatasetSplits, LabeledImage, NUM_CLASSES, PIXELS_PER_IMAGE};
use crate::domain::traits::ImageSource;

/// Bytes per record: one label byte followed by the pixels
pub const RECORD_LEN: usize = 1 + PIXELS_PER_IMAGE;

/// Directory the archive unpacks into
pub const BATCHES_DIR: &str = "cifar-10-batches-bin";

pub const TRAIN_BATCHES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];

pub const TEST_BATCH: &str = "test_batch.bin";

/// Decode one CIFAR-10 batch file.
pub fn parse_batch(bytes: &[u8]) -> Result<Vec<LabeledImage>> {
    if bytes.len() % RECORD_LEN != 0 {
        bail!(
            "batch length {} is not a multiple of the {}-byte record size",
            bytes.len(),
            RECORD_LEN
        );
    }

    bytes
        .chunks_exact(RECORD_LEN)
        .enumerate()
        .map(|(i, record)| {
            let label = record[0];
            if label as usize >= NUM_CLASSES {
                bail!("record {i} has label {label}, expected 0..{NUM_CLASSES}");
            }
            Ok(LabeledImage::new(record[1..].to_vec(), label))
        })
        .collect()
}

/// Loads CIFAR-10 from a data directory.
/// Implements the ImageSource trait from Layer 3.
pub struct Cifar10Loader {
    /// Directory holding (or receiving) the unpacked archive
    dir: PathBuf,
    /// Fetch the archive when the batches are missing
    download: bool,
}

impl Cifar10Loader {
    /// Loader that downloads the dataset on first use
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), download: true }
    }

    pub fn batches_dir(&self) -> PathBuf {
        self.dir.join(BATCHES_DIR)
    }

    fn ensure_present(&self) -> Result<()> {
        if self.batches_dir().is_dir() {
            return Ok(());
        }
        if !self.download {
            bail!(
                "CIFAR-10 batches not found in '{}'",
                self.batches_dir().display()
            );
        }
        download::fetch_and_unpack(download::ARCHIVE_URL, &self.dir, BATCHES_DIR)
    }

    fn read_batch(&self, name: &str) -> Result<Vec<LabeledImage>> {
        let path = self.batches_dir().join(name);
        read_batch_file(&path)
    }
}

fn read_batch_file(path: &Path) -> Result<Vec<LabeledImage>> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    let images = parse_batch(&bytes)
        .with_context(|| format!("Malformed CIFAR-10 batch '{}'", path.display()))?;
    tracing::debug!("Read {} images from '{}'", images.len(), path.display());
    Ok(images)
}

impl ImageSource for Cifar10Loader {
    fn load_splits(&self) -> Result<DatasetSplits> {
        self.ensure_present()?;

        let mut train = Vec::with_capacity(50_000);
        for name in TRAIN_BATCHES {
            train.extend(self.read_batch(name)?);
        }
        let test = self.read_batch(TEST_BATCH)?;

        tracing::info!(
            "Loaded CIFAR-10: {} train, {} test images",
            train.len(),
            test.len()
        );
        Ok(DatasetSplits { train, test })
    }
}
