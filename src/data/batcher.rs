// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec of images into
// one batch of tensors on the target device.
//
// How batching works here:
//   Input:  N images of 3x32x32 pixels
//   Output: images  [N, 3, 32, 32] floats in [0, 1]
//           targets [N]            class indices
//
// Pixels are written into one flat Vec and handed to Burn
// together with the 4D shape; CIFAR already stores them
// channel-major so the flat order is exactly NCHW.
//
// Two item types are accepted: raw LabeledImages (scaled here,
// per batch) and NormalizedImages (scaled once, up front, by the
// prefetch pipeline).
//
// With workers, each image of a batch is written by a thread
// of the batcher's own rayon pool. The loader stays a single
// sequential one, so batch boundaries and shuffling cover the
// whole dataset.
//
// Reference: Burn Book §4 (Batcher)

use std::sync::Arc;

use anyhow::{Context, Result};
use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};

use crate::data::dataset::NormalizedImage;
use crate::domain::image::{LabeledImage, CHANNELS, IMAGE_SIDE, PIXELS_PER_IMAGE};

// ─── CifarBatch ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct CifarBatch<B: Backend> {
    /// shape: [batch_size, 3, 32, 32]
    pub images: Tensor<B, 4>,

    /// shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

// ─── CifarBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct CifarBatcher<B: Backend> {
    pub device: B::Device,
    /// `None` writes pixels on the loader thread
    pool: Option<Arc<ThreadPool>>,
}

impl<B: Backend> CifarBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device, pool: None }
    }

    /// Spread pixel conversion over `workers` threads.
    /// One worker keeps it on the calling thread.
    pub fn with_workers(mut self, workers: usize) -> Result<Self> {
        if workers > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("cifar-batcher-{i}"))
                .build()
                .context("Cannot start the batching thread pool")?;
            self.pool = Some(Arc::new(pool));
        }
        Ok(self)
    }

    pub fn workers(&self) -> usize {
        self.pool.as_ref().map_or(1, |pool| pool.current_num_threads())
    }

    /// Flat NCHW pixel buffer, one `PIXELS_PER_IMAGE` slot per item.
    fn write_pixels<T, F>(&self, items: &[T], write: F) -> Vec<f32>
    where
        T: Sync,
        F: Fn(&T, &mut [f32]) + Sync,
    {
        let mut pixels = vec![0.0; items.len() * PIXELS_PER_IMAGE];
        match &self.pool {
            Some(pool) => pool.install(|| {
                pixels
                    .par_chunks_mut(PIXELS_PER_IMAGE)
                    .zip(items.par_iter())
                    .for_each(|(slot, item)| write(item, slot));
            }),
            None => pixels
                .chunks_mut(PIXELS_PER_IMAGE)
                .zip(items)
                .for_each(|(slot, item)| write(item, slot)),
        }
        pixels
    }

    fn assemble(&self, pixels: Vec<f32>, labels: Vec<i64>) -> CifarBatch<B> {
        let batch_size = labels.len();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, CHANNELS, IMAGE_SIDE, IMAGE_SIDE])
                .convert::<B::FloatElem>(),
            &self.device,
        );
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(labels, [batch_size]).convert::<B::IntElem>(),
            &self.device,
        );

        CifarBatch { images, targets }
    }
}

impl<B: Backend> Batcher<LabeledImage, CifarBatch<B>> for CifarBatcher<B> {
    fn batch(&self, items: Vec<LabeledImage>) -> CifarBatch<B> {
        let pixels = self.write_pixels(&items, |item, slot| {
            for (dst, &p) in slot.iter_mut().zip(&item.pixels) {
                *dst = p as f32 / 255.0;
            }
        });
        let labels = items.iter().map(|item| item.label as i64).collect();
        self.assemble(pixels, labels)
    }
}

impl<B: Backend> Batcher<NormalizedImage, CifarBatch<B>> for CifarBatcher<B> {
    fn batch(&self, items: Vec<NormalizedImage>) -> CifarBatch<B> {
        let pixels = self.write_pixels(&items, |item, slot| {
            for (dst, &p) in slot.iter_mut().zip(&item.pixels) {
                *dst = p;
            }
        });
        let labels = items.iter().map(|item| item.label as i64).collect();
        self.assemble(pixels, labels)
    }
}
