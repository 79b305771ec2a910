// ============================================================
// Layer 4 — Input Pipelines
// ============================================================
// Wraps images in a dataset and hands it to Burn's DataLoader.
//
// Two ways of feeding the model:
//
//   InMemory  → raw bytes stay in memory, each batch is scaled
//               to [0, 1] when it is assembled
//   Prefetch  → every image is scaled once and cached, batches
//               are assembled by as many workers as there are cores
//
// The worker threads are where "GPU private mode" lands: with a
// private mode the in-memory pipeline gets its own batching
// threads instead of sharing the training thread. Workers only
// parallelise pixel conversion inside a batch; they never change
// which images end up in which batch.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

use std::{fmt::Debug, sync::Arc};

use anyhow::Result;
use burn::{
    data::{
        dataloader::{batcher::Batcher, DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    prelude::*,
};
use serde::{Deserialize, Serialize};

use crate::data::batcher::{CifarBatch, CifarBatcher};
use crate::data::dataset::{cache_normalized, CifarDataset, NormalizedImage};
use crate::domain::image::LabeledImage;
use crate::domain::options::GpuThreadMode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    #[default]
    InMemory,
    Prefetch,
}

impl Pipeline {
    /// Short name used in log directories and plot file names
    pub fn load_type(self) -> &'static str {
        match self {
            Self::InMemory => "download",
            Self::Prefetch => "prefetch",
        }
    }
}

/// Number of batching workers for a pipeline.
///
/// `cores` is the host parallelism, usually `available_cores()`.
pub fn worker_count(pipeline: Pipeline, gpu_mode: GpuThreadMode, cores: usize) -> usize {
    match (pipeline, gpu_mode) {
        (Pipeline::Prefetch, _)                       => cores.max(1),
        (Pipeline::InMemory, GpuThreadMode::Private) => cores.saturating_sub(1).max(1),
        (Pipeline::InMemory, GpuThreadMode::Shared)  => 1,
    }
}

pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

// ─── Loader Construction ──────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy)]
pub struct LoaderSettings {
    pub pipeline:   Pipeline,
    pub batch_size: usize,
    /// Threads the batcher converts pixels with
    pub workers:    usize,
    /// Shuffle seed; `None` keeps dataset order
    pub shuffle:    Option<u64>,
}

/// Build a DataLoader over `images` according to `settings`.
///
/// Every batch holds exactly `batch_size` images except the last
/// one, whatever the worker count.
pub fn build_loader<B: Backend>(
    images:   Vec<LabeledImage>,
    settings: &LoaderSettings,
    device:   &B::Device,
) -> Result<Arc<dyn DataLoader<CifarBatch<B>>>> {
    let dataset = CifarDataset::new(images);
    let batcher = CifarBatcher::<B>::new(device.clone()).with_workers(settings.workers)?;

    tracing::debug!(
        "Building {:?} loader: {} images, batch {}, {} batching thread(s)",
        settings.pipeline,
        dataset.image_count(),
        settings.batch_size,
        batcher.workers()
    );

    Ok(match settings.pipeline {
        Pipeline::InMemory => {
            assemble::<B, LabeledImage, _>(batcher, dataset, settings)
        }
        Pipeline::Prefetch => {
            assemble::<B, NormalizedImage, _>(batcher, cache_normalized(dataset), settings)
        }
    })
}

// Burn's own multi-worker loader splits the dataset into one slice
// per worker and batches each slice separately, which shrinks the
// batches. Parallelism lives in the batcher instead.
fn assemble<B, I, D>(
    batcher:  CifarBatcher<B>,
    dataset:  D,
    settings: &LoaderSettings,
) -> Arc<dyn DataLoader<CifarBatch<B>>>
where
    B: Backend,
    I: Send + Sync + Clone + Debug + 'static,
    D: Dataset<I> + 'static,
    CifarBatcher<B>: Batcher<I, CifarBatch<B>>,
{
    let mut builder = DataLoaderBuilder::<I, CifarBatch<B>>::new(batcher)
        .batch_size(settings.batch_size);
    if let Some(seed) = settings.shuffle {
        builder = builder.shuffle(seed);
    }
    builder.build(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use crate::domain::image::PIXELS_PER_IMAGE;

    type TestBackend = NdArray;

    fn images(n: usize) -> Vec<LabeledImage> {
        (0..n)
            .map(|i| LabeledImage::new(vec![i as u8; PIXELS_PER_IMAGE], (i % 10) as u8))
            .collect()
    }

    fn settings(pipeline: Pipeline, shuffle: Option<u64>) -> LoaderSettings {
        LoaderSettings { pipeline, batch_size: 4, workers: 1, shuffle }
    }

    fn labels(loader: &Arc<dyn DataLoader<CifarBatch<TestBackend>>>) -> Vec<i64> {
        loader
            .iter()
            .flat_map(|b| b.targets.into_data().convert::<i64>().to_vec::<i64>().unwrap())
            .collect()
    }

    fn batch_sizes(loader: &Arc<dyn DataLoader<CifarBatch<TestBackend>>>) -> Vec<usize> {
        loader.iter().map(|b| b.targets.dims()[0]).collect()
    }

    #[test]
    fn test_worker_counts() {
        assert_eq!(worker_count(Pipeline::Prefetch, GpuThreadMode::Shared, 8), 8);
        assert_eq!(worker_count(Pipeline::Prefetch, GpuThreadMode::Private, 8), 8);
        assert_eq!(worker_count(Pipeline::InMemory, GpuThreadMode::Private, 8), 7);
        assert_eq!(worker_count(Pipeline::InMemory, GpuThreadMode::Shared, 8), 1);
        // A single core still gets one worker
        assert_eq!(worker_count(Pipeline::InMemory, GpuThreadMode::Private, 1), 1);
        assert_eq!(worker_count(Pipeline::Prefetch, GpuThreadMode::Shared, 0), 1);
    }

    #[test]
    fn test_load_type_names() {
        assert_eq!(Pipeline::InMemory.load_type(), "download");
        assert_eq!(Pipeline::Prefetch.load_type(), "prefetch");
    }

    #[test]
    fn test_in_memory_loader_batches() {
        let device = Default::default();
        let loader = build_loader::<TestBackend>(
            images(10),
            &settings(Pipeline::InMemory, Some(42)),
            &device,
        )
        .unwrap();
        let mut sizes = batch_sizes(&loader);
        sizes.sort();
        assert_eq!(sizes, vec![2, 4, 4]);
    }

    #[test]
    fn test_prefetch_loader_batches() {
        let device = Default::default();
        let loader = build_loader::<TestBackend>(
            images(9),
            &settings(Pipeline::Prefetch, None),
            &device,
        )
        .unwrap();
        assert_eq!(batch_sizes(&loader), vec![4, 4, 1]);
    }

    #[test]
    fn test_unshuffled_loader_keeps_order() {
        let device = Default::default();
        let loader = build_loader::<TestBackend>(
            images(8),
            &settings(Pipeline::InMemory, None),
            &device,
        )
        .unwrap();
        assert_eq!(labels(&loader), vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_prefetch_workers_keep_full_batches() {
        let device = Default::default();
        let settings = LoaderSettings {
            pipeline:   Pipeline::Prefetch,
            batch_size: 64,
            workers:    4,
            shuffle:    None,
        };
        let loader = build_loader::<TestBackend>(images(100), &settings, &device).unwrap();
        assert_eq!(batch_sizes(&loader), vec![64, 36]);
    }

    #[test]
    fn test_private_mode_workers_keep_full_batches() {
        let device = Default::default();
        let settings = LoaderSettings {
            pipeline:   Pipeline::InMemory,
            batch_size: 8,
            workers:    worker_count(Pipeline::InMemory, GpuThreadMode::Private, 4),
            shuffle:    Some(7),
        };
        assert_eq!(settings.workers, 3);
        let loader = build_loader::<TestBackend>(images(30), &settings, &device).unwrap();

        let mut sizes = batch_sizes(&loader);
        sizes.sort();
        assert_eq!(sizes, vec![6, 8, 8, 8]);

        // Shuffled across the whole dataset, every image exactly once
        let mut seen = labels(&loader);
        assert_eq!(seen.len(), 30);
        seen.sort();
        let mut expected: Vec<i64> = (0..30).map(|i| (i % 10) as i64).collect();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_workers_do_not_reorder_images() {
        let device = Default::default();
        let settings = LoaderSettings {
            pipeline:   Pipeline::InMemory,
            batch_size: 5,
            workers:    4,
            shuffle:    None,
        };
        let loader = build_loader::<TestBackend>(images(10), &settings, &device).unwrap();
        assert_eq!(labels(&loader), vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }
}
