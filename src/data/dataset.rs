use burn::data::dataset::{
    transform::{Mapper, MapperDataset},
    Dataset, InMemDataset,
};
use serde::{Deserialize, Serialize};

use crate::domain::image::LabeledImage;

/// Image with pixels already scaled into [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedImage {
    pub pixels: Vec<f32>,
    pub label:  u8,
}

pub struct CifarDataset {
    images: Vec<LabeledImage>,
}

impl CifarDataset {
    pub fn new(images: Vec<LabeledImage>) -> Self { Self { images } }

    pub fn image_count(&self) -> usize { self.images.len() }
}

impl Dataset<LabeledImage> for CifarDataset {
    fn get(&self, index: usize) -> Option<LabeledImage> {
        self.images.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.images.len()
    }
}

/// Byte → [0, 1] pixel scaling, applied once per item.
pub struct ScalePixels;

impl Mapper<LabeledImage, NormalizedImage> for ScalePixels {
    fn map(&self, item: &LabeledImage) -> NormalizedImage {
        NormalizedImage {
            pixels: item.pixels.iter().map(|&p| p as f32 / 255.0).collect(),
            label:  item.label,
        }
    }
}

/// Normalise every image up front and keep the result in memory.
pub fn cache_normalized(dataset: CifarDataset) -> InMemDataset<NormalizedImage> {
    let mapped = MapperDataset::new(dataset, ScalePixels);
    InMemDataset::from_dataset(&mapped)
}
