use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, Relu,
    },
    prelude::*,
};

use crate::domain::image::{CHANNELS, IMAGE_SIDE};
use crate::ml::classifier::Classifier;
use crate::ml::summary::{conv_output, ModelSummary};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
#[derive(Config, Debug)]
pub struct CnnConfig {
    #[config(default = 10)]
    pub num_classes: usize,
    #[config(default = 64)]
    pub hidden_size: usize,
}

/// Side of the last feature map: 32 → 30 → 15 → 13 → 6 → 4
fn feature_side() -> usize {
    let s = conv_output(IMAGE_SIDE, 3, 1, 0);
    let s = conv_output(s, 2, 2, 0);
    let s = conv_output(s, 3, 1, 0);
    let s = conv_output(s, 2, 2, 0);
    conv_output(s, 3, 1, 0)
}

impl CnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> CnnModel<B> {
        let side = feature_side();
        CnnModel {
            conv1: Conv2dConfig::new([CHANNELS, 32], [3, 3]).init(device),
            conv2: Conv2dConfig::new([32, 64], [3, 3]).init(device),
            conv3: Conv2dConfig::new([64, 64], [3, 3]).init(device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            activation: Relu::new(),
            fc1: LinearConfig::new(64 * side * side, self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, self.num_classes).init(device),
        }
    }
}

/// Three 3x3 convolutions with max-pooling, then two dense layers.
/// Outputs logits.
#[derive(Module, Debug)]
pub struct CnnModel<B: Backend> {
    conv1:      Conv2d<B>,
    conv2:      Conv2d<B>,
    conv3:      Conv2d<B>,
    pool:       MaxPool2d,
    activation: Relu,
    fc1:        Linear<B>,
    fc2:        Linear<B>,
}

impl<B: Backend> CnnModel<B> {
    /// Convolutional base: [N, 3, 32, 32] → [N, 64, 4, 4]
    pub fn features(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.activation.forward(self.conv1.forward(images));
        let x = self.pool.forward(x);
        let x = self.activation.forward(self.conv2.forward(x));
        let x = self.pool.forward(x);
        self.activation.forward(self.conv3.forward(x))
    }

    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.features(images).flatten::<2>(1, 3);
        let x = self.activation.forward(self.fc1.forward(x));
        self.fc2.forward(x)
    }

    /// Table of the convolutional base only
    pub fn feature_summary(&self) -> ModelSummary {
        let s1 = conv_output(IMAGE_SIDE, 3, 1, 0);
        let p1 = conv_output(s1, 2, 2, 0);
        let s2 = conv_output(p1, 3, 1, 0);
        let p2 = conv_output(s2, 2, 2, 0);
        let s3 = conv_output(p2, 3, 1, 0);

        ModelSummary::new("sequential")
            .layer("conv2d (Conv2D)", &[32, s1, s1], self.conv1.num_params())
            .layer("max_pooling2d (MaxPooling2D)", &[32, p1, p1], 0)
            .layer("conv2d_1 (Conv2D)", &[64, s2, s2], self.conv2.num_params())
            .layer("max_pooling2d_1 (MaxPooling2D)", &[64, p2, p2], 0)
            .layer("conv2d_2 (Conv2D)", &[64, s3, s3], self.conv3.num_params())
    }

    pub fn summary(&self) -> ModelSummary {
        let side = feature_side();
        let hidden = self.fc1.weight.dims()[1];
        let classes = self.fc2.weight.dims()[1];
        self.feature_summary()
            .layer("flatten (Flatten)", &[64 * side * side], 0)
            .layer("dense (Dense)", &[hidden], self.fc1.num_params())
            .layer("dense_1 (Dense)", &[classes], self.fc2.num_params())
    }
}

impl<B: Backend> Classifier<B> for CnnModel<B> {
    fn classify(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        self.forward(images)
    }
}
