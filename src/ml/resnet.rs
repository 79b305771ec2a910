// ============================================================
// Layer 5 — ResNet50 Transfer Model
// ============================================================
// ResNet50 without its ImageNet top, used as a feature
// extractor, followed by a small dense head for CIFAR-10.
//
// Backbone:
//   stem     7x7/2 conv, BN, ReLU, 3x3/2 max-pool
//   layer1   3 bottlenecks,  width  64 →  256 channels
//   layer2   4 bottlenecks,  width 128 →  512 channels, /2
//   layer3   6 bottlenecks,  width 256 → 1024 channels, /2
//   layer4   3 bottlenecks,  width 512 → 2048 channels, /2
//
// Each bottleneck: 1x1 reduce → 3x3 (carries the stride) →
// 1x1 expand, each conv followed by BN, plus a residual
// shortcut (1x1 projection when the shape changes).
//
// Head:
//   32x32 input upsampled x2 three times → 256x256
//   backbone → Flatten → BN → Dense(128) → Dropout → BN →
//   Dense(64) → Dropout → BN → Dense(10) → softmax
//
// Reference: He et al. (2016) Deep Residual Learning

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        interpolate::{Interpolate2d, Interpolate2dConfig, InterpolateMode},
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig,
        PaddingConfig2d, Relu,
    },
    prelude::*,
    tensor::activation::softmax,
};

use crate::ml::classifier::Classifier;
use crate::ml::summary::{conv_output, ModelSummary};

const STAGE_BLOCKS: [usize; 4] = [3, 4, 6, 3];
const STAGE_WIDTHS: [usize; 4] = [64, 128, 256, 512];
const EXPANSION: usize = 4;
const STEM_CHANNELS: usize = 64;

/// Channels coming out of layer4
pub const BACKBONE_CHANNELS: usize = 512 * EXPANSION;

// ─── Building Blocks ──────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ConvBn<B: Backend> {
    conv: Conv2d<B>,
    norm: BatchNorm<B, 2>,
}

impl<B: Backend> ConvBn<B> {
    fn new(
        channels: [usize; 2],
        kernel:   usize,
        stride:   usize,
        padding:  usize,
        device:   &B::Device,
    ) -> Self {
        let conv = Conv2dConfig::new(channels, [kernel, kernel])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(padding, padding))
            .with_bias(false)
            .init(device);
        let norm = BatchNormConfig::new(channels[1]).init(device);
        Self { conv, norm }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.norm.forward(self.conv.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct Bottleneck<B: Backend> {
    reduce:     ConvBn<B>,
    spatial:    ConvBn<B>,
    expand:     ConvBn<B>,
    shortcut:   Option<ConvBn<B>>,
    activation: Relu,
}

impl<B: Backend> Bottleneck<B> {
    fn new(in_channels: usize, width: usize, stride: usize, device: &B::Device) -> Self {
        let out_channels = width * EXPANSION;
        let shortcut = (stride != 1 || in_channels != out_channels)
            .then(|| ConvBn::new([in_channels, out_channels], 1, stride, 0, device));

        Self {
            reduce:     ConvBn::new([in_channels, width], 1, 1, 0, device),
            spatial:    ConvBn::new([width, width], 3, stride, 1, device),
            expand:     ConvBn::new([width, out_channels], 1, 1, 0, device),
            shortcut,
            activation: Relu::new(),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.shortcut {
            Some(projection) => projection.forward(x.clone()),
            None             => x.clone(),
        };
        let out = self.activation.forward(self.reduce.forward(x));
        let out = self.activation.forward(self.spatial.forward(out));
        let out = self.expand.forward(out);
        self.activation.forward(out + identity)
    }
}

fn make_stage<B: Backend>(
    in_channels: usize,
    width:       usize,
    blocks:      usize,
    stride:      usize,
    device:      &B::Device,
) -> Vec<Bottleneck<B>> {
    (0..blocks)
        .map(|i| {
            if i == 0 {
                Bottleneck::new(in_channels, width, stride, device)
            } else {
                Bottleneck::new(width * EXPANSION, width, 1, device)
            }
        })
        .collect()
}

// ─── Backbone ─────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ResNet50Backbone<B: Backend> {
    stem:       ConvBn<B>,
    pool:       MaxPool2d,
    activation: Relu,
    layer1:     Vec<Bottleneck<B>>,
    layer2:     Vec<Bottleneck<B>>,
    layer3:     Vec<Bottleneck<B>>,
    layer4:     Vec<Bottleneck<B>>,
}

impl<B: Backend> ResNet50Backbone<B> {
    pub fn init(device: &B::Device) -> Self {
        let mut in_channels = STEM_CHANNELS;
        let mut stages = Vec::with_capacity(4);
        for (i, (&blocks, &width)) in STAGE_BLOCKS.iter().zip(STAGE_WIDTHS.iter()).enumerate() {
            let stride = if i == 0 { 1 } else { 2 };
            stages.push(make_stage(in_channels, width, blocks, stride, device));
            in_channels = width * EXPANSION;
        }
        let mut stages = stages.into_iter();

        Self {
            stem: ConvBn::new([3, STEM_CHANNELS], 7, 2, 3, device),
            pool: MaxPool2dConfig::new([3, 3])
                .with_strides([2, 2])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(),
            activation: Relu::new(),
            layer1: stages.next().unwrap_or_default(),
            layer2: stages.next().unwrap_or_default(),
            layer3: stages.next().unwrap_or_default(),
            layer4: stages.next().unwrap_or_default(),
        }
    }

    /// [N, 3, S, S] → [N, 2048, S/32, S/32]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.activation.forward(self.stem.forward(images));
        let mut x = self.pool.forward(x);
        for stage in [&self.layer1, &self.layer2, &self.layer3, &self.layer4] {
            for block in stage {
                x = block.forward(x);
            }
        }
        x
    }
}

/// Spatial side of the backbone output for a square input of side `input`
pub fn backbone_output_side(input: usize) -> usize {
    let s = conv_output(input, 7, 2, 3);
    let mut s = conv_output(s, 3, 2, 1);
    for _ in 1..STAGE_BLOCKS.len() {
        s = conv_output(s, 3, 2, 1);
    }
    s
}

// ─── Classifier Head ──────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct ResNetClassifierConfig {
    #[config(default = 10)]
    pub num_classes: usize,
    /// Side of the incoming images
    #[config(default = 32)]
    pub input_size: usize,
    /// Number of x2 nearest-neighbour upsamplings before the backbone
    #[config(default = 3)]
    pub upsample_steps: usize,
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl ResNetClassifierConfig {
    /// Side of the images the backbone sees
    pub fn backbone_input(&self) -> usize {
        self.input_size << self.upsample_steps
    }

    /// Length of the flattened backbone output
    pub fn feature_len(&self) -> usize {
        let side = backbone_output_side(self.backbone_input());
        BACKBONE_CHANNELS * side * side
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ResNetClassifier<B> {
        let features = self.feature_len();
        // Dense-feature batch norm, matching Keras' momentum 0.99 and epsilon 1e-3
        let norm = |n: usize| {
            BatchNormConfig::new(n)
                .with_momentum(0.01)
                .with_epsilon(1e-3)
                .init(device)
        };

        ResNetClassifier {
            upsample: Interpolate2dConfig::new()
                .with_scale_factor(Some([2.0, 2.0]))
                .with_mode(InterpolateMode::Nearest)
                .init(),
            upsample_steps: self.upsample_steps,
            input_size:     self.input_size,
            backbone:       ResNet50Backbone::init(device),
            norm0:          norm(features),
            fc1:            LinearConfig::new(features, 128).init(device),
            norm1:          norm(128),
            fc2:            LinearConfig::new(128, 64).init(device),
            norm2:          norm(64),
            fc3:            LinearConfig::new(64, self.num_classes).init(device),
            dropout:        DropoutConfig::new(self.dropout).init(),
            activation:     Relu::new(),
        }
    }
}

/// ResNet50 backbone with the dense CIFAR-10 head.
/// Outputs class probabilities.
#[derive(Module, Debug)]
pub struct ResNetClassifier<B: Backend> {
    upsample:       Interpolate2d,
    upsample_steps: usize,
    input_size:     usize,
    backbone:       ResNet50Backbone<B>,
    norm0:          BatchNorm<B, 1>,
    fc1:            Linear<B>,
    norm1:          BatchNorm<B, 1>,
    fc2:            Linear<B>,
    norm2:          BatchNorm<B, 1>,
    fc3:            Linear<B>,
    dropout:        Dropout,
    activation:     Relu,
}

/// BatchNorm over dense features: [N, F] → [N, F, 1] → [N, F]
fn norm_features<B: Backend>(norm: &BatchNorm<B, 1>, x: Tensor<B, 2>) -> Tensor<B, 2> {
    let [n, f] = x.dims();
    norm.forward(x.reshape([n, f, 1])).reshape([n, f])
}

impl<B: Backend> ResNetClassifier<B> {
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = images;
        for _ in 0..self.upsample_steps {
            x = self.upsample.forward(x);
        }

        let x = self.backbone.forward(x).flatten::<2>(1, 3);
        let x = norm_features(&self.norm0, x);
        let x = self.dropout.forward(self.activation.forward(self.fc1.forward(x)));
        let x = norm_features(&self.norm1, x);
        let x = self.dropout.forward(self.activation.forward(self.fc2.forward(x)));
        let x = norm_features(&self.norm2, x);
        softmax(self.fc3.forward(x), 1)
    }

    /// Replace the backbone weights, e.g. with pretrained ones.
    pub fn with_backbone(mut self, record: <ResNet50Backbone<B> as Module<B>>::Record) -> Self {
        self.backbone = self.backbone.load_record(record);
        self
    }

    pub fn summary(&self) -> ModelSummary {
        let mut summary = ModelSummary::new("sequential");
        let mut side = self.input_size;
        for i in 0..self.upsample_steps {
            side *= 2;
            let name = if i == 0 {
                "up_sampling2d (UpSampling2D)".to_string()
            } else {
                format!("up_sampling2d_{i} (UpSampling2D)")
            };
            summary = summary.layer(name, &[3, side, side], 0);
        }

        let out = backbone_output_side(side);
        let features = BACKBONE_CHANNELS * out * out;
        let hidden1 = self.fc1.weight.dims()[1];
        let hidden2 = self.fc2.weight.dims()[1];
        let classes = self.fc3.weight.dims()[1];

        summary
            .layer("resnet50 (Functional)", &[BACKBONE_CHANNELS, out, out], self.backbone.num_params())
            .layer("flatten (Flatten)", &[features], 0)
            .layer("batch_normalization (BatchNormalization)", &[features], self.norm0.num_params())
            .layer("dense (Dense)", &[hidden1], self.fc1.num_params())
            .layer("dropout (Dropout)", &[hidden1], 0)
            .layer("batch_normalization_1 (BatchNormalization)", &[hidden1], self.norm1.num_params())
            .layer("dense_1 (Dense)", &[hidden2], self.fc2.num_params())
            .layer("dropout_1 (Dropout)", &[hidden2], 0)
            .layer("batch_normalization_2 (BatchNormalization)", &[hidden2], self.norm2.num_params())
            .layer("dense_2 (Dense)", &[classes], self.fc3.num_params())
    }
}

impl<B: Backend> Classifier<B> for ResNetClassifier<B> {
    fn classify(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        self.forward(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::ElementConversion;

    type TestBackend = NdArray;

    #[test]
    fn test_backbone_output_side() {
        assert_eq!(backbone_output_side(256), 8);
        assert_eq!(backbone_output_side(224), 7);
        assert_eq!(backbone_output_side(32), 1);
    }

    #[test]
    fn test_feature_len() {
        let config = ResNetClassifierConfig::new();
        assert_eq!(config.backbone_input(), 256);
        assert_eq!(config.feature_len(), 2048 * 8 * 8);

        let small = ResNetClassifierConfig::new().with_upsample_steps(0);
        assert_eq!(small.backbone_input(), 32);
        assert_eq!(small.feature_len(), 2048);
    }

    #[test]
    fn test_bottleneck_projection() {
        let device = Default::default();
        let first = Bottleneck::<TestBackend>::new(64, 64, 1, &device);
        let later = Bottleneck::<TestBackend>::new(256, 64, 1, &device);
        assert!(first.shortcut.is_some());
        assert!(later.shortcut.is_none());

        let x = Tensor::<TestBackend, 4>::zeros([1, 64, 8, 8], &device);
        assert_eq!(first.forward(x).dims(), [1, 256, 8, 8]);

        let down = Bottleneck::<TestBackend>::new(256, 128, 2, &device);
        let x = Tensor::<TestBackend, 4>::zeros([1, 256, 8, 8], &device);
        assert_eq!(down.forward(x).dims(), [1, 512, 4, 4]);
    }

    #[test]
    fn test_stage_layout() {
        let device = Default::default();
        let backbone = ResNet50Backbone::<TestBackend>::init(&device);
        let blocks: Vec<usize> = [&backbone.layer1, &backbone.layer2, &backbone.layer3, &backbone.layer4]
            .iter()
            .map(|stage| stage.len())
            .collect();
        assert_eq!(blocks, vec![3, 4, 6, 3]);
        // Only the first block of each stage projects its shortcut
        assert!(backbone.layer2[0].shortcut.is_some());
        assert!(backbone.layer2[1].shortcut.is_none());
    }

    #[test]
    fn test_classifier_outputs_probabilities() {
        let device = Default::default();
        let model = ResNetClassifierConfig::new()
            .with_upsample_steps(0)
            .init::<TestBackend>(&device);
        let images = Tensor::<TestBackend, 4>::ones([2, 3, 32, 32], &device);

        let probs = model.classify(images);
        assert_eq!(probs.dims(), [2, 10]);

        let row_sums = probs.sum_dim(1).into_data().convert::<f32>().to_vec::<f32>().unwrap();
        for s in row_sums {
            assert!((s - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_summary_rows() {
        let device = Default::default();
        // Small input keeps the dense head small: 8 → 64 → 2x2 features
        let model = ResNetClassifierConfig::new()
            .with_input_size(8)
            .init::<TestBackend>(&device);
        let summary = model.summary();

        assert_eq!(summary.rows()[0].output_shape, vec![3, 16, 16]);
        assert_eq!(summary.rows()[2].output_shape, vec![3, 64, 64]);
        assert_eq!(summary.rows()[3].output_shape, vec![2048, 2, 2]);
        assert_eq!(summary.rows()[4].output_shape, vec![8192]);
        assert_eq!(summary.total_params(), model.num_params());
    }

    #[test]
    fn test_with_backbone_copies_weights() {
        let device = Default::default();
        let source = ResNetClassifierConfig::new().with_upsample_steps(0).init::<TestBackend>(&device);
        let target = ResNetClassifierConfig::new().with_upsample_steps(0).init::<TestBackend>(&device);

        let record = source.backbone.clone().into_record();
        let target = target.with_backbone(record);

        let weight = |m: &ResNetClassifier<TestBackend>| -> f32 {
            m.backbone.stem.conv.weight.val().sum().into_scalar().elem()
        };
        assert_eq!(weight(&source), weight(&target));
    }
}
