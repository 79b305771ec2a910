// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `cnn` and `resnet50`, and
// their flags.
//
// Enumerated flags are checked by the parser itself: a batch
// size, mode or policy outside its list is a usage error and
// no run starts.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{value_parser, Args, Subcommand, ValueEnum};

use crate::application::train_use_case::TrainConfig;
use crate::data::pipeline::Pipeline;
use crate::domain::options::{
    BatchSize, DeviceKind, GpuThreadMode, ModelKind, PolicyType, PrecisionPolicy,
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the small CNN on CIFAR-10
    Cnn(CnnArgs),

    /// Train the ResNet50 transfer-learning model on CIFAR-10
    #[command(name = "resnet50")]
    ResNet50(ResNetArgs),
}

// ─── Value Parsers ────────────────────────────────────────────────────────────
fn parse_batch_size(s: &str, model: ModelKind) -> Result<BatchSize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a batch size"))?;
    BatchSize::from_choices(value, model.batch_choices()).map_err(|e| e.to_string())
}

pub fn parse_cnn_batch_size(s: &str) -> Result<BatchSize, String> {
    parse_batch_size(s, ModelKind::Cnn)
}

pub fn parse_resnet_batch_size(s: &str) -> Result<BatchSize, String> {
    parse_batch_size(s, ModelKind::ResNet50)
}

pub fn parse_policy_type(s: &str) -> Result<PolicyType, String> {
    let bits: u8 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a policy type"))?;
    PolicyType::from_bits(bits).map_err(|e| e.to_string())
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineArg {
    /// Whole dataset in memory, scaled per batch
    InMemory,
    /// Scaled once and cached, batched by all cores
    Prefetch,
}

impl From<PipelineArg> for Pipeline {
    fn from(p: PipelineArg) -> Self {
        match p {
            PipelineArg::InMemory => Pipeline::InMemory,
            PipelineArg::Prefetch => Pipeline::Prefetch,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceArg {
    Gpu,
    Cpu,
}

impl From<DeviceArg> for DeviceKind {
    fn from(d: DeviceArg) -> Self {
        match d {
            DeviceArg::Gpu => DeviceKind::Gpu,
            DeviceArg::Cpu => DeviceKind::Cpu,
        }
    }
}

// ─── Shared Flags ─────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct RunArgs {
    /// 1 gives the GPU private host threads for feeding it
    #[arg(long, alias = "gpu_mode", default_value_t = 0, value_parser = value_parser!(u8).range(0..=1))]
    pub gpu_mode: u8,

    /// 1 enables mixed precision
    #[arg(long, alias = "mixed_precision", default_value_t = 0, value_parser = value_parser!(u8).range(0..=1))]
    pub mixed_precision: u8,

    /// 16 = mixed_float16, 32 = float32 (only with --mixed-precision 1)
    #[arg(long, alias = "policy_type", default_value = "16", value_parser = parse_policy_type)]
    pub policy_type: PolicyType,

    /// Number of training images to sample
    #[arg(long, alias = "nb_samples", default_value_t = 50_000)]
    pub nb_samples: usize,

    /// Where CIFAR-10 is (or gets downloaded)
    #[arg(long, default_value = "data/cifar10")]
    pub data_dir: String,

    /// Root under which run directories are created
    #[arg(long, default_value = ".")]
    pub logs_root: String,

    /// Directory for the PNG plots
    #[arg(long, default_value = ".")]
    pub plots_dir: String,

    #[arg(long, value_enum, default_value_t = DeviceArg::Gpu)]
    pub device: DeviceArg,

    /// Seed for sampling and shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl RunArgs {
    fn into_config(
        self,
        model:      ModelKind,
        pipeline:   Pipeline,
        batch_size: BatchSize,
        epochs:     usize,
        resnet:     Option<(Option<String>, usize)>,
    ) -> TrainConfig {
        let (backbone_weights, upsample_steps) = match resnet {
            Some((weights, steps)) => (weights, Some(steps)),
            None => (None, None),
        };
        TrainConfig {
            model,
            pipeline,
            batch_size,
            gpu_mode:   GpuThreadMode::from_flag(self.gpu_mode),
            precision:  PrecisionPolicy::select(self.mixed_precision == 1, self.policy_type),
            device:     self.device.into(),
            epochs,
            nb_samples: self.nb_samples,
            data_dir:   self.data_dir,
            logs_root:  self.logs_root,
            plots_dir:  self.plots_dir,
            seed:       self.seed,
            backbone_weights,
            upsample_steps,
        }
    }
}

// ─── Subcommand Flags ─────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct CnnArgs {
    /// One of 8, 16, .., 32768
    #[arg(long, alias = "batch_size", value_parser = parse_cnn_batch_size)]
    pub batch_size: BatchSize,

    #[arg(long, value_enum, default_value_t = PipelineArg::InMemory)]
    pub pipeline: PipelineArg,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Args, Debug)]
pub struct ResNetArgs {
    /// One of 8, 16, .., 2048
    #[arg(long, alias = "batch_size", value_parser = parse_resnet_batch_size)]
    pub batch_size: BatchSize,

    #[arg(long, default_value_t = 5)]
    pub epochs: usize,

    /// Burn record file with pretrained ResNet50 backbone weights
    #[arg(long)]
    pub backbone_weights: Option<String>,

    /// x2 upsamplings in front of the backbone (3 gives 256x256 inputs)
    #[arg(long, alias = "upsample_steps", default_value_t = 3, value_parser = value_parser!(u8).range(0..=3))]
    pub upsample_steps: u8,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Convert CLI args into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<CnnArgs> for TrainConfig {
    fn from(a: CnnArgs) -> Self {
        a.run.into_config(ModelKind::Cnn, a.pipeline.into(), a.batch_size, a.epochs, None)
    }
}

impl From<ResNetArgs> for TrainConfig {
    fn from(a: ResNetArgs) -> Self {
        a.run.into_config(
            ModelKind::ResNet50,
            Pipeline::InMemory,
            a.batch_size,
            a.epochs,
            Some((a.backbone_weights, a.upsample_steps as usize)),
        )
    }
}
