// ============================================================
// Layer 3 — Run Options
// ============================================================
// The enumerated knobs a training run is configured with:
// batch size, GPU thread mode and precision policy.
//
// Each type only admits the values the command line accepts,
// so once a TrainConfig exists every option in it is valid.

use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Batch sizes accepted for the small CNN.
pub const CNN_BATCH_SIZES: [usize; 13] = [
    8, 16, 32, 64, 128, 256, 512, 1024, 2048, 4096, 8192, 16384, 32768,
];

/// Batch sizes accepted for the ResNet50 transfer model.
pub const RESNET_BATCH_SIZES: [usize; 9] = [8, 16, 32, 64, 128, 256, 512, 1024, 2048];

/// Batch size used by evaluation when none is given.
pub const DEFAULT_EVAL_BATCH_SIZE: usize = 32;

// ─── BatchSize ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchSize(usize);

impl BatchSize {
    /// Accept `value` only if it is one of `choices`.
    pub fn from_choices(value: usize, choices: &[usize]) -> Result<Self> {
        if !choices.contains(&value) {
            bail!("batch size {value} is not one of {choices:?}");
        }
        Ok(Self(value))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for BatchSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── GpuThreadMode ────────────────────────────────────────────────────────────
/// Whether the device gets host threads of its own for feeding it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuThreadMode {
    #[default]
    Shared,
    Private,
}

impl GpuThreadMode {
    pub fn from_flag(flag: u8) -> Self {
        if flag == 1 { Self::Private } else { Self::Shared }
    }

    pub fn is_private(self) -> bool {
        self == Self::Private
    }
}

// ─── PolicyType ───────────────────────────────────────────────────────────────
/// Bit width requested with `--policy-type`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyType {
    #[default]
    Bits16,
    Bits32,
}

impl PolicyType {
    pub fn from_bits(bits: u8) -> Result<Self> {
        match bits {
            16 => Ok(Self::Bits16),
            32 => Ok(Self::Bits32),
            other => bail!("policy type must be 16 or 32, got {other}"),
        }
    }
}

// ─── PrecisionPolicy ──────────────────────────────────────────────────────────
/// Floating point policy for a run.
///
/// `MixedFloat16` runs on a float16 backend: activations, weights and
/// optimiser state are all float16, and only the saved records are
/// widened to float32. `Float32` uses float32 throughout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecisionPolicy {
    #[default]
    Float32,
    MixedFloat16,
}

impl PrecisionPolicy {
    /// Pick the policy from the two precision flags.
    ///
    /// Returns `None` when mixed precision is off: no policy is set and the
    /// default float32 applies, whatever the policy type says.
    pub fn select(mixed_precision: bool, policy_type: PolicyType) -> Option<Self> {
        if !mixed_precision {
            return None;
        }
        Some(match policy_type {
            PolicyType::Bits16 => Self::MixedFloat16,
            PolicyType::Bits32 => Self::Float32,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Float32      => "float32",
            Self::MixedFloat16 => "mixed_float16",
        }
    }

    pub fn compute_dtype(self) -> &'static str {
        match self {
            Self::Float32      => "float32",
            Self::MixedFloat16 => "float16",
        }
    }

    /// Element type of the trainable weights while training
    pub fn variable_dtype(self) -> &'static str {
        match self {
            Self::Float32      => "float32",
            Self::MixedFloat16 => "float16",
        }
    }
}

impl fmt::Display for PrecisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── DeviceKind ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    #[default]
    Gpu,
    Cpu,
}

// ─── ModelKind ────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Cnn,
    ResNet50,
}

impl ModelKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Cnn      => "cnn",
            Self::ResNet50 => "resnet50",
        }
    }

    /// Batch sizes the model may be trained with
    pub fn batch_choices(self) -> &'static [usize] {
        match self {
            Self::Cnn      => &CNN_BATCH_SIZES,
            Self::ResNet50 => &RESNET_BATCH_SIZES,
        }
    }
}
