// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All run logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `cnn`      — trains the small CNN
//   2. `resnet50` — trains the ResNet50 transfer model
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use std::time::Instant;

use commands::Commands;
use crate::application::train_use_case::{TrainConfig, TrainUseCase};

#[derive(Parser, Debug)]
#[command(
    name = "cifar-bench",
    version = "0.1.0",
    about = "Benchmark CNN and ResNet50 training on CIFAR-10 across batch sizes and precisions."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config: TrainConfig = match self.command {
            Commands::Cnn(args)      => args.into(),
            Commands::ResNet50(args) => args.into(),
        };
        announce(&config);

        let start = Instant::now();
        let report = TrainUseCase::new(config).execute()?;
        tracing::info!(
            "{} epochs, test accuracy {:.4} over {} images, run artifacts in '{}'",
            report.history.len(),
            report.test.accuracy,
            report.validation.samples,
            report.run_dir.display()
        );

        println!("Working time: {:.2} seconds", start.elapsed().as_secs_f64());
        Ok(())
    }
}

/// Echo the run settings before anything starts.
fn announce(config: &TrainConfig) {
    println!("Setting batch size =  {}", config.batch_size);

    if config.gpu_mode.is_private() {
        println!("Setting the GPU on private mode");
    }

    if let Some(policy) = config.precision {
        println!("Setting the mixed precision policy");
        println!("Compute dtype: {}", policy.compute_dtype());
        println!("Variable dtype: {}", policy.variable_dtype());
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::pipeline::Pipeline;
    use crate::domain::options::{DeviceKind, GpuThreadMode, ModelKind, PrecisionPolicy};

    fn parse(args: &[&str]) -> Result<TrainConfig, clap::Error> {
        let cli = Cli::try_parse_from(args)?;
        Ok(match cli.command {
            Commands::Cnn(a)      => a.into(),
            Commands::ResNet50(a) => a.into(),
        })
    }

    #[test]
    fn test_cnn_defaults() {
        let cfg = parse(&["cifar-bench", "cnn", "--batch-size", "64"]).unwrap();
        assert_eq!(cfg.model, ModelKind::Cnn);
        assert_eq!(cfg.batch_size.get(), 64);
        assert_eq!(cfg.pipeline, Pipeline::InMemory);
        assert_eq!(cfg.gpu_mode, GpuThreadMode::Shared);
        assert_eq!(cfg.precision, None);
        assert_eq!(cfg.device, DeviceKind::Gpu);
        assert_eq!(cfg.epochs, 10);
        assert_eq!(cfg.nb_samples, 50_000);
        assert_eq!(cfg.seed, 42);
    }

    #[test]
    fn test_resnet_defaults() {
        let cfg = parse(&["cifar-bench", "resnet50", "--batch-size", "2048"]).unwrap();
        assert_eq!(cfg.model, ModelKind::ResNet50);
        assert_eq!(cfg.epochs, 5);
        assert_eq!(cfg.pipeline, Pipeline::InMemory);
        assert_eq!(cfg.backbone_weights, None);
        assert_eq!(cfg.upsample_steps, Some(3));
        // Without --mixed-precision 1 ResNet50 trains in float32 like the CNN
        assert_eq!(cfg.precision, None);
        assert_eq!(cfg.effective_precision(), PrecisionPolicy::Float32);
    }

    #[test]
    fn test_cnn_has_no_resnet_options() {
        let cfg = parse(&["cifar-bench", "cnn", "--batch-size", "64"]).unwrap();
        assert_eq!(cfg.upsample_steps, None);
        assert!(parse(&["cifar-bench", "cnn", "--batch-size", "64", "--upsample-steps", "1"]).is_err());
    }

    #[test]
    fn test_upsample_steps_range() {
        let cfg = parse(&["cifar-bench", "resnet50", "--batch-size", "8", "--upsample-steps", "0"]).unwrap();
        assert_eq!(cfg.upsample_steps, Some(0));
        assert!(parse(&["cifar-bench", "resnet50", "--batch-size", "8", "--upsample-steps", "4"]).is_err());
    }

    #[test]
    fn test_batch_size_is_required() {
        assert!(parse(&["cifar-bench", "cnn"]).is_err());
    }

    #[test]
    fn test_batch_size_outside_choices() {
        assert!(parse(&["cifar-bench", "cnn", "--batch-size", "100"]).is_err());
        assert!(parse(&["cifar-bench", "cnn", "--batch-size", "big"]).is_err());
        assert!(parse(&["cifar-bench", "cnn", "--batch-size", "32768"]).is_ok());
        // Large batches are CNN only
        assert!(parse(&["cifar-bench", "resnet50", "--batch-size", "4096"]).is_err());
    }

    #[test]
    fn test_mixed_precision_policies() {
        let cfg = parse(&[
            "cifar-bench", "cnn", "--batch-size", "32", "--mixed-precision", "1",
        ])
        .unwrap();
        assert_eq!(cfg.precision, Some(PrecisionPolicy::MixedFloat16));

        let cfg = parse(&[
            "cifar-bench", "cnn", "--batch-size", "32",
            "--mixed-precision", "1", "--policy-type", "32",
        ])
        .unwrap();
        assert_eq!(cfg.precision, Some(PrecisionPolicy::Float32));

        // The policy type alone does not enable anything
        let cfg = parse(&["cifar-bench", "cnn", "--batch-size", "32", "--policy-type", "32"]).unwrap();
        assert_eq!(cfg.precision, None);
    }

    #[test]
    fn test_flag_values_outside_range() {
        assert!(parse(&["cifar-bench", "cnn", "--batch-size", "32", "--gpu-mode", "2"]).is_err());
        assert!(parse(&["cifar-bench", "cnn", "--batch-size", "32", "--mixed-precision", "3"]).is_err());
        assert!(parse(&["cifar-bench", "cnn", "--batch-size", "32", "--policy-type", "8"]).is_err());
        assert!(parse(&["cifar-bench", "cnn", "--batch-size", "32", "--device", "tpu"]).is_err());
    }

    #[test]
    fn test_underscore_aliases() {
        let cfg = parse(&[
            "cifar-bench", "cnn", "--batch_size", "128", "--gpu_mode", "1",
            "--mixed_precision", "1", "--policy_type", "16",
        ])
        .unwrap();
        assert_eq!(cfg.batch_size.get(), 128);
        assert_eq!(cfg.gpu_mode, GpuThreadMode::Private);
        assert_eq!(cfg.precision, Some(PrecisionPolicy::MixedFloat16));
    }

    #[test]
    fn test_prefetch_and_cpu() {
        let cfg = parse(&[
            "cifar-bench", "cnn", "--batch-size", "256",
            "--pipeline", "prefetch", "--device", "cpu",
        ])
        .unwrap();
        assert_eq!(cfg.pipeline, Pipeline::Prefetch);
        assert_eq!(cfg.device, DeviceKind::Cpu);
    }

    #[test]
    fn test_resnet_rejects_pipeline_flag() {
        assert!(parse(&[
            "cifar-bench", "resnet50", "--batch-size", "8", "--pipeline", "prefetch",
        ])
        .is_err());
    }

    #[test]
    fn test_backbone_weights_path() {
        let cfg = parse(&[
            "cifar-bench", "resnet50", "--batch-size", "16",
            "--backbone-weights", "weights/resnet50",
        ])
        .unwrap();
        assert_eq!(cfg.backbone_weights.as_deref(), Some("weights/resnet50"));
    }
}
