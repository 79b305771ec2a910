// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates one benchmark run in order:
//
//   Step 0: Check device + precision  (Layer 5 - ml)
//   Step 1: Load CIFAR-10             (Layer 4 - data)
//   Step 2: Sample the training set   (Layer 4 - data)
//   Step 3: Plot sample images        (Layer 6 - infra)
//   Step 4: Create the run directory  (Layer 6 - infra)
//   Step 5: Save config, open logs    (Layer 6 - infra)
//   Step 6: Run on the backend        (Layer 5 - ml)
//   Step 7: Build + summarise model   (Layer 5 - ml)
//   Step 8: Fit                       (Layer 5 - ml)
//   Step 9: Plot history, evaluate    (Layers 5 and 6)
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use burn::{module::AutodiffModule, optim::Optimizer, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::data::{
    cifar::Cifar10Loader,
    pipeline::{available_cores, build_loader, worker_count, LoaderSettings, Pipeline},
    sampler::sample_without_replacement,
};
use crate::domain::{
    history::History,
    image::LabeledImage,
    options::{
        BatchSize, DeviceKind, GpuThreadMode, ModelKind, PrecisionPolicy,
        DEFAULT_EVAL_BATCH_SIZE,
    },
    traits::ImageSource,
};
use crate::infra::{
    checkpoint::{load_record, CheckpointManager},
    metrics::MetricsLogger,
    plot,
    profiler::{StepProfiler, PROFILE_STEPS},
    run_dir::create_run_dir,
};
use crate::ml::{
    backend::{backend_name, run_on_backend, BackendJob},
    classifier::{Classifier, Objective},
    cnn::CnnConfig,
    resnet::{ResNet50Backbone, ResNetClassifierConfig},
    trainer::{
        adam, evaluate, fit, rms_prop, Evaluation, FitSettings, RunArtifacts,
        CNN_LEARNING_RATE, RESNET_LEARNING_RATE,
    },
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything a run was started with.
// Saved as train_config.json in the run directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub model:            ModelKind,
    pub pipeline:         Pipeline,
    pub batch_size:       BatchSize,
    pub gpu_mode:         GpuThreadMode,
    /// `None` when mixed precision is off
    pub precision:        Option<PrecisionPolicy>,
    pub device:           DeviceKind,
    pub epochs:           usize,
    pub nb_samples:       usize,
    pub data_dir:         String,
    pub logs_root:        String,
    pub plots_dir:        String,
    pub seed:             u64,
    /// ResNet50 only: pretrained backbone record
    pub backbone_weights: Option<String>,
    /// ResNet50 only: x2 upsamplings in front of the backbone
    pub upsample_steps:   Option<usize>,
}

impl TrainConfig {
    /// Policy the backend runs with; float32 when none was set
    pub fn effective_precision(&self) -> PrecisionPolicy {
        self.precision.unwrap_or_default()
    }
}

/// What a finished run hands back to the CLI
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub run_dir:    PathBuf,
    pub history:    History,
    /// Test set, evaluated with the run batch size
    pub test:       Evaluation,
    /// Test set, evaluated with the default batch size
    pub validation: Evaluation,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full run end to end
    pub fn execute(&self) -> Result<TrainReport> {
        let source = Cifar10Loader::new(&self.config.data_dir);
        self.execute_with(&source)
    }

    /// Execute with an explicit image source
    pub fn execute_with(&self, source: &dyn ImageSource) -> Result<TrainReport> {
        let cfg = &self.config;

        // ── Step 0: Refuse impossible device/precision pairs up front ─────────
        let backend = backend_name(cfg.device, cfg.effective_precision())?;
        tracing::info!(
            "Training {} with batch size {} on {}",
            cfg.model.name(),
            cfg.batch_size,
            backend
        );

        // ── Step 1: Load CIFAR-10 ─────────────────────────────────────────────
        let splits = source.load_splits()?;
        report_sizes(cfg.model, splits.train.len(), splits.test.len());

        // ── Step 2: Random training subset (in-memory only) ───────────────────
        let train = match cfg.pipeline {
            Pipeline::InMemory => {
                let train = sample_without_replacement(splits.train, cfg.nb_samples, cfg.seed)?;
                report_sizes(cfg.model, train.len(), splits.test.len());
                train
            }
            Pipeline::Prefetch => splits.train,
        };

        // ── Step 3: Plot a few images ─────────────────────────────────────────
        let plots_dir = PathBuf::from(&cfg.plots_dir);
        warn_on_failure(
            "the plots directory",
            fs::create_dir_all(&plots_dir).map_err(Into::into),
        );
        if cfg.model == ModelKind::Cnn && cfg.pipeline == Pipeline::InMemory {
            warn_on_failure(
                "dataset.png",
                plot::plot_dataset_grid(&train, &plots_dir.join("dataset.png")),
            );
        }

        // ── Steps 4-5: Run directory, config, metrics, profile ────────────────
        let run_dir = create_run_dir(
            Path::new(&cfg.logs_root),
            cfg.model,
            cfg.pipeline,
            cfg.batch_size,
        )?;
        let checkpoints = CheckpointManager::new(&run_dir)?;
        checkpoints.save_config(cfg)?;
        let metrics = MetricsLogger::new(&run_dir)?;
        let profiler = StepProfiler::new(&run_dir, PROFILE_STEPS)?;
        tracing::info!("Logging metrics to '{}'", metrics.csv_path().display());
        tracing::info!(
            "Timing steps {}..={} to '{}', epochs to '{}'",
            PROFILE_STEPS.start(),
            PROFILE_STEPS.end(),
            profiler.trace_path().display(),
            profiler.epochs_path().display()
        );

        // ── Step 6: Everything backend-specific ───────────────────────────────
        let job = TrainJob {
            cfg,
            train,
            test: splits.test,
            plots_dir: &plots_dir,
            artifacts: RunArtifacts {
                checkpoints: &checkpoints,
                metrics:     &metrics,
                profiler:    &profiler,
            },
        };
        let (history, test, validation) =
            run_on_backend(cfg.device, cfg.effective_precision(), job)?;

        Ok(TrainReport { run_dir, history, test, validation })
    }
}

/// CNN runs report the training set only, ResNet50 runs the
/// test set as well.
fn report_sizes(model: ModelKind, train: usize, test: usize) {
    for line in size_lines(model, train, test) {
        println!("{line}");
    }
}

fn size_lines(model: ModelKind, train: usize, test: usize) -> Vec<String> {
    let mut lines = vec![format!("There are {} training samples", train)];
    if model == ModelKind::ResNet50 {
        lines.push(format!("There are {} testing samples", test));
    }
    lines
}

fn warn_on_failure(what: &str, result: Result<()>) {
    if let Err(e) = result {
        tracing::warn!("Could not write {}: {:#}", what, e);
    }
}

// ─── Backend-Generic Part of the Run ─────────────────────────────────────────
struct TrainJob<'a> {
    cfg:          &'a TrainConfig,
    train:        Vec<LabeledImage>,
    test:         Vec<LabeledImage>,
    plots_dir:    &'a Path,
    artifacts:    RunArtifacts<'a>,
}

impl BackendJob for TrainJob<'_> {
    type Output = (History, Evaluation, Evaluation);

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<Self::Output> {
        let cfg = self.cfg;
        match cfg.model {
            ModelKind::Cnn => {
                let model = CnnConfig::new().init::<B>(&device);
                println!("{}\n", model.feature_summary());
                println!("{}\n", model.summary());

                let settings = FitSettings {
                    epochs:        cfg.epochs,
                    learning_rate: CNN_LEARNING_RATE,
                    objective:     Objective::SparseCategoricalCrossentropy,
                };
                self.train_and_evaluate(model, adam().init(), settings, &device)
            }
            ModelKind::ResNet50 => {
                let mut config = ResNetClassifierConfig::new();
                if let Some(steps) = cfg.upsample_steps {
                    config = config.with_upsample_steps(steps);
                }
                let mut model = config.init::<B>(&device);
                match &cfg.backbone_weights {
                    Some(path) => {
                        let record = load_record::<B, ResNet50Backbone<B>>(path, &device)?;
                        model = model.with_backbone(record);
                        tracing::info!("Loaded backbone weights from '{}'", path);
                    }
                    None => tracing::warn!(
                        "No backbone weights given, ResNet50 starts from random initialisation"
                    ),
                }
                println!("{}\n", model.summary());

                let settings = FitSettings {
                    epochs:        cfg.epochs,
                    learning_rate: RESNET_LEARNING_RATE,
                    objective:     Objective::BinaryCrossentropy,
                };
                self.train_and_evaluate(model, rms_prop().init(), settings, &device)
            }
        }
    }
}

impl TrainJob<'_> {
    fn train_and_evaluate<B, M, O>(
        self,
        model:    M,
        optim:    O,
        settings: FitSettings,
        device:   &B::Device,
    ) -> Result<(History, Evaluation, Evaluation)>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B> + Classifier<B>,
        M::InnerModule: Classifier<B::InnerBackend>,
        O: Optimizer<M, B>,
    {
        let cfg = self.cfg;
        let workers = worker_count(cfg.pipeline, cfg.gpu_mode, available_cores());
        tracing::info!("Batching with {} worker(s)", workers);

        let eval_settings = |batch_size: usize| LoaderSettings {
            pipeline: cfg.pipeline,
            batch_size,
            workers,
            shuffle: None,
        };
        let train_settings = LoaderSettings {
            shuffle: Some(cfg.seed),
            ..eval_settings(cfg.batch_size.get())
        };

        let train_loader = build_loader::<B>(self.train, &train_settings, device)?;
        let valid_loader = build_loader::<B::InnerBackend>(
            self.test.clone(),
            &eval_settings(cfg.batch_size.get()),
            device,
        )?;

        let (model, history) = fit(
            model,
            optim,
            &settings,
            train_loader.as_ref(),
            valid_loader.as_ref(),
            self.artifacts,
        )?;

        plot_history(cfg, &history, self.plots_dir);

        // ── Final evaluation on the test set ──────────────────────────────────
        let model = model.valid();
        let test = evaluate(&model, settings.objective, valid_loader.as_ref());
        println!("Test accuracy: {:.4}", test.accuracy);

        println!("Validation:");
        let default_loader = build_loader::<B::InnerBackend>(
            self.test,
            &eval_settings(DEFAULT_EVAL_BATCH_SIZE),
            device,
        )?;
        let validation = evaluate(&model, settings.objective, default_loader.as_ref());
        println!("loss: {:.4} - accuracy: {:.4}", validation.loss, validation.accuracy);

        Ok((history, test, validation))
    }
}

fn plot_history(cfg: &TrainConfig, history: &History, plots_dir: &Path) {
    match cfg.model {
        ModelKind::Cnn => {
            let name = format!("accuracy_{}.png", cfg.pipeline.load_type());
            warn_on_failure(&name, plot::plot_accuracy(history, &plots_dir.join(&name)));
        }
        ModelKind::ResNet50 => warn_on_failure(
            "ResNet50 curves",
            plot::plot_resnet_curves(
                history,
                &plots_dir.join("resnet50_loss.png"),
                &plots_dir.join("resnet50_accuracy.png"),
            ),
        ),
    }
}
