// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop shared by both models.
//
// Key Burn insight:
//   - Training runs on an AutodiffBackend for gradients
//   - model.valid() returns the model on the inner backend,
//     dropout off and batch norm on its running statistics
//   - The validation loader therefore batches onto the inner
//     backend as well
//
// Per epoch:
//   1. forward, loss, backward, optimiser step for each batch
//      (steps inside the profiled window are timed)
//   2. evaluate on the validation loader
//   3. record EpochMetrics, append to metrics.csv, record the
//      epoch time, save a checkpoint, print the epoch line
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use std::time::Instant;

use burn::{
    data::dataloader::DataLoader,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer, RmsPropConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::batcher::CifarBatch;
use crate::domain::history::{EpochMetrics, History};
use crate::infra::{
    checkpoint::CheckpointManager, metrics::MetricsLogger, profiler::StepProfiler,
};
use crate::ml::classifier::{correct, Classifier, Objective};

pub const CNN_LEARNING_RATE: f64 = 1e-3;
pub const RESNET_LEARNING_RATE: f64 = 2e-5;

/// Adam with Keras' epsilon, for the CNN
pub fn adam() -> AdamConfig {
    AdamConfig::new().with_epsilon(1e-7)
}

/// RMSprop with ρ = 0.9 and Keras' epsilon, for ResNet50
pub fn rms_prop() -> RmsPropConfig {
    RmsPropConfig::new().with_alpha(0.9).with_epsilon(1e-7)
}

#[derive(Debug, Clone, Copy)]
pub struct FitSettings {
    pub epochs:        usize,
    pub learning_rate: f64,
    pub objective:     Objective,
}

/// Where a fit writes its per-epoch output.
#[derive(Clone, Copy)]
pub struct RunArtifacts<'a> {
    pub checkpoints: &'a CheckpointManager,
    pub metrics:     &'a MetricsLogger,
    pub profiler:    &'a StepProfiler,
}

/// Loss and accuracy over one pass of a loader.
#[derive(Debug, Clone, Copy)]
pub struct Evaluation {
    pub loss:     f64,
    pub accuracy: f64,
    pub samples:  usize,
}

// Sample-weighted running totals
#[derive(Default)]
struct Tally {
    loss_sum: f64,
    correct:  usize,
    samples:  usize,
}

impl Tally {
    fn add(&mut self, loss: f64, correct: usize, batch_size: usize) {
        self.loss_sum += loss * batch_size as f64;
        self.correct  += correct;
        self.samples  += batch_size;
    }

    fn finish(&self) -> Evaluation {
        if self.samples == 0 {
            return Evaluation { loss: f64::NAN, accuracy: 0.0, samples: 0 };
        }
        Evaluation {
            loss:     self.loss_sum / self.samples as f64,
            accuracy: self.correct as f64 / self.samples as f64,
            samples:  self.samples,
        }
    }
}

/// Evaluate `model` over every batch of `loader`.
pub fn evaluate<B: Backend, M: Classifier<B>>(
    model:     &M,
    objective: Objective,
    loader:    &dyn DataLoader<CifarBatch<B>>,
) -> Evaluation {
    let mut tally = Tally::default();
    for batch in loader.iter() {
        let batch_size = batch.targets.dims()[0];
        let scores = model.classify(batch.images);
        let loss = objective
            .loss(scores.clone(), batch.targets.clone())
            .into_scalar()
            .elem::<f64>();
        tally.add(loss, correct(scores, batch.targets), batch_size);
    }
    tally.finish()
}

/// Train for `settings.epochs` epochs, validating after each one.
pub fn fit<B, M, O>(
    mut model:    M,
    mut optim:    O,
    settings:     &FitSettings,
    train_loader: &dyn DataLoader<CifarBatch<B>>,
    valid_loader: &dyn DataLoader<CifarBatch<B::InnerBackend>>,
    artifacts:    RunArtifacts<'_>,
) -> Result<(M, History)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Classifier<B>,
    M::InnerModule: Classifier<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    let mut history = History::new();
    let mut step = 0;

    for epoch in 1..=settings.epochs {
        let epoch_start = Instant::now();

        // ── Training phase ────────────────────────────────────────────────────
        let mut tally = Tally::default();
        for (index, batch) in train_loader.iter().enumerate() {
            step += 1;
            let step_start = Instant::now();
            let device = batch.images.device();
            let batch_size = batch.targets.dims()[0];

            let scores = model.classify(batch.images);
            let loss = settings.objective.loss(scores.clone(), batch.targets.clone());

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            tally.add(loss_val, correct(scores.detach(), batch.targets), batch_size);

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(settings.learning_rate, model, grads);

            if artifacts.profiler.wants(step) {
                B::sync(&device);
                artifacts
                    .profiler
                    .record_step(step, epoch, index + 1, step_start.elapsed())?;
            }
        }
        let train = tally.finish();

        // ── Validation phase ──────────────────────────────────────────────────
        let valid = evaluate(&model.valid(), settings.objective, valid_loader);
        let took = epoch_start.elapsed();

        let m = EpochMetrics::new(epoch, train.loss, train.accuracy, valid.loss, valid.accuracy);
        println!(
            "Epoch {:>3}/{} | {:.1}s | loss={:.4} | accuracy={:.4} | val_loss={:.4} | val_accuracy={:.4}",
            epoch,
            settings.epochs,
            took.as_secs_f64(),
            m.loss,
            m.accuracy,
            m.val_loss,
            m.val_accuracy,
        );

        artifacts.metrics.log(&m)?;
        artifacts.profiler.record_epoch(epoch, took)?;
        artifacts.checkpoints.save_model(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
        history.push(m);
    }

    tracing::info!("Training complete after {} steps", step);
    Ok((model, history))
}
