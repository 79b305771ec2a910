// ============================================================
// Layer 5 — Classifier Seam and Objectives
// ============================================================
// Both models expose one forward pass, `classify`, mapping a
// batch of images [N, 3, H, W] to per-class scores [N, 10].
// The training loop is written against this trait only.
//
// What the scores mean depends on the objective:
//
//   SparseCategoricalCrossentropy → raw logits, integer targets
//   BinaryCrossentropy            → softmax probabilities,
//                                   compared with one-hot targets
//
// Accuracy is the same for both: argmax of the scores equals
// the target class.

use burn::{
    nn::loss::CrossEntropyLossConfig,
    prelude::*,
    tensor::{ElementPrecision, Precision},
};
use serde::{Deserialize, Serialize};

/// Probabilities are clipped to [ε, 1 - ε] before the log
const EPSILON: f64 = 1e-7;

/// ε for half-precision elements. 1 - 1e-7 rounds to exactly 1.0
/// in float16, while 1 - 1e-3 stays below it.
const HALF_EPSILON: f64 = 1e-3;

/// Clipping distance that survives rounding to the element type.
pub fn clip_epsilon(precision: Precision) -> f64 {
    match precision {
        Precision::Half => HALF_EPSILON,
        _ => EPSILON,
    }
}

pub trait Classifier<B: Backend> {
    fn classify(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    SparseCategoricalCrossentropy,
    BinaryCrossentropy,
}

impl Objective {
    /// Mean loss over the batch, as a single-element tensor.
    pub fn loss<B: Backend>(self, scores: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
        match self {
            Self::SparseCategoricalCrossentropy => {
                CrossEntropyLossConfig::new()
                    .init(&scores.device())
                    .forward(scores, targets)
            }
            Self::BinaryCrossentropy => binary_crossentropy(scores, targets),
        }
    }
}

/// Number of rows whose highest score is the target class.
pub fn correct<B: Backend>(scores: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    // argmax(1) returns shape [batch, 1], flatten to [batch]
    let predicted = scores.argmax(1).flatten::<1>(0, 1);
    predicted
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

/// [N] class indices → [N, num_classes] rows of 0.0 with a 1.0
pub fn one_hot<B: Backend>(targets: Tensor<B, 1, Int>, num_classes: usize) -> Tensor<B, 2> {
    let device = targets.device();
    let [n] = targets.dims();
    Tensor::<B, 2>::zeros([n, num_classes], &device).scatter(
        1,
        targets.reshape([n, 1]),
        Tensor::ones([n, 1], &device),
    )
}

fn binary_crossentropy<B: Backend>(probs: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    let [_, num_classes] = probs.dims();
    let expected = one_hot(targets, num_classes);
    let eps = clip_epsilon(B::FloatElem::precision());
    let p = probs.clamp(eps, 1.0 - eps);

    // -(y·log p + (1-y)·log(1-p)), averaged over every element
    let positive = expected.clone() * p.clone().log();
    let negative = (expected.neg() + 1.0) * (p.neg() + 1.0).log();
    (positive + negative).neg().mean()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::ElementConversion;

    type TestBackend = NdArray;

    fn scores(rows: [[f32; 3]; 2]) -> Tensor<TestBackend, 2> {
        Tensor::from_data(TensorData::from(rows), &Default::default())
    }

    fn targets(values: [i64; 2]) -> Tensor<TestBackend, 1, Int> {
        Tensor::from_data(
            TensorData::from(values).convert::<<TestBackend as Backend>::IntElem>(),
            &Default::default(),
        )
    }

    fn scalar(t: Tensor<TestBackend, 1>) -> f64 {
        t.into_scalar().elem::<f64>()
    }

    #[test]
    fn test_correct_counts_argmax_hits() {
        let s = scores([[0.1, 0.7, 0.2], [0.5, 0.3, 0.2]]);
        assert_eq!(correct(s.clone(), targets([1, 0])), 2);
        assert_eq!(correct(s.clone(), targets([1, 2])), 1);
        assert_eq!(correct(s, targets([0, 1])), 0);
    }

    #[test]
    fn test_one_hot_rows() {
        let encoded = one_hot(targets([2, 0]), 3);
        let values = encoded.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_sparse_crossentropy_on_uniform_logits() {
        // Equal logits over 3 classes → loss is ln 3 whatever the target
        let s = scores([[0.0, 0.0, 0.0], [0.0, 0.0, 0.0]]);
        let loss = scalar(Objective::SparseCategoricalCrossentropy.loss(s, targets([0, 2])));
        assert!((loss - 3f64.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_binary_crossentropy_prefers_confident_hits() {
        let good = scores([[0.9, 0.05, 0.05], [0.05, 0.9, 0.05]]);
        let bad  = scores([[0.05, 0.9, 0.05], [0.9, 0.05, 0.05]]);
        let t = targets([0, 1]);

        let good_loss = scalar(Objective::BinaryCrossentropy.loss(good, t.clone()));
        let bad_loss  = scalar(Objective::BinaryCrossentropy.loss(bad, t));
        assert!(good_loss < bad_loss);
        assert!(good_loss > 0.0);
    }

    #[test]
    fn test_binary_crossentropy_value() {
        // Uniform 1/2 everywhere → every element contributes ln 2
        let s = scores([[0.5, 0.5, 0.5], [0.5, 0.5, 0.5]]);
        let loss = scalar(Objective::BinaryCrossentropy.loss(s, targets([0, 1])));
        assert!((loss - 2f64.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_binary_crossentropy_clips_zero_probabilities() {
        let s = scores([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let loss = scalar(Objective::BinaryCrossentropy.loss(s, targets([1, 0])));
        assert!(loss.is_finite());
    }

    #[test]
    fn test_binary_crossentropy_saturated_hits_stay_finite() {
        // Probability exactly 1 on the target column
        let s = scores([[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        let loss = scalar(Objective::BinaryCrossentropy.loss(s, targets([0, 2])));
        assert!(loss.is_finite());
        assert!(loss >= 0.0 && loss < 1e-5);
    }

    #[test]
    fn test_half_precision_clip_stays_below_one() {
        use half::f16;

        let eps = clip_epsilon(Precision::Half);
        let upper = f16::from_f64(1.0 - eps);
        assert!(upper < f16::ONE);
        assert!(f16::from_f64(eps) > f16::ZERO);
        // The single-precision ε would round up to 1 in float16
        assert_eq!(f16::from_f64(1.0 - clip_epsilon(Precision::Full)), f16::ONE);
        assert_eq!(clip_epsilon(Precision::Full), 1e-7);
    }
}
