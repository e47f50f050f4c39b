//! Joint objective: class-weighted cross-entropy plus squared error
//!
//! Cross-entropy is a weighted mean, `Σ w_y · nll / Σ w_y`, so rare classes
//! pull harder without changing the overall loss scale.

use serde::{Deserialize, Serialize};

use domain_features::ReimbursementClass;

const CLASS_COUNT: usize = ReimbursementClass::COUNT;

/// Per-class loss weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassWeights([f32; CLASS_COUNT]);

impl ClassWeights {
    pub fn uniform() -> Self {
        Self([1.0; CLASS_COUNT])
    }

    /// Inverse class frequency, normalized to sum to the number of classes
    ///
    /// Classes absent from `labels` get weight zero.
    pub fn inverse_frequency(labels: &[ReimbursementClass]) -> Self {
        let mut counts = [0usize; CLASS_COUNT];
        for label in labels {
            counts[label.index()] += 1;
        }

        let mut weights = [0.0f32; CLASS_COUNT];
        for (w, &count) in weights.iter_mut().zip(&counts) {
            if count > 0 {
                *w = 1.0 / count as f32;
            }
        }

        let total: f32 = weights.iter().sum();
        if total == 0.0 {
            return Self::uniform();
        }
        weights
            .iter_mut()
            .for_each(|w| *w *= CLASS_COUNT as f32 / total);
        Self(weights)
    }

    pub fn weight(&self, class: ReimbursementClass) -> f32 {
        self.0[class.index()]
    }

    pub fn as_array(&self) -> &[f32; CLASS_COUNT] {
        &self.0
    }
}

/// Loss values for one pass over a dataset
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LossBreakdown {
    pub classification: f32,
    pub regression: f32,
}

impl LossBreakdown {
    pub fn total(&self) -> f32 {
        self.classification + self.regression
    }
}

/// Running sums for the weighted-mean cross-entropy and the mean squared error
#[derive(Debug, Default)]
pub struct LossAccumulator {
    weighted_nll: f64,
    weight_sum: f64,
    squared_error: f64,
    samples: usize,
}

impl LossAccumulator {
    pub fn add(&mut self, nll: f32, weight: f32, squared_error: f32) {
        self.weighted_nll += f64::from(weight) * f64::from(nll);
        self.weight_sum += f64::from(weight);
        self.squared_error += f64::from(squared_error);
        self.samples += 1;
    }

    pub fn weight_sum(&self) -> f32 {
        self.weight_sum as f32
    }

    pub fn finish(&self) -> LossBreakdown {
        let classification = if self.weight_sum > 0.0 {
            self.weighted_nll / self.weight_sum
        } else {
            0.0
        };
        let regression = if self.samples > 0 {
            self.squared_error / self.samples as f64
        } else {
            0.0
        };
        LossBreakdown {
            classification: classification as f32,
            regression: regression as f32,
        }
    }
}

/// Numerically stable log-softmax
pub fn log_softmax(logits: &[f32; CLASS_COUNT]) -> [f32; CLASS_COUNT] {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let log_sum = logits.iter().map(|l| (l - max).exp()).sum::<f32>().ln() + max;
    logits.map(|l| l - log_sum)
}

/// Negative log-likelihood of `label` and its gradient with respect to the logits
pub fn cross_entropy(
    logits: &[f32; CLASS_COUNT],
    label: ReimbursementClass,
) -> (f32, [f32; CLASS_COUNT]) {
    let log_probs = log_softmax(logits);
    let mut grad = log_probs.map(f32::exp);
    grad[label.index()] -= 1.0;
    (-log_probs[label.index()], grad)
}
