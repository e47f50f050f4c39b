//! The dual-head estimator network
//!
//! Two independent stacks share only the input:
//!
//! ```text
//! classifier: 12 -> 64 -> ReLU -> Dropout -> 32 -> ReLU -> 3 (logits)
//! regressor:  12 -> 64 -> ReLU -> Dropout -> 32 -> ReLU -> 1 -> sigmoid
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use domain_features::{FeatureVector, ReimbursementClass, FEATURE_COUNT};

use crate::error::ModelError;
use crate::layers::{relu, sigmoid, Dense, DenseGrad};

pub const HIDDEN_UNITS: usize = 64;
pub const BOTTLENECK_UNITS: usize = 32;
pub const DEFAULT_DROPOUT: f32 = 0.3;

const CLASS_COUNT: usize = ReimbursementClass::COUNT;

/// Output of a single forward pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadOutputs {
    /// Raw class scores, uncalibrated
    pub class_logits: [f32; CLASS_COUNT],
    /// Reimbursed share of the amount paid, in [0, 1]
    pub reimbursement_fraction: f32,
}

/// One feed-forward stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Head {
    hidden: Dense,
    bottleneck: Dense,
    output: Dense,
    dropout: f32,
}

/// Intermediate activations kept for the backward pass
#[derive(Debug, Clone)]
pub struct HeadTrace {
    hidden: Vec<f32>,
    dropout_mask: Option<Vec<f32>>,
    dropped: Vec<f32>,
    bottleneck: Vec<f32>,
    pub output: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct HeadGrad {
    hidden: DenseGrad,
    bottleneck: DenseGrad,
    output: DenseGrad,
}

impl Head {
    fn new<R: Rng + ?Sized>(outputs: usize, dropout: f32, rng: &mut R) -> Self {
        Self {
            hidden: Dense::new(FEATURE_COUNT, HIDDEN_UNITS, rng),
            bottleneck: Dense::new(HIDDEN_UNITS, BOTTLENECK_UNITS, rng),
            output: Dense::new(BOTTLENECK_UNITS, outputs, rng),
            dropout,
        }
    }

    /// Raw output before the head's final activation
    fn forward(&self, input: &[f32]) -> Vec<f32> {
        let mut hidden = self.hidden.forward(input);
        relu(&mut hidden);
        let mut bottleneck = self.bottleneck.forward(&hidden);
        relu(&mut bottleneck);
        self.output.forward(&bottleneck)
    }

    /// Forward pass that records activations; dropout is applied when `rng` is given
    fn forward_trace(&self, input: &[f32], rng: Option<&mut ChaCha8Rng>) -> HeadTrace {
        let mut hidden = self.hidden.forward(input);
        relu(&mut hidden);

        let dropout_mask = rng.filter(|_| self.dropout > 0.0).map(|rng| {
            let keep = 1.0 - self.dropout;
            (0..hidden.len())
                .map(|_| if rng.gen::<f32>() < keep { 1.0 / keep } else { 0.0 })
                .collect::<Vec<f32>>()
        });
        let dropped = match &dropout_mask {
            Some(mask) => hidden.iter().zip(mask).map(|(h, m)| h * m).collect(),
            None => hidden.clone(),
        };

        let mut bottleneck = self.bottleneck.forward(&dropped);
        relu(&mut bottleneck);
        let output = self.output.forward(&bottleneck);

        HeadTrace {
            hidden,
            dropout_mask,
            dropped,
            bottleneck,
            output,
        }
    }

    /// Backpropagates dL/d(raw output) through the stack
    fn backward(&self, input: &[f32], trace: &HeadTrace, grad_output: &[f32], grad: &mut HeadGrad) {
        let mut g = self.output.backward(&trace.bottleneck, grad_output, &mut grad.output);
        relu_backward(&mut g, &trace.bottleneck);

        let mut g = self.bottleneck.backward(&trace.dropped, &g, &mut grad.bottleneck);
        if let Some(mask) = &trace.dropout_mask {
            g.iter_mut().zip(mask).for_each(|(g, m)| *g *= m);
        }
        relu_backward(&mut g, &trace.hidden);

        self.hidden.backward(input, &g, &mut grad.hidden);
    }

    fn zero_grad(&self) -> HeadGrad {
        HeadGrad {
            hidden: self.hidden.zero_grad(),
            bottleneck: self.bottleneck.zero_grad(),
            output: self.output.zero_grad(),
        }
    }

    fn params_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        let [a, b] = self.hidden.params_mut();
        let [c, d] = self.bottleneck.params_mut();
        let [e, f] = self.output.params_mut();
        [a, b, c, d, e, f].into_iter()
    }

    fn validate(&self, outputs: usize) -> Result<(), ModelError> {
        self.hidden.validate("hidden")?;
        self.bottleneck.validate("bottleneck")?;
        self.output.validate("output")?;
        let shapes = [
            ("hidden", self.hidden.inputs(), FEATURE_COUNT),
            ("hidden", self.hidden.outputs(), HIDDEN_UNITS),
            ("bottleneck", self.bottleneck.inputs(), HIDDEN_UNITS),
            ("bottleneck", self.bottleneck.outputs(), BOTTLENECK_UNITS),
            ("output", self.output.inputs(), BOTTLENECK_UNITS),
            ("output", self.output.outputs(), outputs),
        ];
        for (layer, found, expected) in shapes {
            if found != expected {
                return Err(ModelError::ShapeMismatch {
                    layer,
                    expected,
                    found,
                });
            }
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::NonFinite { what: "dropout" });
        }
        Ok(())
    }
}

impl HeadGrad {
    fn slices(&self) -> impl Iterator<Item = &[f32]> {
        let [a, b] = self.hidden.slices();
        let [c, d] = self.bottleneck.slices();
        let [e, f] = self.output.slices();
        [a, b, c, d, e, f].into_iter()
    }

    fn scale(&mut self, factor: f32) {
        self.hidden.scale(factor);
        self.bottleneck.scale(factor);
        self.output.scale(factor);
    }
}

fn relu_backward(grad: &mut [f32], activation: &[f32]) {
    grad.iter_mut()
        .zip(activation)
        .filter(|(_, a)| **a <= 0.0)
        .for_each(|(g, _)| *g = 0.0);
}

/// Classifier and regressor heads over the same feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualHeadModel {
    classifier: Head,
    regressor: Head,
}

/// Activations from a training-mode forward pass
#[derive(Debug, Clone)]
pub struct ModelTrace {
    classifier: HeadTrace,
    regressor: HeadTrace,
}

/// Gradients for every parameter of a [`DualHeadModel`]
#[derive(Debug, Clone)]
pub struct ModelGrad {
    classifier: HeadGrad,
    regressor: HeadGrad,
}

impl DualHeadModel {
    /// Untrained model with seeded initialization and the default dropout rate
    pub fn new(seed: u64) -> Self {
        Self::with_dropout(seed, DEFAULT_DROPOUT)
    }

    pub fn with_dropout(seed: u64, dropout: f32) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let dropout = if (0.0..1.0).contains(&dropout) { dropout } else { DEFAULT_DROPOUT };
        Self {
            classifier: Head::new(CLASS_COUNT, dropout, &mut rng),
            regressor: Head::new(1, dropout, &mut rng),
        }
    }

    /// Inference-mode forward pass (no dropout)
    pub fn forward(&self, features: &FeatureVector) -> HeadOutputs {
        let logits = self.classifier.forward(features.as_slice());
        let raw = self.regressor.forward(features.as_slice());

        let mut class_logits = [0.0; CLASS_COUNT];
        class_logits.copy_from_slice(&logits[..CLASS_COUNT]);
        HeadOutputs {
            class_logits,
            reimbursement_fraction: sigmoid(raw[0]),
        }
    }

    /// Training-mode forward pass; dropout is active when `rng` is given
    pub fn forward_trace(&self, features: &FeatureVector, mut rng: Option<&mut ChaCha8Rng>) -> ModelTrace {
        ModelTrace {
            classifier: self.classifier.forward_trace(features.as_slice(), rng.as_deref_mut()),
            regressor: self.regressor.forward_trace(features.as_slice(), rng),
        }
    }

    /// Accumulates gradients for one sample
    ///
    /// `grad_logits` is dL/d(logits); `grad_fraction_raw` is dL/d(pre-sigmoid output).
    pub fn backward(
        &self,
        features: &FeatureVector,
        trace: &ModelTrace,
        grad_logits: &[f32; CLASS_COUNT],
        grad_fraction_raw: f32,
        grad: &mut ModelGrad,
    ) {
        let input = features.as_slice();
        self.classifier
            .backward(input, &trace.classifier, grad_logits, &mut grad.classifier);
        self.regressor
            .backward(input, &trace.regressor, &[grad_fraction_raw], &mut grad.regressor);
    }

    pub fn zero_grad(&self) -> ModelGrad {
        ModelGrad {
            classifier: self.classifier.zero_grad(),
            regressor: self.regressor.zero_grad(),
        }
    }

    /// Every parameter buffer, classifier first, in a stable order
    pub fn params_mut(&mut self) -> Vec<&mut [f32]> {
        self.classifier
            .params_mut()
            .chain(self.regressor.params_mut())
            .collect()
    }

    /// Checks layer shapes and weights after deserialization
    pub fn validate(&self) -> Result<(), ModelError> {
        self.classifier.validate(CLASS_COUNT)?;
        self.regressor.validate(1)
    }
}

impl ModelTrace {
    pub fn class_logits(&self) -> [f32; CLASS_COUNT] {
        let mut logits = [0.0; CLASS_COUNT];
        logits.copy_from_slice(&self.classifier.output[..CLASS_COUNT]);
        logits
    }

    pub fn reimbursement_fraction(&self) -> f32 {
        sigmoid(self.regressor.output[0])
    }
}

impl ModelGrad {
    /// Gradient buffers in the order of [`DualHeadModel::params_mut`]
    pub fn slices(&self) -> Vec<&[f32]> {
        self.classifier.slices().chain(self.regressor.slices()).collect()
    }

    pub fn scale(&mut self, factor: f32) {
        self.classifier.scale(factor);
        self.regressor.scale(factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features() -> FeatureVector {
        FeatureVector::new([0.5, -1.0, 0.2, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, -0.3, 0.4, 0.8])
    }

    #[test]
    fn test_same_seed_same_weights() {
        assert_eq!(DualHeadModel::new(42), DualHeadModel::new(42));
        assert_ne!(DualHeadModel::new(42), DualHeadModel::new(43));
    }

    #[test]
    fn test_forward_shapes_and_range() {
        let out = DualHeadModel::new(1).forward(&features());
        assert!(out.class_logits.iter().all(|l| l.is_finite()));
        assert!((0.0..=1.0).contains(&out.reimbursement_fraction));
    }

    #[test]
    fn test_trace_without_dropout_matches_inference() {
        let model = DualHeadModel::new(5);
        let trace = model.forward_trace(&features(), None);
        let out = model.forward(&features());
        assert_eq!(trace.class_logits(), out.class_logits);
        assert_eq!(trace.reimbursement_fraction(), out.reimbursement_fraction);
    }

    #[test]
    fn test_param_and_grad_buffers_align() {
        let mut model = DualHeadModel::new(3);
        let grad = model.zero_grad();
        let grad_lens: Vec<usize> = grad.slices().iter().map(|s| s.len()).collect();
        let param_lens: Vec<usize> = model.params_mut().iter().map(|s| s.len()).collect();
        assert_eq!(grad_lens, param_lens);
        assert_eq!(param_lens.len(), 12);
    }

    #[test]
    fn test_classifier_gradient_matches_finite_difference() {
        let model = DualHeadModel::new(9);
        let x = features();
        // L = logit[1]
        let trace = model.forward_trace(&x, None);
        let mut grad = model.zero_grad();
        model.backward(&x, &trace, &[0.0, 1.0, 0.0], 0.0, &mut grad);

        let analytic = grad.classifier.hidden.bias[0];
        let eps = 1e-3;
        let mut bumped = model.clone();
        bumped.params_mut()[1][0] += eps;
        let numeric = (bumped.forward(&x).class_logits[1] - model.forward(&x).class_logits[1]) / eps;
        assert!((numeric - analytic).abs() < 1e-2, "numeric {numeric} vs analytic {analytic}");
    }

    #[test]
    fn test_validate_accepts_fresh_model() {
        assert!(DualHeadModel::new(0).validate().is_ok());
    }
}
