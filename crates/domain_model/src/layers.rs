//! Dense layers with a hand-written backward pass
//!
//! Weights are stored row-major (`outputs x inputs`), one row per output unit.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Fully connected layer `y = W x + b`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    inputs: usize,
    outputs: usize,
    weights: Vec<f32>,
    bias: Vec<f32>,
}

/// Accumulated gradients for one [`Dense`] layer
#[derive(Debug, Clone, PartialEq)]
pub struct DenseGrad {
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
}

impl Dense {
    /// Initializes weights and bias uniformly in ±1/√inputs
    pub fn new<R: Rng + ?Sized>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (inputs as f32).sqrt();
        let weights = (0..inputs * outputs)
            .map(|_| rng.gen_range(-bound..bound))
            .collect();
        let bias = (0..outputs).map(|_| rng.gen_range(-bound..bound)).collect();
        Self {
            inputs,
            outputs,
            weights,
            bias,
        }
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        debug_assert_eq!(input.len(), self.inputs);
        self.weights
            .chunks_exact(self.inputs)
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect()
    }

    /// Accumulates parameter gradients into `grad` and returns dL/d(input)
    pub fn backward(&self, input: &[f32], grad_output: &[f32], grad: &mut DenseGrad) -> Vec<f32> {
        let mut grad_input = vec![0.0; self.inputs];
        for (o, &g) in grad_output.iter().enumerate() {
            if g == 0.0 {
                continue;
            }
            grad.bias[o] += g;
            let row = o * self.inputs;
            for i in 0..self.inputs {
                grad.weights[row + i] += g * input[i];
                grad_input[i] += g * self.weights[row + i];
            }
        }
        grad_input
    }

    pub fn zero_grad(&self) -> DenseGrad {
        DenseGrad {
            weights: vec![0.0; self.weights.len()],
            bias: vec![0.0; self.bias.len()],
        }
    }

    /// Parameter slices in optimizer order: weights, then bias
    pub fn params_mut(&mut self) -> [&mut [f32]; 2] {
        [&mut self.weights, &mut self.bias]
    }

    /// Checks that deserialized buffers match the declared shape
    pub fn validate(&self, layer: &'static str) -> Result<(), ModelError> {
        if self.weights.len() != self.inputs * self.outputs {
            return Err(ModelError::ShapeMismatch {
                layer,
                expected: self.inputs * self.outputs,
                found: self.weights.len(),
            });
        }
        if self.bias.len() != self.outputs {
            return Err(ModelError::ShapeMismatch {
                layer,
                expected: self.outputs,
                found: self.bias.len(),
            });
        }
        if !self.weights.iter().chain(&self.bias).all(|w| w.is_finite()) {
            return Err(ModelError::NonFinite { what: layer });
        }
        Ok(())
    }
}

impl DenseGrad {
    /// Gradient slices in the same order as [`Dense::params_mut`]
    pub fn slices(&self) -> [&[f32]; 2] {
        [&self.weights, &self.bias]
    }

    pub fn scale(&mut self, factor: f32) {
        self.weights
            .iter_mut()
            .chain(self.bias.iter_mut())
            .for_each(|g| *g *= factor);
    }
}

pub fn relu(values: &mut [f32]) {
    values.iter_mut().for_each(|v| *v = v.max(0.0));
}

pub fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_init_is_bounded_and_seeded() {
        let a = Dense::new(16, 4, &mut ChaCha8Rng::seed_from_u64(7));
        let b = Dense::new(16, 4, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(a, b);
        assert!(a.weights.iter().all(|w| w.abs() <= 0.25));
        assert!(a.validate("test").is_ok());
    }

    #[test]
    fn test_backward_matches_finite_difference() {
        let mut layer = Dense::new(3, 2, &mut ChaCha8Rng::seed_from_u64(1));
        let input = [0.5, -1.0, 2.0];
        // L = sum(y), so dL/dy = 1
        let mut grad = layer.zero_grad();
        layer.backward(&input, &[1.0, 1.0], &mut grad);

        let eps = 1e-3;
        let loss = |l: &Dense| l.forward(&input).iter().sum::<f32>();
        let base = loss(&layer);
        layer.weights[4] += eps;
        let numeric = (loss(&layer) - base) / eps;
        assert!((numeric - grad.weights[4]).abs() < 1e-2);
    }

    #[test]
    fn test_sigmoid_is_bounded() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-100.0) >= 0.0);
        assert!(sigmoid(100.0) <= 1.0);
    }

    #[test]
    fn test_validate_rejects_bad_shape() {
        let mut layer = Dense::new(3, 2, &mut ChaCha8Rng::seed_from_u64(1));
        layer.bias.pop();
        assert!(matches!(layer.validate("out"), Err(ModelError::ShapeMismatch { .. })));
    }
}
