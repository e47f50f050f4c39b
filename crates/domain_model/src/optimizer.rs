//! Adam with L2 weight decay, and plateau-driven learning rate decay

use serde::{Deserialize, Serialize};
use tracing::info;

/// Adam optimizer; decay is added to the gradient before the moment updates
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    weight_decay: f32,
    step: i32,
    first_moment: Vec<Vec<f32>>,
    second_moment: Vec<Vec<f32>>,
}

impl Adam {
    pub fn new(learning_rate: f32, weight_decay: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            weight_decay,
            step: 0,
            first_moment: Vec::new(),
            second_moment: Vec::new(),
        }
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }

    pub fn steps(&self) -> i32 {
        self.step
    }

    /// Applies one update; `params` and `grads` must list buffers in the same order
    pub fn step(&mut self, params: Vec<&mut [f32]>, grads: Vec<&[f32]>) {
        debug_assert_eq!(params.len(), grads.len());
        if self.first_moment.len() != params.len() {
            self.first_moment = params.iter().map(|p| vec![0.0; p.len()]).collect();
            self.second_moment = params.iter().map(|p| vec![0.0; p.len()]).collect();
        }

        self.step = self.step.saturating_add(1);
        let bias1 = 1.0 - self.beta1.powi(self.step);
        let bias2 = 1.0 - self.beta2.powi(self.step);

        for (((param, grad), m), v) in params
            .into_iter()
            .zip(grads)
            .zip(&mut self.first_moment)
            .zip(&mut self.second_moment)
        {
            for i in 0..param.len() {
                let g = grad[i] + self.weight_decay * param[i];
                m[i] = self.beta1 * m[i] + (1.0 - self.beta1) * g;
                v[i] = self.beta2 * v[i] + (1.0 - self.beta2) * g * g;
                let m_hat = m[i] / bias1;
                let v_hat = v[i] / bias2;
                param[i] -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
            }
        }
    }
}

/// Multiplies the learning rate by `factor` once the monitored loss has
/// failed to improve for more than `patience` consecutive checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlateauScheduler {
    factor: f32,
    patience: usize,
    threshold: f32,
    min_learning_rate: f32,
    best: f32,
    bad_checks: usize,
}

impl PlateauScheduler {
    pub fn new(factor: f32, patience: usize) -> Self {
        Self {
            factor,
            patience,
            threshold: 1e-4,
            min_learning_rate: 0.0,
            best: f32::INFINITY,
            bad_checks: 0,
        }
    }

    /// Records a loss value; returns true when the learning rate was reduced
    pub fn observe(&mut self, loss: f32, optimizer: &mut Adam) -> bool {
        // relative threshold, minimizing
        if loss < self.best * (1.0 - self.threshold) {
            self.best = loss;
            self.bad_checks = 0;
            return false;
        }

        self.bad_checks += 1;
        if self.bad_checks <= self.patience {
            return false;
        }

        self.bad_checks = 0;
        let old = optimizer.learning_rate();
        let new = (old * self.factor).max(self.min_learning_rate);
        if old - new <= f32::EPSILON * old {
            return false;
        }
        optimizer.set_learning_rate(new);
        info!(old_lr = old, new_lr = new, "Reducing learning rate on plateau");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adam_moves_against_gradient() {
        let mut adam = Adam::new(0.1, 0.0);
        let mut params = vec![1.0f32, -1.0];
        let grads = vec![0.5f32, -0.5];
        adam.step(vec![params.as_mut_slice()], vec![grads.as_slice()]);
        // first bias-corrected step has magnitude ~lr
        assert!((params[0] - 0.9).abs() < 1e-4);
        assert!((params[1] + 0.9).abs() < 1e-4);
        assert_eq!(adam.steps(), 1);
    }

    #[test]
    fn test_adam_weight_decay_shrinks_params() {
        let mut adam = Adam::new(0.01, 0.5);
        let mut params = vec![2.0f32];
        adam.step(vec![params.as_mut_slice()], vec![[0.0f32].as_slice()]);
        assert!(params[0] < 2.0);
    }

    #[test]
    fn test_adam_minimizes_quadratic() {
        let mut adam = Adam::new(0.05, 0.0);
        let mut x = vec![5.0f32];
        for _ in 0..500 {
            let grad = vec![2.0 * x[0]];
            adam.step(vec![x.as_mut_slice()], vec![grad.as_slice()]);
        }
        assert!(x[0].abs() < 0.1);
    }

    #[test]
    fn test_plateau_reduces_after_patience() {
        let mut adam = Adam::new(1e-3, 0.0);
        let mut scheduler = PlateauScheduler::new(0.5, 2);

        assert!(!scheduler.observe(1.0, &mut adam));
        assert!(!scheduler.observe(1.0, &mut adam));
        assert!(!scheduler.observe(1.0, &mut adam));
        assert!(scheduler.observe(1.0, &mut adam));
        assert!((adam.learning_rate() - 5e-4).abs() < 1e-9);
    }

    #[test]
    fn test_plateau_resets_on_improvement() {
        let mut adam = Adam::new(1e-3, 0.0);
        let mut scheduler = PlateauScheduler::new(0.5, 1);

        scheduler.observe(1.0, &mut adam);
        scheduler.observe(1.0, &mut adam);
        scheduler.observe(0.5, &mut adam);
        assert!(!scheduler.observe(0.5, &mut adam));
        assert_eq!(adam.learning_rate(), 1e-3);
    }

    #[test]
    fn test_nan_loss_counts_as_no_improvement() {
        let mut adam = Adam::new(1e-3, 0.0);
        let mut scheduler = PlateauScheduler::new(0.5, 0);
        scheduler.observe(1.0, &mut adam);
        assert!(scheduler.observe(f32::NAN, &mut adam));
    }
}
