//! Temperature scaling of classifier logits

use serde::{Deserialize, Serialize};

use domain_features::ReimbursementClass;

use crate::error::ModelError;

/// Default temperature; values above 1 soften overconfident logits
pub const DEFAULT_TEMPERATURE: f32 = 2.0;

/// Temperatures must exceed this so calibration only ever dampens confidence
pub const MIN_TEMPERATURE: f32 = 1.0;

/// Added to every exponential so no probability is exactly zero
const SOFTMAX_EPSILON: f64 = 1e-10;

const CLASS_COUNT: usize = ReimbursementClass::COUNT;

/// Calibrated classification result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibrated {
    pub class: ReimbursementClass,
    /// Probability of `class`, in (0, 1]
    pub confidence: f64,
    pub probabilities: [f64; CLASS_COUNT],
}

/// Divides logits by a fixed temperature before the softmax
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureCalibrator {
    temperature: f32,
}

impl Default for TemperatureCalibrator {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl TemperatureCalibrator {
    /// # Errors
    ///
    /// [`ModelError::InvalidTemperature`] unless `temperature` is finite and
    /// greater than [`MIN_TEMPERATURE`].
    pub fn new(temperature: f32) -> Result<Self, ModelError> {
        if temperature.is_finite() && temperature > MIN_TEMPERATURE {
            Ok(Self { temperature })
        } else {
            Err(ModelError::InvalidTemperature(temperature))
        }
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Picks the most probable class and its calibrated confidence
    ///
    /// Ties resolve to the lowest class index.
    ///
    /// # Errors
    ///
    /// [`ModelError::NonFinite`] if any logit is NaN or infinite.
    pub fn calibrate(&self, logits: &[f32; CLASS_COUNT]) -> Result<Calibrated, ModelError> {
        if !logits.iter().all(|l| l.is_finite()) {
            return Err(ModelError::NonFinite { what: "class logits" });
        }

        let temperature = f64::from(self.temperature);
        let scaled = logits.map(|l| f64::from(l) / temperature);
        let max = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps = scaled.map(|s| (s - max).exp() + SOFTMAX_EPSILON);
        let total: f64 = exps.iter().sum();
        let probabilities = exps.map(|e| e / total);

        let mut best = 0;
        for (i, p) in probabilities.iter().enumerate().skip(1) {
            if *p > probabilities[best] {
                best = i;
            }
        }

        Ok(Calibrated {
            // best < CLASS_COUNT by construction
            class: ReimbursementClass::from_index(best).unwrap_or(ReimbursementClass::Low),
            confidence: probabilities[best],
            probabilities,
        })
    }
}

/// Scales the predicted fraction by the amount paid; negative totals count as zero
pub fn reimbursement_amount(fraction: f32, total_amount_paid: f64) -> f64 {
    f64::from(fraction.clamp(0.0, 1.0)) * total_amount_paid.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_softens_confidence() {
        let logits = [2.0, 1.0, 0.0];
        let plain = TemperatureCalibrator { temperature: 1.0 }.calibrate(&logits).unwrap();
        let soft = TemperatureCalibrator::default().calibrate(&logits).unwrap();

        assert_eq!(plain.class, ReimbursementClass::Low);
        assert_eq!(soft.class, ReimbursementClass::Low);
        assert!(soft.confidence < plain.confidence);
        assert!((plain.confidence - 0.6652).abs() < 1e-3);
        assert!((soft.confidence - 0.5065).abs() < 1e-3);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let out = TemperatureCalibrator::default().calibrate(&[0.3, -1.2, 4.0]).unwrap();
        let sum: f64 = out.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert_eq!(out.class, ReimbursementClass::High);
    }

    #[test]
    fn test_ties_pick_lowest_index() {
        let out = TemperatureCalibrator::default().calibrate(&[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(out.class, ReimbursementClass::Low);
        assert!((out.confidence - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_extreme_logits_keep_confidence_in_range() {
        let out = TemperatureCalibrator::default().calibrate(&[1e30, -1e30, 0.0]).unwrap();
        assert!(out.confidence > 0.0 && out.confidence <= 1.0);
        assert!(out.probabilities.iter().all(|p| *p > 0.0));
    }

    #[test]
    fn test_non_finite_logits_rejected() {
        let calibrator = TemperatureCalibrator::default();
        assert!(calibrator.calibrate(&[f32::NAN, 0.0, 0.0]).is_err());
        assert!(calibrator.calibrate(&[f32::INFINITY, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_invalid_temperature_rejected() {
        assert!(TemperatureCalibrator::new(0.0).is_err());
        assert!(TemperatureCalibrator::new(-1.0).is_err());
        assert!(TemperatureCalibrator::new(f32::NAN).is_err());
        assert!(TemperatureCalibrator::new(f32::INFINITY).is_err());
    }

    #[test]
    fn test_sharpening_temperatures_rejected() {
        assert!(matches!(
            TemperatureCalibrator::new(0.5),
            Err(ModelError::InvalidTemperature(t)) if t == 0.5
        ));
        assert!(TemperatureCalibrator::new(1.0).is_err());
        assert_eq!(TemperatureCalibrator::new(1.5).unwrap().temperature(), 1.5);
    }

    #[test]
    fn test_reimbursement_amount() {
        assert_eq!(reimbursement_amount(0.5, 200.0), 100.0);
        assert_eq!(reimbursement_amount(0.5, -50.0), 0.0);
        assert_eq!(reimbursement_amount(0.0, 1000.0), 0.0);
    }
}
