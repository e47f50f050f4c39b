//! Held-out evaluation: accuracy, support-weighted precision/recall/F1,
//! confusion matrix and calibrated confidence statistics

use serde::{Deserialize, Serialize};

use domain_features::ReimbursementClass;

const CLASS_COUNT: usize = ReimbursementClass::COUNT;

/// Rows are true classes, columns are predictions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix([[usize; CLASS_COUNT]; CLASS_COUNT]);

impl ConfusionMatrix {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (ReimbursementClass, ReimbursementClass)>) -> Self {
        let mut counts = [[0; CLASS_COUNT]; CLASS_COUNT];
        for (truth, predicted) in pairs {
            counts[truth.index()][predicted.index()] += 1;
        }
        Self(counts)
    }

    pub fn count(&self, truth: ReimbursementClass, predicted: ReimbursementClass) -> usize {
        self.0[truth.index()][predicted.index()]
    }

    pub fn total(&self) -> usize {
        self.0.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..CLASS_COUNT).map(|i| self.0[i][i]).sum()
    }

    /// Number of true samples of `class`
    pub fn support(&self, class: ReimbursementClass) -> usize {
        self.0[class.index()].iter().sum()
    }

    fn predicted(&self, class: ReimbursementClass) -> usize {
        self.0.iter().map(|row| row[class.index()]).sum()
    }

    pub fn rows(&self) -> &[[usize; CLASS_COUNT]; CLASS_COUNT] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion: ConfusionMatrix,
}

impl ClassificationMetrics {
    /// Support-weighted averages; undefined ratios count as zero
    pub fn from_confusion(confusion: ConfusionMatrix) -> Self {
        let total = confusion.total();
        if total == 0 {
            return Self {
                confusion,
                ..Self::default()
            };
        }

        let (mut precision, mut recall, mut f1) = (0.0, 0.0, 0.0);
        for class in ReimbursementClass::ALL {
            let tp = confusion.count(class, class) as f64;
            let support = confusion.support(class);
            let predicted = confusion.predicted(class);
            let p = ratio(tp, predicted as f64);
            let r = ratio(tp, support as f64);
            let f = ratio(2.0 * p * r, p + r);

            let weight = support as f64 / total as f64;
            precision += weight * p;
            recall += weight * r;
            f1 += weight * f;
        }

        Self {
            accuracy: confusion.correct() as f64 / total as f64,
            precision,
            recall,
            f1,
            confusion,
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSummary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl ConfidenceSummary {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Some(Self { mean, min, max })
    }
}

/// Test-split report produced after training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub samples: usize,
    pub classification: ClassificationMetrics,
    /// `None` when the test split is empty
    pub confidence: Option<ConfidenceSummary>,
    /// Mean absolute error of the predicted reimbursement fraction
    pub fraction_mae: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReimbursementClass::*;

    #[test]
    fn test_perfect_predictions() {
        let confusion = ConfusionMatrix::from_pairs([(Low, Low), (Medium, Medium), (High, High)]);
        let metrics = ClassificationMetrics::from_confusion(confusion);
        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(metrics.precision, 1.0);
        assert_eq!(metrics.recall, 1.0);
        assert_eq!(metrics.f1, 1.0);
    }

    #[test]
    fn test_weighted_averages() {
        // truth: Low x3, High x1; predictions all Low
        let confusion = ConfusionMatrix::from_pairs([(Low, Low), (Low, Low), (Low, Low), (High, Low)]);
        let metrics = ClassificationMetrics::from_confusion(confusion);

        assert_eq!(metrics.accuracy, 0.75);
        // Low: p = 3/4, r = 1, weight 3/4; High: p = r = 0 (no predictions)
        assert!((metrics.precision - 0.5625).abs() < 1e-12);
        assert!((metrics.recall - 0.75).abs() < 1e-12);
        let low_f1 = 2.0 * 0.75 / 1.75;
        assert!((metrics.f1 - 0.75 * low_f1).abs() < 1e-12);
        assert_eq!(confusion.count(High, Low), 1);
    }

    #[test]
    fn test_empty_confusion_is_all_zero() {
        let metrics = ClassificationMetrics::from_confusion(ConfusionMatrix::default());
        assert_eq!(metrics.accuracy, 0.0);
        assert_eq!(metrics.f1, 0.0);
    }

    #[test]
    fn test_confidence_summary() {
        let summary = ConfidenceSummary::from_values(&[0.4, 0.6, 0.8]).unwrap();
        assert!((summary.mean - 0.6).abs() < 1e-12);
        assert_eq!(summary.min, 0.4);
        assert_eq!(summary.max, 0.8);
        assert!(ConfidenceSummary::from_values(&[]).is_none());
    }
}
