//! Seeded stratified train/validation/test partition

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use domain_features::ReimbursementClass;

/// Row indices for each partition, sorted ascending
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    pub fn len(&self) -> usize {
        self.train.len() + self.validation.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Splits rows per class so each partition keeps the class proportions
///
/// Each class contributes `round(n * test_fraction)` rows to test and
/// `round(n * validation_fraction)` to validation, always leaving at least
/// one row of the class for training. The same labels and seed always
/// produce the same partition.
pub fn stratified_split(
    labels: &[ReimbursementClass],
    validation_fraction: f64,
    test_fraction: f64,
    seed: u64,
) -> SplitIndices {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut split = SplitIndices::default();

    for class in ReimbursementClass::ALL {
        let mut rows: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| **label == class)
            .map(|(i, _)| i)
            .collect();
        if rows.is_empty() {
            continue;
        }
        rows.shuffle(&mut rng);

        let n = rows.len();
        let mut n_test = share(n, test_fraction);
        let mut n_validation = share(n, validation_fraction);
        while n_test + n_validation >= n {
            if n_validation > 0 {
                n_validation -= 1;
            } else {
                n_test -= 1;
            }
        }

        split.test.extend_from_slice(&rows[..n_test]);
        split.validation.extend_from_slice(&rows[n_test..n_test + n_validation]);
        split.train.extend_from_slice(&rows[n_test + n_validation..]);
    }

    split.train.sort_unstable();
    split.validation.sort_unstable();
    split.test.sort_unstable();
    split
}

fn share(n: usize, fraction: f64) -> usize {
    (n as f64 * fraction.clamp(0.0, 1.0)).round() as usize
}
