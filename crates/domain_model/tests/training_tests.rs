//! Tests for the training pipeline

use domain_features::FeatureExtractor;
use domain_model::{
    ArtifactStore, ExclusionReason, LabeledSample, MemoryArtifactStore, ModelArtifact, ModelVersion,
    TrainingConfig, TrainingError, TrainingPipeline,
};
use test_utils::{ClaimRecordBuilder, CorpusFixtures, IdFixtures, PolicyholderRecordBuilder, TemporalFixtures};

fn corpus(count: usize) -> Vec<LabeledSample> {
    CorpusFixtures::labeled(count)
        .into_iter()
        .map(|(claim, holder)| LabeledSample::new(claim, Some(holder)))
        .collect()
}

fn pipeline(config: TrainingConfig) -> TrainingPipeline {
    TrainingPipeline::new(config, FeatureExtractor::default())
        .with_reference_time(TemporalFixtures::reference_time())
}

// ============================================================================
// Checkpointing and versions
// ============================================================================

mod checkpoint_tests {
    use super::*;

    #[test]
    fn test_default_run_checkpoints_from_initial_version() {
        let store = MemoryArtifactStore::new();
        let outcome = pipeline(TrainingConfig::default()).run(corpus(60), &store).unwrap();

        let versions = store.saved_versions();
        assert!(!versions.is_empty());
        assert_eq!(versions[0], ModelVersion::initial());
        assert!(versions.windows(2).all(|w| w[1] > w[0]));

        let artifact = outcome.artifact.expect("at least one checkpoint");
        assert_eq!(Some(artifact.version), versions.last().copied());
        assert!(artifact.preprocessor.is_some());
        assert_eq!(store.load().unwrap(), Some(artifact));
        assert_eq!(outcome.epochs_run, 30);
        assert_eq!(outcome.samples_used, 60);
    }

    #[test]
    fn test_versions_continue_from_stored_artifact() {
        let mut existing = ModelArtifact::untrained(7);
        existing.version = ModelVersion::new(1, 4);
        let store = MemoryArtifactStore::with_artifact(existing);

        pipeline(TrainingConfig::default()).run(corpus(60), &store).unwrap();

        let versions = store.saved_versions();
        assert_eq!(versions[1], ModelVersion::new(1, 5));
        assert!(versions.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_early_stopping_when_loss_is_flat() {
        let config = TrainingConfig {
            max_epochs: 100,
            eval_every: 1,
            learning_rate: 0.0,
            weight_decay: 0.0,
            early_stopping_patience: 3,
            ..TrainingConfig::default()
        };
        let store = MemoryArtifactStore::new();
        let outcome = pipeline(config).run(corpus(30), &store).unwrap();

        assert_eq!(outcome.epochs_run, 4);
        assert_eq!(store.saved_versions(), vec![ModelVersion::initial()]);
    }
}

// ============================================================================
// Sample handling
// ============================================================================

mod sample_tests {
    use super::*;

    #[test]
    fn test_unusable_samples_are_excluded_not_fatal() {
        let mut samples = corpus(45);

        let orphan = ClaimRecordBuilder::new()
            .with_id(IdFixtures::claim_id_n(900))
            .with_class("High")
            .build();
        samples.push(LabeledSample::new(orphan, None));

        let unlabeled = ClaimRecordBuilder::new().with_id(IdFixtures::claim_id_n(901)).build();
        samples.push(LabeledSample::new(unlabeled, Some(PolicyholderRecordBuilder::new().build())));

        let odd_label = ClaimRecordBuilder::new()
            .with_id(IdFixtures::claim_id_n(902))
            .with_class("VeryHigh")
            .build();
        samples.push(LabeledSample::new(odd_label, Some(PolicyholderRecordBuilder::new().build())));

        let broken = ClaimRecordBuilder::new()
            .with_id(IdFixtures::claim_id_n(903))
            .with_class("Low")
            .without_treatment_details()
            .build();
        samples.push(LabeledSample::new(broken, Some(PolicyholderRecordBuilder::new().build())));

        let outcome = pipeline(TrainingConfig::default())
            .run(samples, &MemoryArtifactStore::new())
            .unwrap();

        assert_eq!(outcome.samples_used, 45);
        let reasons: Vec<_> = outcome.excluded.iter().map(|e| &e.reason).collect();
        assert_eq!(reasons.len(), 4);
        assert_eq!(reasons[0], &ExclusionReason::MissingPolicyholder);
        assert_eq!(reasons[1], &ExclusionReason::MissingLabel);
        assert_eq!(reasons[2], &ExclusionReason::UnrecognizedLabel("VeryHigh".to_string()));
        assert!(matches!(reasons[3], ExclusionReason::Extraction(e) if e.is_structural()));
        assert_eq!(outcome.excluded[0].claim_id, IdFixtures::claim_id_n(900));
    }

    #[test]
    fn test_no_valid_samples_is_an_error() {
        let samples = vec![LabeledSample::new(ClaimRecordBuilder::new().build(), None)];
        let store = MemoryArtifactStore::new();

        let err = pipeline(TrainingConfig::default()).run(samples, &store).unwrap_err();
        assert!(matches!(err, TrainingError::NoValidSamples { excluded: 1 }));
        assert!(store.saved_versions().is_empty());
    }

    #[test]
    fn test_single_class_corpus_still_trains() {
        let samples: Vec<_> = corpus(60).into_iter().step_by(3).collect();
        let outcome = pipeline(TrainingConfig::default())
            .run(samples, &MemoryArtifactStore::new())
            .unwrap();

        let weights = outcome.class_weights.as_array();
        assert!((weights[0] - 3.0).abs() < 1e-5);
        assert_eq!(weights[1], 0.0);
        assert_eq!(weights[2], 0.0);
    }
}

// ============================================================================
// Reproducibility and learning
// ============================================================================

mod learning_tests {
    use super::*;

    #[test]
    fn test_same_inputs_same_weights() {
        let a = pipeline(TrainingConfig::default())
            .run(corpus(60), &MemoryArtifactStore::new())
            .unwrap();
        let b = pipeline(TrainingConfig::default())
            .run(corpus(60), &MemoryArtifactStore::new())
            .unwrap();
        assert_eq!(a.artifact, b.artifact);
        assert_eq!(a.report, b.report);
    }

    #[test]
    fn test_report_covers_test_split() {
        let outcome = pipeline(TrainingConfig::default())
            .run(corpus(60), &MemoryArtifactStore::new())
            .unwrap();

        // 20 per class, round(20 * 0.15) = 3 each
        assert_eq!(outcome.report.samples, 9);
        assert_eq!(outcome.report.classification.confusion.total(), 9);
        let confidence = outcome.report.confidence.expect("non-empty test split");
        assert!(confidence.min > 0.0 && confidence.max <= 1.0);
        assert!(confidence.min <= confidence.mean && confidence.mean <= confidence.max);
    }

    #[test]
    fn test_separable_corpus_is_learned() {
        let config = TrainingConfig {
            max_epochs: 200,
            learning_rate: 1e-2,
            ..TrainingConfig::default()
        };
        let outcome = pipeline(config).run(corpus(90), &MemoryArtifactStore::new()).unwrap();

        assert!(
            outcome.report.classification.accuracy >= 0.6,
            "accuracy {}",
            outcome.report.classification.accuracy
        );
        assert!(outcome.report.fraction_mae < 0.3);
    }
}
