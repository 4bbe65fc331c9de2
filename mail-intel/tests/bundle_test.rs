//! Integration tests for model persistence and startup loading

use mail_intel::bundle::{load_or_train, ArtifactPaths, BundleSource, ModelBundle};
use mail_intel::config::{AppConfig, TrainingConfig};
use mail_intel::dataset::sample_records;
use mail_intel::error::MlError;
use mail_intel::spam::FeatureAttribution;
use mail_intel::training::train;
use std::fs;
use std::path::Path;

fn trained_bundle() -> ModelBundle {
    train(&sample_records(), &TrainingConfig::default())
        .unwrap()
        .0
}

fn config_for(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.model.dir = dir.join("models");
    config.dataset.path = dir.join("missing.csv");
    config
}

#[test]
fn test_save_and_load_preserves_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::in_dir(dir.path());
    let bundle = trained_bundle();
    bundle.save(&paths).unwrap();

    let loaded = ModelBundle::load(&paths).unwrap();
    assert_eq!(loaded.metadata(), bundle.metadata());
    assert_eq!(loaded.vectorizer().feature_names(), bundle.vectorizer().feature_names());

    for text in [
        "WIN BIG MONEY NOW! CLICK HERE!",
        "Subject: Lunch\n\nLet's grab lunch at noon tomorrow.",
        "",
    ] {
        let (before, after) = (bundle.predict(text), loaded.predict(text));
        assert_eq!(after.label, before.label);
        assert!((after.confidence - before.confidence).abs() < 1e-9);

        let features = |explanation: Vec<FeatureAttribution>| {
            let mut names: Vec<String> = explanation.into_iter().map(|a| a.feature).collect();
            names.sort();
            names
        };
        assert_eq!(
            features(loaded.explain(text, usize::MAX)),
            features(bundle.explain(text, usize::MAX))
        );
    }
}

#[test]
fn test_missing_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::in_dir(dir.path());
    match ModelBundle::load(&paths) {
        Err(MlError::ArtifactMissing(path)) => assert_eq!(path, paths.vectorizer),
        other => panic!("expected missing artifact, got {other:?}"),
    }

    // One artifact alone is not enough.
    trained_bundle().save(&paths).unwrap();
    fs::remove_file(&paths.classifier).unwrap();
    assert!(matches!(
        ModelBundle::load(&paths),
        Err(MlError::ArtifactMissing(_))
    ));
}

#[test]
fn test_corrupt_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::in_dir(dir.path());
    trained_bundle().save(&paths).unwrap();
    fs::write(&paths.classifier, b"{ not json").unwrap();

    assert!(matches!(
        ModelBundle::load(&paths),
        Err(MlError::ArtifactCorrupt { .. })
    ));
}

#[test]
fn test_artifacts_from_different_runs_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let first = ArtifactPaths::in_dir(&dir.path().join("first"));
    let second = ArtifactPaths::in_dir(&dir.path().join("second"));
    trained_bundle().save(&first).unwrap();
    trained_bundle().save(&second).unwrap();

    fs::copy(&second.classifier, &first.classifier).unwrap();
    assert!(matches!(
        ModelBundle::load(&first),
        Err(MlError::VectorizerMismatch(_))
    ));
}

#[test]
fn test_failed_save_keeps_previous_pair() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::in_dir(dir.path());
    let original = trained_bundle();
    original.save(&paths).unwrap();

    // The classifier cannot be written: its parent directory is a file.
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"").unwrap();
    let broken = ArtifactPaths {
        vectorizer: paths.vectorizer.clone(),
        classifier: blocker.join("spam_model.json"),
    };
    assert!(trained_bundle().save(&broken).is_err());

    let reloaded = ModelBundle::load(&paths).unwrap();
    assert_eq!(reloaded.metadata(), original.metadata());
}

#[test]
fn test_load_or_train_trains_then_loads() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());

    let first = load_or_train(&config).unwrap();
    let report = match &first.source {
        BundleSource::Trained(report) => report,
        BundleSource::Loaded => panic!("expected a fresh training run"),
    };
    assert!(report.vocabulary_size > 0);
    assert!(config.model.vectorizer_path().exists());
    assert!(config.model.classifier_path().exists());

    let second = load_or_train(&config).unwrap();
    assert!(matches!(second.source, BundleSource::Loaded));
    assert_eq!(second.bundle.metadata(), first.bundle.metadata());
}

#[test]
fn test_load_or_train_retrains_over_corrupt_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let original = load_or_train(&config).unwrap().bundle;

    fs::write(config.model.vectorizer_path(), b"").unwrap();
    let reloaded = load_or_train(&config).unwrap();
    assert!(matches!(reloaded.source, BundleSource::Trained(_)));
    assert_ne!(reloaded.bundle.metadata().run_id, original.metadata().run_id);
}

#[test]
fn test_load_or_train_does_not_overwrite_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    load_or_train(&config).unwrap();

    let other = ArtifactPaths::in_dir(&dir.path().join("other"));
    trained_bundle().save(&other).unwrap();
    fs::copy(&other.classifier, config.model.classifier_path()).unwrap();
    let before = fs::read(config.model.classifier_path()).unwrap();

    assert!(matches!(
        load_or_train(&config),
        Err(MlError::VectorizerMismatch(_))
    ));
    assert_eq!(fs::read(config.model.classifier_path()).unwrap(), before);
}

#[test]
fn test_load_or_train_reads_dataset_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(dir.path());
    config.dataset.path = dir.path().join("emails.csv");

    let mut csv = String::from("label,text,label_num\n");
    for record in sample_records() {
        let escaped = record.text.replace('"', "\"\"");
        csv.push_str(&format!(
            "{},\"{}\",{}\n",
            record.label,
            escaped,
            record.label.as_class()
        ));
    }
    fs::write(&config.dataset.path, csv).unwrap();

    let loaded = load_or_train(&config).unwrap();
    match loaded.source {
        BundleSource::Trained(report) => assert_eq!(report.usable_records, sample_records().len()),
        BundleSource::Loaded => panic!("expected a fresh training run"),
    }
}
