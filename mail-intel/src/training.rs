//! Offline training of the vectorizer + classifier bundle

use serde::Serialize;
use tracing::{info, warn};

use crate::bundle::{BundleMetadata, ModelBundle};
use crate::config::TrainingConfig;
use crate::dataset::{stratified_split, EmailRecord};
use crate::error::{MlError, Result};
use crate::evaluation::{evaluate, EvaluationReport};
use crate::normalize::normalize_for_classification;
use crate::spam::{Label, LogisticModel, LogisticParams, TfidfVectorizer, VectorizerParams};

/// Side outputs of a training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    /// Records left after normalization
    pub usable_records: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub vocabulary_size: usize,
    pub iterations: usize,
    pub converged: bool,
    /// Held-out metrics, absent when the test part is empty
    pub evaluation: Option<EvaluationReport>,
}

/// Fit a bundle on labelled records.
///
/// Texts that normalize to nothing are skipped. The vectorizer only sees
/// the training part of the split.
pub fn train(records: &[EmailRecord], config: &TrainingConfig) -> Result<(ModelBundle, TrainingReport)> {
    let clean: Vec<EmailRecord> = records
        .iter()
        .filter_map(|record| {
            let text = normalize_for_classification(&record.text);
            (!text.is_empty()).then(|| EmailRecord::new(record.label, text))
        })
        .collect();

    if clean.is_empty() {
        return Err(MlError::Training(
            "No usable records after normalization".to_string(),
        ));
    }
    if clean.len() < records.len() {
        warn!(
            "Skipped {} records that normalized to empty text",
            records.len() - clean.len()
        );
    }

    let (train_part, test_part) = stratified_split(&clean, config.test_fraction, config.seed);
    info!(
        "Training on {} records, holding out {}",
        train_part.len(),
        test_part.len()
    );

    let train_texts: Vec<String> = train_part.iter().map(|r| r.text.clone()).collect();
    let train_labels: Vec<Label> = train_part.iter().map(|r| r.label).collect();

    let vectorizer = TfidfVectorizer::fit(&train_texts, VectorizerParams::from(config))?;
    let features = vectorizer.transform_all(&train_texts);
    let model = LogisticModel::fit(&features, &train_labels, LogisticParams::from(config))?;

    let evaluation = if test_part.is_empty() {
        None
    } else {
        let truth: Vec<Label> = test_part.iter().map(|r| r.label).collect();
        let probabilities: Vec<f64> = test_part
            .iter()
            .map(|r| model.predict_proba(&vectorizer.transform(&r.text)))
            .collect();
        let predicted: Vec<Label> = probabilities
            .iter()
            .map(|&p| if p > 0.5 { Label::Spam } else { Label::Ham })
            .collect();
        let report = evaluate(&truth, &predicted, Some(&probabilities));
        info!("Held-out accuracy: {:.4}", report.accuracy);
        info!("Classification report:\n{}", report);
        Some(report)
    };

    let report = TrainingReport {
        usable_records: clean.len(),
        train_size: train_part.len(),
        test_size: test_part.len(),
        vocabulary_size: vectorizer.dim(),
        iterations: model.iterations(),
        converged: model.converged(),
        evaluation,
    };

    let bundle = ModelBundle::new(vectorizer, model, BundleMetadata::new())?;
    Ok((bundle, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::sample_records;

    #[test]
    fn test_train_on_sample_corpus() {
        let (bundle, report) = train(&sample_records(), &TrainingConfig::default()).unwrap();

        assert_eq!(report.train_size + report.test_size, report.usable_records);
        assert_eq!(report.test_size, 6);
        assert_eq!(report.vocabulary_size, bundle.vectorizer().dim());
        assert!(report.evaluation.is_some());
        // Every sample starts with the same header word.
        assert!(!bundle.vectorizer().vocabulary().contains("subject"));
    }

    #[test]
    fn test_train_rejects_empty_input() {
        let records = vec![EmailRecord::new(Label::Spam, "!!! 123")];
        assert!(matches!(
            train(&records, &TrainingConfig::default()),
            Err(MlError::Training(_))
        ));
    }
}
