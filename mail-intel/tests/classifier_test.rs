//! Integration tests for prediction, attribution and normalization properties

use mail_intel::config::TrainingConfig;
use mail_intel::dataset::sample_records;
use mail_intel::evaluation::top_coefficients;
use mail_intel::normalize::normalize_for_classification;
use mail_intel::spam::{Label, SpamDetector};
use mail_intel::training::train;
use mail_intel::ModelBundle;

fn trained_bundle() -> ModelBundle {
    train(&sample_records(), &TrainingConfig::default())
        .unwrap()
        .0
}

const PROBES: &[&str] = &[
    "",
    "   ",
    "!!!",
    "WIN BIG MONEY NOW! CLICK HERE!",
    "Subject: Lunch\n\nLet's grab lunch at noon tomorrow.",
    "Hello, how are you doing today? Let's meet for coffee.",
    "URGENT: Your account will be closed! Act now to prevent suspension!",
    "Free gift! Claim your prize now by calling this number immediately!",
    "Meeting scheduled for tomorrow at 2 PM in conference room A.",
    "http://example.com user@example.com 12345",
    "zzzz qqqq unseen vocabulary only",
];

#[test]
fn test_confidence_is_a_probability() {
    let bundle = trained_bundle();
    for text in PROBES {
        let prediction = bundle.predict(text);
        assert!(
            (0.0..=1.0).contains(&prediction.confidence),
            "confidence {} for {text:?}",
            prediction.confidence
        );
        assert!(prediction.confidence >= 0.5);
    }
}

#[test]
fn test_empty_prediction_is_ham_at_half() {
    let detector = SpamDetector::with_bundle(trained_bundle());
    for text in ["", "   \n", "the and of", "12 34 !!"] {
        let prediction = detector.predict(text).unwrap();
        assert_eq!(prediction.label, Label::Ham);
        assert_eq!(prediction.confidence, 0.5);
    }
}

#[test]
fn test_obvious_examples() {
    let bundle = trained_bundle();

    let spam = bundle.predict("WIN BIG MONEY NOW! CLICK HERE!");
    assert_eq!(spam.label, Label::Spam);
    assert!(spam.confidence > 0.5);

    let ham = bundle.predict("Subject: Lunch\n\nLet's grab lunch at noon tomorrow.");
    assert_eq!(ham.label, Label::Ham);
}

#[test]
fn test_explain_only_returns_present_features() {
    let bundle = trained_bundle();
    for text in PROBES {
        for n in [0, 1, 3, 10, 1000] {
            let explanation = bundle.explain(text, n);
            assert!(explanation.len() <= n);
            for attribution in &explanation {
                assert!(attribution.tfidf_score > 0.0);
                assert!(bundle.vectorizer().vocabulary().contains(&attribution.feature));
            }
            for pair in explanation.windows(2) {
                assert!(pair[0].importance.abs() >= pair[1].importance.abs());
            }
        }
    }
}

#[test]
fn test_explain_matches_model_coefficients() {
    let bundle = trained_bundle();
    let explanation = bundle.explain("WIN BIG MONEY NOW! CLICK HERE!", 10);
    assert!(!explanation.is_empty());

    let coefficients = bundle.model().coefficients();
    for attribution in &explanation {
        let index = bundle
            .vectorizer()
            .vocabulary()
            .index_of(&attribution.feature)
            .unwrap();
        let expected = attribution.tfidf_score * coefficients[index];
        assert!((attribution.importance - expected).abs() < 1e-12);
    }
    // Every spam cue in the headline pushes toward spam.
    assert!(explanation.iter().all(|a| a.importance > 0.0));
}

#[test]
fn test_top_coefficients() {
    let bundle = trained_bundle();
    let top = top_coefficients(&bundle, 5);
    assert_eq!(top.spam.len(), 5);
    assert_eq!(top.ham.len(), 5);
    assert!(top.spam[0].coefficient >= top.spam[4].coefficient);
    assert!(top.ham[0].coefficient <= top.ham[4].coefficient);
    assert!(top.spam[0].coefficient > 0.0);
    assert!(top.ham[0].coefficient < 0.0);
}

#[test]
fn test_normalization_is_idempotent_over_corpus() {
    for record in sample_records() {
        let once = normalize_for_classification(&record.text);
        assert_eq!(normalize_for_classification(&once), once);
    }
    for text in PROBES {
        let once = normalize_for_classification(text);
        assert_eq!(normalize_for_classification(&once), once);
    }
}
