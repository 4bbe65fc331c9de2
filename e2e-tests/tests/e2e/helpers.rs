use mail_intel::bundle::{load_or_train, BundleSource, LoadedBundle};
use mail_intel::config::AppConfig;
use mail_intel::spam::SpamDetector;
use mail_intel::summarizer::{LeadGenerator, Summarizer};
use mail_intel::EmailAnalyzer;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;
use tempfile::TempDir;

pub const SPAM_HEADLINE: &str = "WIN BIG MONEY NOW! CLICK HERE!";

pub const LUNCH_EMAIL: &str = "Subject: Lunch\n\nLet's grab lunch at noon tomorrow.";

pub const RELEASE_EMAIL: &str = "Subject: Release schedule\n\n\
    The release candidate is ready for review. We will run the regression suite \
    on Monday and publish the build on Wednesday if nothing blocks it. Please \
    report issues in the tracker before Tuesday evening so the team can triage \
    them in time.\n\nThanks,\nSam";

static LOGGING: Once = Once::new();

/// Scratch model directory and configuration for one scenario
pub struct TestEnv {
    pub config: AppConfig,
    _dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment
    pub fn new() -> Self {
        LOGGING.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter("mail_intel=debug")
                .with_test_writer()
                .try_init();
        });

        let dir = tempfile::tempdir().expect("temp dir");
        let mut config = AppConfig::default();
        config.model.dir = dir.path().join("models");
        // Absent on purpose: training falls back to the built-in corpus.
        config.dataset.path = dir.path().join("spam_ham_dataset.csv");
        Self { config, _dir: dir }
    }

    pub fn model_dir(&self) -> &Path {
        &self.config.model.dir
    }

    pub fn artifact_paths(&self) -> (PathBuf, PathBuf) {
        (
            self.config.model.vectorizer_path(),
            self.config.model.classifier_path(),
        )
    }

    /// Load the persisted model, training it on first use
    pub fn load(&self) -> LoadedBundle {
        load_or_train(&self.config).expect("load or train")
    }

    /// Analyzer with the extractive summarizer
    pub fn analyzer(&self) -> EmailAnalyzer {
        let loaded = self.load();
        if let BundleSource::Trained(report) = &loaded.source {
            println!("🧠 Trained {} terms", report.vocabulary_size);
        }
        EmailAnalyzer::new(
            SpamDetector::with_bundle(loaded.bundle),
            Summarizer::new(Box::new(LeadGenerator::new())),
        )
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Test result helper
#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub duration: Duration,
}

impl TestResult {
    pub fn success(name: String, duration: Duration) -> Self {
        Self {
            name,
            passed: true,
            message: "✅ Test passed".to_string(),
            duration,
        }
    }

    pub fn failure(name: String, message: String, duration: Duration) -> Self {
        Self {
            name,
            passed: false,
            message: format!("❌ Test failed: {}", message),
            duration,
        }
    }

    pub fn print(&self) {
        println!("\n{}", "=".repeat(80));
        println!("📝 Test: {}", self.name);
        println!("⏱️  Duration: {:?}", self.duration);
        println!("{}", self.message);
        println!("{}", "=".repeat(80));
    }
}
