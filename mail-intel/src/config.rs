//! Configuration for mail-intel
//!
//! Values are layered: compiled defaults, then an optional TOML file, then
//! environment variables prefixed with `MAIL_INTEL__` (for example
//! `MAIL_INTEL__TRAINING__SEED=7`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MlError, Result};

const ENV_PREFIX: &str = "MAIL_INTEL";

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub dataset: DatasetConfig,
    pub training: TrainingConfig,
    pub summarizer: SummarizerConfig,
    pub logging: LoggingConfig,
}

/// Where the fitted vectorizer and classifier live
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Directory holding both artifacts
    pub dir: PathBuf,
    #[serde(default = "default_vectorizer_file")]
    pub vectorizer_file: String,
    #[serde(default = "default_classifier_file")]
    pub classifier_file: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatasetConfig {
    /// CSV with `label`, `text` and `label_num` columns
    pub path: PathBuf,
}

/// Vectorizer and logistic regression hyperparameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrainingConfig {
    pub test_fraction: f64,
    pub seed: u64,
    pub max_features: usize,
    pub min_df: usize,
    pub max_df: f64,
    pub ngram_range: (usize, usize),
    /// Inverse regularization strength
    pub c: f64,
    pub max_iter: usize,
    pub tolerance: f64,
}

/// Summarization backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorBackend {
    /// Pretrained T5 checkpoint
    T5,
    /// Extractive lead-sentence baseline, no weights needed
    Lead,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SummarizerConfig {
    pub backend: GeneratorBackend,
    /// Hugging Face checkpoint identifier
    pub checkpoint: String,
    pub max_input_tokens: usize,
    pub default_max_length: usize,
    pub default_min_length: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

fn default_vectorizer_file() -> String {
    "tfidf_vectorizer.json".to_string()
}

fn default_classifier_file() -> String {
    "spam_model.json".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig {
                dir: PathBuf::from("models"),
                vectorizer_file: default_vectorizer_file(),
                classifier_file: default_classifier_file(),
            },
            dataset: DatasetConfig {
                path: PathBuf::from("spam_ham_dataset.csv"),
            },
            training: TrainingConfig::default(),
            summarizer: SummarizerConfig {
                backend: GeneratorBackend::T5,
                checkpoint: "google-t5/t5-small".to_string(),
                max_input_tokens: 512,
                default_max_length: 50,
                default_min_length: 10,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            max_features: 5000,
            min_df: 2,
            max_df: 0.95,
            ngram_range: (1, 2),
            c: 1.0,
            max_iter: 1000,
            tolerance: 1e-4,
        }
    }
}

impl ModelConfig {
    pub fn vectorizer_path(&self) -> PathBuf {
        self.dir.join(&self.vectorizer_file)
    }

    pub fn classifier_path(&self) -> PathBuf {
        self.dir.join(&self.classifier_file)
    }
}

impl AppConfig {
    /// Load configuration, layering an optional file and the environment
    /// over the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            if !path.exists() {
                return Err(MlError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let t = &self.training;
        if !(t.test_fraction > 0.0 && t.test_fraction < 1.0) {
            return Err(MlError::Config(format!(
                "test_fraction must be in (0, 1), got {}",
                t.test_fraction
            )));
        }
        if !(t.max_df > 0.0 && t.max_df <= 1.0) {
            return Err(MlError::Config(format!(
                "max_df must be in (0, 1], got {}",
                t.max_df
            )));
        }
        if t.max_features == 0 {
            return Err(MlError::Config("max_features must be positive".to_string()));
        }
        let (lo, hi) = t.ngram_range;
        if lo == 0 || lo > hi {
            return Err(MlError::Config(format!(
                "Invalid ngram_range ({}, {})",
                lo, hi
            )));
        }
        if t.c <= 0.0 {
            return Err(MlError::Config("c must be positive".to_string()));
        }

        let s = &self.summarizer;
        if s.default_min_length > s.default_max_length {
            return Err(MlError::Config(format!(
                "default_min_length ({}) exceeds default_max_length ({})",
                s.default_min_length, s.default_max_length
            )));
        }
        if s.max_input_tokens < 2 {
            return Err(MlError::Config("max_input_tokens must be at least 2".to_string()));
        }

        Ok(())
    }
}
