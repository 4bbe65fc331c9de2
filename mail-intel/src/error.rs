//! Error types for mail-intel

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for mail-intel operations
pub type Result<T> = std::result::Result<T, MlError>;

/// Errors raised by the classification and summarization pipelines
#[derive(Error, Debug)]
pub enum MlError {
    /// Caller supplied empty or whitespace-only text
    #[error("Email text cannot be empty")]
    EmptyInput,

    /// Inference attempted before a model was trained or loaded
    #[error("Model not trained or loaded")]
    ModelNotReady,

    /// Classifier and vectorizer come from different training runs
    #[error("Vectorizer mismatch: {0}")]
    VectorizerMismatch(String),

    /// Text generation backend failure
    #[error("Generation failure: {0}")]
    Generation(String),

    /// A persisted model artifact is absent
    #[error("Model artifact not found: {}", .0.display())]
    ArtifactMissing(PathBuf),

    /// A persisted model artifact could not be read back
    #[error("Corrupt model artifact {}: {reason}", path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    /// Dataset is malformed or unusable
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Training could not produce a model
    #[error("Training error: {0}")]
    Training(String),

    /// Pretrained checkpoint or tokenizer could not be loaded
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl MlError {
    /// Whether the load path may recover from this error by retraining
    pub fn is_recoverable_by_training(&self) -> bool {
        matches!(
            self,
            MlError::ArtifactMissing(_) | MlError::ArtifactCorrupt { .. }
        )
    }
}
