//! mail-intel: Email spam classification and summarization
//!
//! Classifies email text as spam or legitimate ("ham") and produces short
//! abstractive summaries of legitimate mail.
//!
//! # Features
//!
//! - **Classification**: TF-IDF unigrams and bigrams with L2-regularized
//!   logistic regression, trained offline and persisted as a matched pair
//! - **Attribution**: per-prediction ranking of the features present in a text
//! - **Summarization**: T5-style seq2seq generation with beam search, length
//!   bounds and no-repeat constraints
//! - **Serving**: immutable model bundles shared across threads and swapped
//!   atomically on retrain
//!
//! # Example
//!
//! ```no_run
//! use mail_intel::analyze::{AnalyzeOptions, EmailAnalyzer};
//! use mail_intel::bundle::load_or_train;
//! use mail_intel::config::AppConfig;
//! use mail_intel::spam::SpamDetector;
//! use mail_intel::summarizer::Summarizer;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load(None)?;
//!     let loaded = load_or_train(&config)?;
//!
//!     let analyzer = EmailAnalyzer::new(
//!         SpamDetector::with_bundle(loaded.bundle),
//!         Summarizer::from_config(&config.summarizer)?,
//!     );
//!
//!     let report = analyzer.analyze("Subject: Lunch\n\nLet's grab lunch at noon tomorrow.", AnalyzeOptions::default())?;
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`error`]: Error types and handling
//! - [`normalize`]: Text normalization for both pipelines
//! - [`spam`]: Vectorizer, classifier, attribution and serving state
//! - [`dataset`], [`training`], [`evaluation`]: Offline training
//! - [`bundle`]: Model persistence and startup loading
//! - [`summarizer`]: Generation backends and post-processing
//! - [`analyze`]: Request-level facade

pub mod analyze;
pub mod bundle;
pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod normalize;
pub mod spam;
pub mod summarizer;
pub mod training;

// Re-export commonly used types
pub use analyze::{AnalysisReport, AnalyzeOptions, EmailAnalyzer, SpamDetection, Summary};
pub use bundle::{load_or_train, ModelBundle};
pub use config::AppConfig;
pub use error::{MlError, Result};
pub use spam::{Label, Prediction, SpamDetector};
pub use summarizer::{Summarizer, TextGenerator};
