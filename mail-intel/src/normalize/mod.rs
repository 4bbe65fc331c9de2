//! Text normalization for both pipelines
//!
//! The two clean forms are distinct types of output: classification-clean
//! text is a space-joined list of stems, summarization-clean text is readable
//! prose. Neither is ever fed to the other pipeline.

pub mod classification;
pub mod stopwords;
pub mod summarization;

pub use classification::{normalize_for_classification, ClassificationNormalizer};
pub use summarization::{
    clean_for_summarization, extract_subject, normalize_for_summarization, SummarySource,
};
