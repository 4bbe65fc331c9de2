//! Request-level facade over the classifier and the summarizer
//!
//! Validates caller input and shapes results into the records returned by
//! the `predict`, `summarize` and `analyze` calls.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MlError, Result};
use crate::spam::{FeatureAttribution, Label, SpamDetector};
use crate::summarizer::Summarizer;

pub const DEFAULT_MAX_LENGTH: usize = 50;
pub const DEFAULT_MIN_LENGTH: usize = 10;

/// Classification result as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpamDetection {
    pub prediction: Label,
    pub confidence: f64,
    pub is_spam: bool,
}

/// Summary with word counts of the raw input and of the summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
    #[serde(rename = "original_length")]
    pub original_word_count: usize,
    #[serde(rename = "summary_length")]
    pub summary_word_count: usize,
}

/// Summarization part of an analysis; `summary` is absent for spam
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizationOutcome {
    pub summary: Option<String>,
    #[serde(rename = "original_length")]
    pub original_word_count: usize,
    #[serde(rename = "summary_length")]
    pub summary_word_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub spam_detection: SpamDetection,
    pub summarization: SummarizationOutcome,
}

/// Options for [`EmailAnalyzer::analyze`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeOptions {
    pub max_length: usize,
    pub min_length: usize,
    /// Summarize even when the email is classified as spam
    pub force_summary: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            min_length: DEFAULT_MIN_LENGTH,
            force_summary: false,
        }
    }
}

/// Classifier and summarizer behind one entry point
pub struct EmailAnalyzer {
    detector: SpamDetector,
    summarizer: Summarizer,
}

fn require_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(MlError::EmptyInput);
    }
    Ok(())
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

impl EmailAnalyzer {
    pub fn new(detector: SpamDetector, summarizer: Summarizer) -> Self {
        Self {
            detector,
            summarizer,
        }
    }

    pub fn detector(&self) -> &SpamDetector {
        &self.detector
    }

    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    pub fn predict(&self, text: &str) -> Result<SpamDetection> {
        require_text(text)?;
        let prediction = self.detector.predict(text)?;
        Ok(SpamDetection {
            prediction: prediction.label,
            confidence: prediction.confidence,
            is_spam: prediction.is_spam(),
        })
    }

    pub fn explain(&self, text: &str, top_n: usize) -> Result<Vec<FeatureAttribution>> {
        require_text(text)?;
        self.detector.explain(text, top_n)
    }

    pub fn summarize(&self, text: &str, max_length: usize, min_length: usize) -> Result<Summary> {
        require_text(text)?;
        let summary = self.summarizer.summarize(text, max_length, min_length);
        Ok(Summary {
            original_word_count: word_count(text),
            summary_word_count: word_count(&summary),
            summary,
        })
    }

    /// Classify, then summarize ham (or anything when forced)
    pub fn analyze(&self, text: &str, options: AnalyzeOptions) -> Result<AnalysisReport> {
        let spam_detection = self.predict(text)?;

        let summary = if !spam_detection.is_spam || options.force_summary {
            Some(
                self.summarizer
                    .summarize(text, options.max_length, options.min_length),
            )
        } else {
            debug!("Skipping summary for spam");
            None
        };

        Ok(AnalysisReport {
            spam_detection,
            summarization: SummarizationOutcome {
                original_word_count: word_count(text),
                summary_word_count: summary.as_deref().map(word_count).unwrap_or(0),
                summary,
            },
        })
    }
}
