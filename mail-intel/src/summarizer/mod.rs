//! Abstractive email summarization
//!
//! Text is cleaned conservatively, passed to a sequence-to-sequence
//! generator with a task prefix and tidied afterwards. Generation failures
//! never reach the caller: they degrade to [`GENERATION_FAILED`].

pub mod generation;
pub mod lead;
pub mod postprocess;
pub mod t5;

use anyhow::Result as AnyResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{GeneratorBackend, SummarizerConfig};
use crate::error::Result;
use crate::normalize::normalize_for_summarization;

pub use generation::{beam_search, DecoderStep, GenerationConfig, SpecialTokens, LENGTH_BUFFER};
pub use lead::LeadGenerator;
pub use postprocess::post_process;
pub use t5::T5Generator;

/// Task prefix expected by T5-style checkpoints
pub const TASK_PREFIX: &str = "summarize: ";

/// Returned when cleaning leaves no text at all
pub const SHORT_INPUT_PLACEHOLDER: &str = "Email content too short to summarize.";

/// Returned when the generator fails
pub const GENERATION_FAILED: &str = "Error generating summary.";

/// Sequence-to-sequence text generator
pub trait TextGenerator: Send + Sync {
    /// Generate text for `prompt` under the given decoding constraints
    fn generate(&self, prompt: &str, config: &GenerationConfig) -> AnyResult<String>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Word counts before and after summarization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub original_words: usize,
    pub summary_words: usize,
    /// Summary words over original words; 0 for an empty original
    pub compression_ratio: f64,
    pub reduction_percentage: f64,
}

/// Compare a summary against the text it came from
pub fn summary_stats(original: &str, summary: &str) -> SummaryStats {
    let original_words = original.split_whitespace().count();
    let summary_words = summary.split_whitespace().count();
    let compression_ratio = if original_words > 0 {
        summary_words as f64 / original_words as f64
    } else {
        0.0
    };
    SummaryStats {
        original_words,
        summary_words,
        compression_ratio,
        reduction_percentage: (1.0 - compression_ratio) * 100.0,
    }
}

/// Summarizer over a pluggable generator
pub struct Summarizer {
    generator: Box<dyn TextGenerator>,
}

impl Summarizer {
    pub fn new(generator: Box<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Build the configured backend
    pub fn from_config(config: &SummarizerConfig) -> Result<Self> {
        let generator: Box<dyn TextGenerator> = match config.backend {
            GeneratorBackend::T5 => Box::new(T5Generator::load(config)?),
            GeneratorBackend::Lead => Box::new(LeadGenerator::new()),
        };
        info!("Summarizer ready with {}", generator.model_name());
        Ok(Self::new(generator))
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// Summarize raw email text.
    ///
    /// Text of at most `min_length` words after cleaning is returned as is
    /// without invoking the generator.
    pub fn summarize(&self, text: &str, max_length: usize, min_length: usize) -> String {
        let source = normalize_for_summarization(text);

        if source.word_count() <= min_length {
            debug!("Input has {} words, skipping generation", source.word_count());
            return if source.cleaned.is_empty() {
                SHORT_INPUT_PLACEHOLDER.to_string()
            } else {
                source.cleaned
            };
        }

        let prompt = format!("{}{}", TASK_PREFIX, source.cleaned);
        let config = GenerationConfig::for_summary(max_length, min_length);

        match self.generator.generate(&prompt, &config) {
            Ok(raw) => post_process(&raw, source.subject.as_deref()),
            Err(e) => {
                warn!("Summarization with {} failed: {:#}", self.model_name(), e);
                GENERATION_FAILED.to_string()
            }
        }
    }

    /// Summarize several texts with the same bounds
    pub fn summarize_batch<S: AsRef<str>>(
        &self,
        texts: &[S],
        max_length: usize,
        min_length: usize,
    ) -> Vec<String> {
        texts
            .iter()
            .map(|text| self.summarize(text.as_ref(), max_length, min_length))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct FailingGenerator;

    impl TextGenerator for FailingGenerator {
        fn generate(&self, _prompt: &str, _config: &GenerationConfig) -> AnyResult<String> {
            anyhow::bail!("out of memory")
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    /// Records prompts and answers with a fixed string
    struct ScriptedGenerator {
        reply: String,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl TextGenerator for ScriptedGenerator {
        fn generate(&self, prompt: &str, _config: &GenerationConfig) -> AnyResult<String> {
            self.prompts
                .lock()
                .unwrap()
                .push(prompt.to_string());
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    const LONG_EMAIL: &str = "Subject: Release\n\nThe release candidate passed every check last night. \
        We will ship it to customers on Thursday morning after the final review meeting with product.";

    #[test]
    fn test_short_input_passthrough() {
        let summarizer = Summarizer::new(Box::new(FailingGenerator));
        let out = summarizer.summarize("Subject: Lunch\n\nLet's grab lunch at noon tomorrow.", 50, 10);
        assert_eq!(out, "Lets grab lunch at noon tomorrow.");
    }

    #[test]
    fn test_empty_input_placeholder() {
        let summarizer = Summarizer::new(Box::new(FailingGenerator));
        assert_eq!(summarizer.summarize("Subject: Hi\n", 50, 10), SHORT_INPUT_PLACEHOLDER);
    }

    #[test]
    fn test_generation_failure_sentinel() {
        let summarizer = Summarizer::new(Box::new(FailingGenerator));
        assert_eq!(summarizer.summarize(LONG_EMAIL, 50, 10), GENERATION_FAILED);
    }

    #[test]
    fn test_prompt_and_post_processing() {
        let summarizer = Summarizer::new(Box::new(ScriptedGenerator {
            reply: "<pad> ship on thursday</s>".to_string(),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }));
        let out = summarizer.summarize(LONG_EMAIL, 50, 10);
        assert_eq!(out, "Email about: Release. Ship on thursday.");
    }

    #[test]
    fn test_prompt_has_task_prefix() {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let summarizer = Summarizer::new(Box::new(ScriptedGenerator {
            reply: "the release ships on thursday after the final review".to_string(),
            prompts: Arc::clone(&prompts),
        }));
        let out = summarizer.summarize(LONG_EMAIL, 50, 10);
        assert_eq!(out, "The release ships on thursday after the final review.");

        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with(TASK_PREFIX));
        assert!(!prompts[0].contains("Subject:"));
    }

    #[test]
    fn test_batch() {
        let summarizer = Summarizer::new(Box::new(LeadGenerator::new()));
        let out = summarizer.summarize_batch(&["Subject: Hi\n", LONG_EMAIL], 50, 10);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], SHORT_INPUT_PLACEHOLDER);
        assert!(out[1].starts_with("The release candidate passed"));
    }

    #[test]
    fn test_summary_stats() {
        let stats = summary_stats("one two three four", "one two");
        assert_eq!(stats.original_words, 4);
        assert_eq!(stats.summary_words, 2);
        assert!((stats.compression_ratio - 0.5).abs() < 1e-12);
        assert!((stats.reduction_percentage - 50.0).abs() < 1e-12);

        let empty = summary_stats("", "anything");
        assert_eq!(empty.compression_ratio, 0.0);
    }
}
