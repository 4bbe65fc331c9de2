//! Extractive lead-sentence backend
//!
//! Takes leading sentences until the minimum length is met and truncates at
//! the maximum. Needs no weights, so it serves offline installs and tests.

use anyhow::Result;

use super::generation::GenerationConfig;
use super::{TextGenerator, TASK_PREFIX};

/// Deterministic stand-in for a pretrained summarizer
pub struct LeadGenerator {
    model_name: String,
}

impl LeadGenerator {
    pub fn new() -> Self {
        Self {
            model_name: "lead-extractive".to_string(),
        }
    }
}

impl Default for LeadGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TextGenerator for LeadGenerator {
    fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        let text = prompt.strip_prefix(TASK_PREFIX).unwrap_or(prompt);
        let target = config.min_length.max(1);

        let mut picked: Vec<&str> = Vec::new();
        for word in text.split_whitespace() {
            if picked.len() >= config.max_length {
                break;
            }
            picked.push(word);
            let sentence_end = word.ends_with(['.', '!', '?']);
            if sentence_end && picked.len() >= target {
                break;
            }
        }

        Ok(picked.join(" "))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_takes_lead_sentences() {
        let generator = LeadGenerator::new();
        let prompt = "summarize: The build is green. Deploys resume on Monday after review. Ping me with questions.";
        let out = generator
            .generate(prompt, &GenerationConfig::for_summary(50, 5))
            .unwrap();
        assert_eq!(out, "The build is green. Deploys resume on Monday after review.");
    }

    #[test]
    fn test_truncates_at_max_length() {
        let generator = LeadGenerator::new();
        let prompt = "one two three four five six seven eight nine ten eleven twelve";
        let mut config = GenerationConfig::for_summary(0, 2);
        config.max_length = 4;
        let out = generator.generate(prompt, &config).unwrap();
        assert_eq!(out, "one two three four");
    }

    #[test]
    fn test_model_name() {
        assert_eq!(LeadGenerator::new().model_name(), "lead-extractive");
    }
}
