//! Aggressive normalization feeding the spam classifier
//!
//! Lowercases, drops link and address tokens, strips digits and punctuation,
//! drops stopwords and short tokens, then stems what is left. Every surviving
//! token is already a fixpoint of these steps, so a second pass is a no-op.

use rust_stemmers::{Algorithm, Stemmer};
use std::sync::OnceLock;

use super::stopwords::is_stopword;

/// Tokens must be longer than this many characters to survive
const MIN_TOKEN_CHARS: usize = 2;

/// Token prefixes treated as links
const LINK_PREFIXES: [&str; 2] = ["http", "www"];

fn is_link(token: &str) -> bool {
    LINK_PREFIXES.iter().any(|prefix| token.starts_with(prefix))
}

fn is_address(token: &str) -> bool {
    token.contains('@')
}

/// Normalizer for the classification pipeline
pub struct ClassificationNormalizer {
    stemmer: Stemmer,
}

impl ClassificationNormalizer {
    pub fn new() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    /// Map raw text to its classification-clean form.
    ///
    /// Returns an empty string when nothing survives; callers treat that as
    /// a defined outcome rather than an error.
    pub fn normalize(&self, text: &str) -> String {
        text.to_lowercase()
            .split_whitespace()
            .filter(|token| !is_link(token) && !is_address(token))
            .map(|token| {
                token
                    .chars()
                    .filter(|c| !c.is_numeric() && !c.is_ascii_punctuation())
                    .collect::<String>()
            })
            // Dropping punctuation can splice a link prefix together ("ht.tp...").
            .filter(|word| keep_token(word))
            .map(|word| self.stem(&word))
            // A stem can land on a stopword or fall under the length floor.
            .filter(|stem| keep_token(stem))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Stem until the output no longer changes
    fn stem(&self, word: &str) -> String {
        // A round either shortens the word or rewrites a y or an i.
        let max_rounds = 4 * word.chars().count() + 4;
        let mut current = word.to_string();
        for _ in 0..max_rounds {
            let next = self.stemmer.stem(&current);
            if next == current.as_str() {
                break;
            }
            current = next.into_owned();
        }
        current
    }
}

impl Default for ClassificationNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn keep_token(word: &str) -> bool {
    word.chars().count() > MIN_TOKEN_CHARS && !is_stopword(word) && !is_link(word)
}

/// Shared normalizer instance
pub fn classification_normalizer() -> &'static ClassificationNormalizer {
    static NORMALIZER: OnceLock<ClassificationNormalizer> = OnceLock::new();
    NORMALIZER.get_or_init(ClassificationNormalizer::new)
}

/// Map raw text to its classification-clean form
pub fn normalize_for_classification(text: &str) -> String {
    classification_normalizer().normalize(text)
}
