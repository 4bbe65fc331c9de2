//! Spam types and data structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary label produced by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Ham,
    Spam,
}

impl Label {
    /// Numeric class as stored in the dataset (`label_num`)
    pub fn as_class(self) -> u8 {
        match self {
            Label::Ham => 0,
            Label::Spam => 1,
        }
    }

    pub fn from_class(class: u8) -> Option<Self> {
        match class {
            0 => Some(Label::Ham),
            1 => Some(Label::Spam),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Ham => "ham",
            Label::Spam => "spam",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output for one text
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Label,
    /// Larger of the two class probabilities, in [0, 1]
    pub confidence: f64,
}

impl Prediction {
    /// Returned when normalization leaves nothing to classify
    pub const UNDECIDED: Prediction = Prediction {
        label: Label::Ham,
        confidence: 0.5,
    };

    /// Build a prediction from the model's spam probability
    pub fn from_spam_probability(p_spam: f64) -> Self {
        let label = if p_spam > 0.5 { Label::Spam } else { Label::Ham };
        Self {
            label,
            confidence: p_spam.max(1.0 - p_spam).clamp(0.0, 1.0),
        }
    }

    pub fn is_spam(&self) -> bool {
        self.label == Label::Spam
    }
}

/// One feature's contribution to a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAttribution {
    /// Vocabulary term (unigram or space-joined bigram)
    pub feature: String,
    /// TF-IDF weight times model coefficient
    pub importance: f64,
    /// TF-IDF weight of the term in this document
    pub tfidf_score: f64,
}

/// A vocabulary term paired with its model coefficient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedTerm {
    pub term: String,
    pub coefficient: f64,
}
