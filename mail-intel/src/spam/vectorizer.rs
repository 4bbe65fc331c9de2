//! TF-IDF feature extraction over classification-clean text
//!
//! The vocabulary holds unigrams and bigrams selected by document frequency.
//! Indices follow the alphabetical order of the kept terms and are frozen
//! once fitting finishes; `transform` never grows the vocabulary.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use tracing::debug;

use crate::config::TrainingConfig;
use crate::error::{MlError, Result};

fn token_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?u)\b\w\w+\b").ok()).as_ref()
}

/// Vocabulary selection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizerParams {
    /// Upper bound on vocabulary size
    pub max_features: usize,
    /// Terms in fewer documents than this are dropped
    pub min_df: usize,
    /// Terms in more than this fraction of documents are dropped
    pub max_df: f64,
    /// Inclusive n-gram range
    pub ngram_range: (usize, usize),
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

impl From<&TrainingConfig> for VectorizerParams {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            max_features: config.max_features,
            min_df: config.min_df,
            max_df: config.max_df,
            ngram_range: config.ngram_range,
        }
    }
}

/// Frozen term → index mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    terms: Vec<String>,
    index: HashMap<String, usize>,
}

impl From<Vec<String>> for Vocabulary {
    fn from(terms: Vec<String>) -> Self {
        let index = terms
            .iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), i))
            .collect();
        Self { terms, index }
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocabulary: Vocabulary) -> Self {
        vocabulary.terms
    }
}

impl Vocabulary {
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    pub fn term(&self, index: usize) -> Option<&str> {
        self.terms.get(index).map(String::as_str)
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn contains(&self, term: &str) -> bool {
        self.index.contains_key(term)
    }
}

/// Sparse, L2-normalized document vector sorted by index
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    dim: usize,
    entries: Vec<(usize, f64)>,
}

impl FeatureVector {
    /// Build a vector from raw `(index, weight)` pairs.
    ///
    /// Entries outside `dim` and zero weights are dropped; no normalization
    /// is applied.
    pub fn from_sparse(dim: usize, mut entries: Vec<(usize, f64)>) -> Self {
        entries.retain(|&(i, w)| i < dim && w != 0.0);
        entries.sort_by_key(|&(i, _)| i);
        entries.dedup_by_key(|&mut (i, _)| i);
        Self { dim, entries }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of non-zero entries
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// Weight at `index`, zero when absent
    pub fn get(&self, index: usize) -> f64 {
        self.entries
            .binary_search_by_key(&index, |&(i, _)| i)
            .map(|pos| self.entries[pos].1)
            .unwrap_or(0.0)
    }

    pub fn dot(&self, weights: &[f64]) -> f64 {
        self.entries
            .iter()
            .filter_map(|&(i, w)| weights.get(i).map(|c| c * w))
            .sum()
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|&(_, w)| w * w).sum::<f64>().sqrt()
    }
}

/// Fitted TF-IDF vectorizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    params: VectorizerParams,
    vocabulary: Vocabulary,
    idf: Vec<f64>,
    n_documents: usize,
}

struct TermStats {
    doc_freq: usize,
    total_freq: usize,
}

impl TfidfVectorizer {
    /// Build the vocabulary and IDF weights from a training corpus
    pub fn fit(documents: &[String], params: VectorizerParams) -> Result<Self> {
        if documents.is_empty() {
            return Err(MlError::Training(
                "Cannot fit vectorizer on an empty corpus".to_string(),
            ));
        }

        let n_documents = documents.len();
        let mut stats: HashMap<String, TermStats> = HashMap::new();

        for doc in documents {
            let terms = ngrams(doc, params.ngram_range);
            let mut seen = HashSet::new();
            for term in terms {
                let first_in_doc = seen.insert(term.clone());
                let entry = stats.entry(term).or_insert(TermStats {
                    doc_freq: 0,
                    total_freq: 0,
                });
                entry.total_freq += 1;
                if first_in_doc {
                    entry.doc_freq += 1;
                }
            }
        }

        let max_doc_count = params.max_df * n_documents as f64;
        if max_doc_count < params.min_df as f64 {
            return Err(MlError::Training(format!(
                "max_df={} over {} documents allows fewer documents than min_df={}",
                params.max_df, n_documents, params.min_df
            )));
        }

        let mut kept: Vec<(String, TermStats)> = stats
            .into_iter()
            .filter(|(_, s)| s.doc_freq >= params.min_df && s.doc_freq as f64 <= max_doc_count)
            .collect();

        if kept.len() > params.max_features {
            kept.sort_by(|(a_term, a), (b_term, b)| {
                b.doc_freq
                    .cmp(&a.doc_freq)
                    .then(b.total_freq.cmp(&a.total_freq))
                    .then_with(|| a_term.cmp(b_term))
            });
            kept.truncate(params.max_features);
        }

        if kept.is_empty() {
            return Err(MlError::Training(
                "After pruning, no terms remain. Try a lower min_df or a higher max_df"
                    .to_string(),
            ));
        }

        kept.sort_by(|(a, _), (b, _)| a.cmp(b));

        let n = n_documents as f64;
        let idf = kept
            .iter()
            .map(|(_, s)| ((1.0 + n) / (1.0 + s.doc_freq as f64)).ln() + 1.0)
            .collect();
        let terms: Vec<String> = kept.into_iter().map(|(term, _)| term).collect();

        debug!(
            "Fitted vectorizer: {} documents, {} terms",
            n_documents,
            terms.len()
        );

        Ok(Self {
            params,
            vocabulary: Vocabulary::from(terms),
            idf,
            n_documents,
        })
    }

    /// Map classification-clean text onto the frozen vocabulary.
    ///
    /// Out-of-vocabulary terms contribute nothing.
    pub fn transform(&self, text: &str) -> FeatureVector {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for term in ngrams(text, self.params.ngram_range) {
            if let Some(index) = self.vocabulary.index_of(&term) {
                *counts.entry(index).or_insert(0) += 1;
            }
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(index, count)| (index, count as f64 * self.idf[index]))
            .collect();
        entries.sort_by_key(|&(index, _)| index);

        let norm = entries.iter().map(|&(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut entries {
                *w /= norm;
            }
        }

        FeatureVector {
            dim: self.vocabulary.len(),
            entries,
        }
    }

    pub fn transform_all(&self, documents: &[String]) -> Vec<FeatureVector> {
        documents.iter().map(|doc| self.transform(doc)).collect()
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Terms in index order
    pub fn feature_names(&self) -> &[String] {
        self.vocabulary.terms()
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn params(&self) -> &VectorizerParams {
        &self.params
    }

    pub fn n_documents(&self) -> usize {
        self.n_documents
    }

    /// Output dimensionality
    pub fn dim(&self) -> usize {
        self.vocabulary.len()
    }

    /// Check internal consistency after deserialization
    pub fn validate(&self) -> Result<()> {
        if self.idf.len() != self.vocabulary.len() {
            return Err(MlError::VectorizerMismatch(format!(
                "{} IDF weights for {} vocabulary terms",
                self.idf.len(),
                self.vocabulary.len()
            )));
        }
        if self.vocabulary.index.len() != self.vocabulary.len() {
            return Err(MlError::VectorizerMismatch(
                "Vocabulary contains duplicate terms".to_string(),
            ));
        }
        Ok(())
    }
}

/// Word n-grams within `range`, joined by single spaces
fn ngrams(text: &str, (min_n, max_n): (usize, usize)) -> Vec<String> {
    let Some(re) = token_regex() else {
        return Vec::new();
    };
    let tokens: Vec<&str> = re.find_iter(text).map(|m| m.as_str()).collect();
    let mut out = Vec::new();
    for n in min_n.max(1)..=max_n {
        if n > tokens.len() {
            break;
        }
        out.extend(tokens.windows(n).map(|window| window.join(" ")));
    }
    out
}
