//! Spam classification
//!
//! TF-IDF features over classification-clean text feed an L2-regularized
//! logistic regression. Predictions carry the larger class probability as
//! confidence, and single predictions can be explained by ranking the
//! features present in the text.

pub mod detector;
pub mod logistic;
pub mod types;
pub mod vectorizer;

pub use detector::SpamDetector;
pub use logistic::{LogisticModel, LogisticParams};
pub use types::{FeatureAttribution, Label, Prediction, WeightedTerm};
pub use vectorizer::{FeatureVector, TfidfVectorizer, VectorizerParams, Vocabulary};
