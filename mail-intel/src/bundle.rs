//! Fitted model bundle and its on-disk artifacts
//!
//! A bundle pairs the vectorizer with the classifier trained on its output.
//! Both artifacts carry the same run id; loading refuses pairs from different
//! training runs.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{AppConfig, ModelConfig};
use crate::dataset::{load_dataset, sample_records, EmailRecord};
use crate::error::{MlError, Result};
use crate::normalize::normalize_for_classification;
use crate::spam::{FeatureAttribution, LogisticModel, Prediction, TfidfVectorizer};
use crate::training::{train, TrainingReport};

/// Identity shared by both artifacts of one training run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub run_id: Uuid,
    pub trained_at: DateTime<Utc>,
}

impl BundleMetadata {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            trained_at: Utc::now(),
        }
    }
}

impl Default for BundleMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Artifact locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub vectorizer: PathBuf,
    pub classifier: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self::from(&ModelConfig {
            dir: dir.to_path_buf(),
            ..AppConfig::default().model
        })
    }
}

impl From<&ModelConfig> for ArtifactPaths {
    fn from(config: &ModelConfig) -> Self {
        Self {
            vectorizer: config.vectorizer_path(),
            classifier: config.classifier_path(),
        }
    }
}

#[derive(Serialize)]
struct ArtifactRef<'a, T> {
    metadata: &'a BundleMetadata,
    payload: &'a T,
}

#[derive(Deserialize)]
struct Artifact<T> {
    metadata: BundleMetadata,
    payload: T,
}

/// Immutable vectorizer + classifier pair
#[derive(Debug, Clone)]
pub struct ModelBundle {
    vectorizer: TfidfVectorizer,
    model: LogisticModel,
    metadata: BundleMetadata,
}

impl ModelBundle {
    /// Pair a vectorizer with a classifier fitted on its output
    pub fn new(
        vectorizer: TfidfVectorizer,
        model: LogisticModel,
        metadata: BundleMetadata,
    ) -> Result<Self> {
        if model.dim() != vectorizer.dim() {
            return Err(MlError::VectorizerMismatch(format!(
                "classifier has {} coefficients but vocabulary has {} terms",
                model.dim(),
                vectorizer.dim()
            )));
        }
        Ok(Self {
            vectorizer,
            model,
            metadata,
        })
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn model(&self) -> &LogisticModel {
        &self.model
    }

    pub fn metadata(&self) -> &BundleMetadata {
        &self.metadata
    }

    /// Classify raw text
    pub fn predict(&self, text: &str) -> Prediction {
        let clean = normalize_for_classification(text);
        if clean.is_empty() {
            return Prediction::UNDECIDED;
        }
        let features = self.vectorizer.transform(&clean);
        self.model.predict(&features)
    }

    /// Rank the features present in `text` by their contribution.
    ///
    /// Ordered by descending absolute importance; ties keep vocabulary
    /// order. Features absent from the text are never returned.
    pub fn explain(&self, text: &str, top_n: usize) -> Vec<FeatureAttribution> {
        let clean = normalize_for_classification(text);
        if clean.is_empty() || top_n == 0 {
            return Vec::new();
        }

        let features = self.vectorizer.transform(&clean);
        let coefficients = self.model.coefficients();
        let mut ranked: Vec<(usize, f64, f64)> = features
            .iter()
            .filter(|&(_, tfidf)| tfidf > 0.0)
            .map(|(index, tfidf)| (index, tfidf * coefficients[index], tfidf))
            .collect();

        // Entries arrive in index order, so a stable sort keeps ties ordered.
        ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        ranked.truncate(top_n);

        ranked
            .into_iter()
            .filter_map(|(index, importance, tfidf_score)| {
                self.vectorizer
                    .vocabulary()
                    .term(index)
                    .map(|feature| FeatureAttribution {
                        feature: feature.to_string(),
                        importance,
                        tfidf_score,
                    })
            })
            .collect()
    }

    /// Write both artifacts, each atomically.
    ///
    /// Both are fully written to temp files before either replaces the
    /// previous pair, so a failed write leaves the old pair in place.
    pub fn save(&self, paths: &ArtifactPaths) -> Result<()> {
        let vectorizer = stage_artifact(&paths.vectorizer, &self.metadata, &self.vectorizer)?;
        let classifier = stage_artifact(&paths.classifier, &self.metadata, &self.model)?;
        vectorizer
            .persist(&paths.vectorizer)
            .map_err(|e| MlError::Io(e.error))?;
        classifier
            .persist(&paths.classifier)
            .map_err(|e| MlError::Io(e.error))?;
        info!(
            "Saved model bundle {} to {} and {}",
            self.metadata.run_id,
            paths.vectorizer.display(),
            paths.classifier.display()
        );
        Ok(())
    }

    /// Read both artifacts and check that they belong together
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let vectorizer: Artifact<TfidfVectorizer> = read_artifact(&paths.vectorizer)?;
        let classifier: Artifact<LogisticModel> = read_artifact(&paths.classifier)?;

        if vectorizer.metadata.run_id != classifier.metadata.run_id {
            return Err(MlError::VectorizerMismatch(format!(
                "vectorizer from run {} but classifier from run {}",
                vectorizer.metadata.run_id, classifier.metadata.run_id
            )));
        }
        vectorizer.payload.validate()?;

        let bundle = Self::new(vectorizer.payload, classifier.payload, classifier.metadata)?;
        info!(
            "Loaded model bundle {} ({} features)",
            bundle.metadata.run_id,
            bundle.vectorizer.dim()
        );
        Ok(bundle)
    }
}

/// Serialize an artifact into a temp file next to its final location
fn stage_artifact<T: Serialize>(
    path: &Path,
    metadata: &BundleMetadata,
    payload: &T,
) -> Result<NamedTempFile> {
    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(temp_file.as_file());
        serde_json::to_writer(&mut writer, &ArtifactRef { metadata, payload })?;
        writer.flush()?;
    }
    Ok(temp_file)
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<Artifact<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(MlError::ArtifactMissing(path.to_path_buf()))
        }
        Err(e) => {
            return Err(MlError::ArtifactCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };

    serde_json::from_reader(BufReader::new(file)).map_err(|e| MlError::ArtifactCorrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// How a bundle was obtained at startup
#[derive(Debug)]
pub enum BundleSource {
    Loaded,
    Trained(Box<TrainingReport>),
}

/// Result of [`load_or_train`]
#[derive(Debug)]
pub struct LoadedBundle {
    pub bundle: ModelBundle,
    pub source: BundleSource,
}

/// Load persisted artifacts, retraining when they are missing or corrupt.
///
/// A vectorizer/classifier mismatch is returned as an error and never
/// overwritten.
pub fn load_or_train(config: &AppConfig) -> Result<LoadedBundle> {
    let paths = ArtifactPaths::from(&config.model);
    match ModelBundle::load(&paths) {
        Ok(bundle) => Ok(LoadedBundle {
            bundle,
            source: BundleSource::Loaded,
        }),
        Err(e) if e.is_recoverable_by_training() => {
            warn!("{}; training a new model", e);
            let records = training_records(&config.dataset.path)?;
            let (bundle, report) = train(&records, &config.training)?;
            bundle.save(&paths)?;
            Ok(LoadedBundle {
                bundle,
                source: BundleSource::Trained(Box::new(report)),
            })
        }
        Err(e) => Err(e),
    }
}

/// Dataset rows, or the built-in sample corpus when the file is absent
pub fn training_records(path: &Path) -> Result<Vec<EmailRecord>> {
    if path.exists() {
        load_dataset(path)
    } else {
        warn!(
            "Dataset {} not found, using the built-in sample corpus",
            path.display()
        );
        Ok(sample_records())
    }
}
