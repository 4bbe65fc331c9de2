//! Shared serving state for the spam classifier
//!
//! Readers take a cheap `Arc` snapshot of the installed bundle; installing a
//! retrained bundle swaps the pointer without disturbing in-flight calls.

use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use super::types::{FeatureAttribution, Prediction};
use crate::bundle::ModelBundle;
use crate::error::{MlError, Result};

/// Spam detector holding the current model version
#[derive(Debug, Default)]
pub struct SpamDetector {
    current: RwLock<Option<Arc<ModelBundle>>>,
}

impl SpamDetector {
    /// Detector with no model; every call fails with `ModelNotReady`
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bundle(bundle: ModelBundle) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(bundle))),
        }
    }

    /// Install a model version, returning the one it replaced
    pub fn install(&self, bundle: ModelBundle) -> Option<Arc<ModelBundle>> {
        let run_id = bundle.metadata().run_id;
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let previous = guard.replace(Arc::new(bundle));
        info!("Installed model bundle {}", run_id);
        previous
    }

    pub fn is_ready(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Snapshot of the installed bundle
    pub fn current(&self) -> Result<Arc<ModelBundle>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(MlError::ModelNotReady)
    }

    /// Classify raw text; normalizing to nothing yields ham at 0.5
    pub fn predict(&self, text: &str) -> Result<Prediction> {
        let bundle = self.current()?;
        let prediction = bundle.predict(text);
        debug!(
            "Predicted {} ({:.3})",
            prediction.label, prediction.confidence
        );
        Ok(prediction)
    }

    /// Top `top_n` features present in `text`, by absolute importance
    pub fn explain(&self, text: &str, top_n: usize) -> Result<Vec<FeatureAttribution>> {
        let bundle = self.current()?;
        Ok(bundle.explain(text, top_n))
    }
}
