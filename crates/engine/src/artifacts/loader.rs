//! Reads an artifact directory into an [`ArtifactBundle`]
//!
//! Loading is all-or-nothing: every required file is checked for presence
//! before anything is parsed, and the bundle is only returned once all
//! cross-artifact checks pass.

use super::{
    ArtifactBundle, BundleParts, Manifest, Scaler, ScalerArtifact, FALLBACK_MODEL_FILE,
    FEATURES_FILE, MANIFEST_FILE, METRICS_FILE, PRIMARY_MODEL_FILE, REQUIRED_FILES, SCALER_FILE,
    UNVERSIONED,
};
use crate::error::LoadError;
use crate::models::{FeatureSpec, TrainingMetrics};
use crate::predictor::{LogisticRegression, RandomForest, RandomForestArtifact};
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Loader for one artifact directory
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    dir: PathBuf,
    expected_features: Option<usize>,
}

impl ArtifactLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            expected_features: None,
        }
    }

    /// Pin the number of features the bundle must declare
    pub fn expect_features(mut self, expected: Option<usize>) -> Self {
        self.expected_features = expected;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load and validate the whole bundle
    pub fn load(&self) -> Result<ArtifactBundle, LoadError> {
        let start = Instant::now();

        if !self.dir.is_dir() {
            return Err(LoadError::missing(&self.dir));
        }
        for file in REQUIRED_FILES {
            let path = self.dir.join(file);
            if !path.is_file() {
                return Err(LoadError::missing(path));
            }
        }

        let manifest = self.read_manifest()?;

        let scaler: ScalerArtifact = self.read_json(SCALER_FILE, manifest.as_ref())?;
        let scaler =
            Scaler::try_from(scaler).map_err(|e| LoadError::corrupt(self.path(SCALER_FILE), e))?;
        info!(path = %self.path(SCALER_FILE).display(), features = scaler.len(), "Loaded scaler");

        let primary: RandomForestArtifact = self.read_json(PRIMARY_MODEL_FILE, manifest.as_ref())?;
        let primary = RandomForest::try_from(primary)
            .map_err(|e| LoadError::corrupt(self.path(PRIMARY_MODEL_FILE), e))?;
        info!(
            path = %self.path(PRIMARY_MODEL_FILE).display(),
            trees = primary.n_trees(),
            "Loaded primary model"
        );

        let fallback: LogisticRegression = self.read_json(FALLBACK_MODEL_FILE, manifest.as_ref())?;
        fallback
            .validate()
            .map_err(|e| LoadError::corrupt(self.path(FALLBACK_MODEL_FILE), e))?;
        info!(path = %self.path(FALLBACK_MODEL_FILE).display(), "Loaded fallback model");

        let features: Vec<FeatureSpec> = self.read_json(FEATURES_FILE, manifest.as_ref())?;
        if let Some(bad) = features
            .iter()
            .find(|f| !f.importance_weight.is_finite() || f.importance_weight < 0.0)
        {
            return Err(LoadError::corrupt(
                self.path(FEATURES_FILE),
                format!("feature '{}' has invalid importance {}", bad.name, bad.importance_weight),
            ));
        }
        info!(path = %self.path(FEATURES_FILE).display(), count = features.len(), "Loaded feature spec");

        let metrics: TrainingMetrics = self.read_json(METRICS_FILE, manifest.as_ref())?;
        debug!(?metrics, "Loaded training metrics");

        let version = manifest
            .map(|m| m.version)
            .unwrap_or_else(|| UNVERSIONED.to_string());

        let bundle = ArtifactBundle::assemble(
            BundleParts {
                version,
                primary,
                fallback,
                scaler,
                features,
                metrics,
            },
            self.expected_features,
        )?;

        info!(
            dir = %self.dir.display(),
            version = %bundle.version(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Artifact bundle loaded"
        );
        Ok(bundle)
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    fn read_manifest(&self) -> Result<Option<Manifest>, LoadError> {
        let path = self.path(MANIFEST_FILE);
        if !path.is_file() {
            debug!(dir = %self.dir.display(), "No manifest, bundle is unversioned");
            return Ok(None);
        }
        let manifest: Manifest = self.read_json(MANIFEST_FILE, None)?;
        for file in manifest.checksums.keys() {
            if !REQUIRED_FILES.contains(&file.as_str()) {
                warn!(file = %file, "Manifest lists a checksum for a file outside the bundle");
            }
        }
        Ok(Some(manifest))
    }

    fn read_json<T: DeserializeOwned>(
        &self,
        file: &str,
        manifest: Option<&Manifest>,
    ) -> Result<T, LoadError> {
        let path = self.path(file);
        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LoadError::missing(&path),
            _ => LoadError::corrupt(&path, e.to_string()),
        })?;

        if let Some(manifest) = manifest {
            manifest
                .verify(file, &bytes)
                .map_err(|e| LoadError::corrupt(&path, e))?;
        }

        serde_json::from_slice(&bytes).map_err(|e| LoadError::corrupt(&path, e.to_string()))
    }
}
