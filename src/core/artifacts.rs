// src/core/artifacts.rs
//
// JSON persistence for everything training produces. Each file wraps its
// payload with the fingerprint of the feature configuration it was built
// under, so a model can never be paired with features computed differently.

use chrono::{DateTime, Utc};
use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::FeatureConfig;
use crate::error::{KwsError, Result};

pub const NORM_STATS_FILE: &str = "norm_stats.json";
pub const MODEL_FILE: &str = "model.json";
pub const QUANTIZED_MODEL_FILE: &str = "model_int8.json";
pub const FEATURES_FILE: &str = "features.json";
pub const REPORT_FILE: &str = "training_report.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact<T> {
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub payload: T,
}

impl<T> Artifact<T> {
    pub fn new(config: &FeatureConfig, payload: T) -> Self {
        Self {
            fingerprint: config.fingerprint(),
            created_at: Utc::now(),
            payload,
        }
    }
}

impl<T: Serialize> Artifact<T> {
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("wrote {}", path.display());
        Ok(())
    }
}

impl<T: DeserializeOwned> Artifact<T> {
    /// Read an artifact and check it was produced under `config`
    pub fn load(path: &Path, config: &FeatureConfig) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| KwsError::artifact_missing(path, e))?;
        let artifact: Self =
            serde_json::from_str(&text).map_err(|e| KwsError::artifact_missing(path, e))?;

        let expected = config.fingerprint();
        if artifact.fingerprint != expected {
            return Err(KwsError::ConfigMismatch {
                expected,
                found: artifact.fingerprint,
            });
        }
        info!(
            "loaded {} (created {})",
            path.display(),
            artifact.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        Ok(artifact)
    }
}

/// Save a bare payload wrapped in an [`Artifact`]
pub fn save<T: Serialize>(path: &Path, config: &FeatureConfig, payload: T) -> Result<()> {
    Artifact::new(config, payload).save(path)
}

/// Load just the payload of an artifact
pub fn load<T: DeserializeOwned>(path: &Path, config: &FeatureConfig) -> Result<T> {
    Ok(Artifact::<T>::load(path, config)?.payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::{FeatureStatistics, FeatureVector};

    fn stats() -> FeatureStatistics {
        FeatureStatistics::fit(&[
            FeatureVector::new(vec![1.0, 2.0]),
            FeatureVector::new(vec![3.0, 6.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(NORM_STATS_FILE);
        let config = FeatureConfig::default();

        save(&path, &config, stats()).unwrap();
        let loaded: FeatureStatistics = load(&path, &config).unwrap();
        assert_eq!(loaded, stats());
    }

    #[test]
    fn test_missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = FeatureConfig::default();

        let missing = load::<FeatureStatistics>(&dir.path().join(MODEL_FILE), &config);
        assert!(matches!(missing, Err(KwsError::ArtifactMissing { .. })));

        let corrupt = dir.path().join(NORM_STATS_FILE);
        std::fs::write(&corrupt, "{ not json").unwrap();
        assert!(matches!(
            load::<FeatureStatistics>(&corrupt, &config),
            Err(KwsError::ArtifactMissing { .. })
        ));
    }

    #[test]
    fn test_fingerprint_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(NORM_STATS_FILE);
        save(&path, &FeatureConfig::default(), stats()).unwrap();

        let other = FeatureConfig {
            n_mels: 40,
            ..Default::default()
        };
        assert!(matches!(
            load::<FeatureStatistics>(&path, &other),
            Err(KwsError::ConfigMismatch { .. })
        ));
    }
}
