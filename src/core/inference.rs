// src/core/inference.rs
//
// Single-clip classification against persisted artifacts.

use log::{debug, info, log_enabled, Level};
use std::path::{Path, PathBuf};

use crate::classification::ClassificationResult;
use crate::config::FeatureConfig;
use crate::core::artifacts::{self, MODEL_FILE, NORM_STATS_FILE, QUANTIZED_MODEL_FILE};
use crate::core::decoder::{clip_from_pcm_bytes, decode_file, sample_to_f64, AudioClip};
use crate::core::dsp::rms;
use crate::core::features::{FeaturePipeline, FeatureStatistics, FeatureVector};
use crate::core::model::{Classify, FeedForwardNet, QuantizedNet};
use crate::error::{KwsError, Result};

/// Which classifier representation to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelKind {
    #[default]
    FullPrecision,
    Quantized,
}

impl ModelKind {
    pub fn file_name(self) -> &'static str {
        match self {
            ModelKind::FullPrecision => MODEL_FILE,
            ModelKind::Quantized => QUANTIZED_MODEL_FILE,
        }
    }
}

/// Loaded pipeline, statistics and classifier. Immutable once built, so a
/// single engine can serve concurrent `classify` calls.
pub struct InferenceEngine {
    pipeline: FeaturePipeline,
    statistics: FeatureStatistics,
    classifier: Box<dyn Classify>,
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("pipeline", &self.pipeline)
            .field("statistics", &self.statistics)
            .field("classifier", &self.classifier.kind())
            .finish()
    }
}

impl InferenceEngine {
    pub fn new(
        config: &FeatureConfig,
        statistics: FeatureStatistics,
        classifier: Box<dyn Classify>,
    ) -> Result<Self> {
        if statistics.dim() != config.n_mfcc {
            return Err(KwsError::invalid_input(format!(
                "normalization record has {} dims, features have {}",
                statistics.dim(),
                config.n_mfcc
            )));
        }
        if classifier.input_dim() != statistics.dim() {
            return Err(KwsError::invalid_input(format!(
                "classifier expects {} inputs, normalization record has {}",
                classifier.input_dim(),
                statistics.dim()
            )));
        }
        Ok(Self {
            pipeline: FeaturePipeline::new(config)?,
            statistics,
            classifier,
        })
    }

    /// Load the normalization record and the chosen classifier from `dir`
    pub fn load(dir: &Path, config: &FeatureConfig, kind: ModelKind) -> Result<Self> {
        let statistics: FeatureStatistics = artifacts::load(&dir.join(NORM_STATS_FILE), config)?;

        let model_path = dir.join(kind.file_name());
        let classifier: Box<dyn Classify> = match kind {
            ModelKind::FullPrecision => {
                let model: FeedForwardNet = artifacts::load(&model_path, config)?;
                model
                    .validate()
                    .map_err(|e| KwsError::artifact_missing(&model_path, e))?;
                Box::new(model)
            }
            ModelKind::Quantized => {
                let model: QuantizedNet = artifacts::load(&model_path, config)?;
                model
                    .validate()
                    .map_err(|e| KwsError::artifact_missing(&model_path, e))?;
                Box::new(model)
            }
        };
        info!("loaded {} classifier from {}", classifier.kind(), dir.display());

        Self::new(config, statistics, classifier)
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn config(&self) -> &FeatureConfig {
        self.pipeline.config()
    }

    pub fn classifier_kind(&self) -> &'static str {
        self.classifier.kind()
    }

    /// Normalized feature vector for a clip, as fed to the classifier
    pub fn features(&self, clip: &AudioClip) -> Result<FeatureVector> {
        if clip.is_empty() {
            return Err(KwsError::invalid_input("audio clip is empty"));
        }
        if log_enabled!(Level::Debug) {
            let signal: Vec<f64> = clip.samples.iter().map(|&s| sample_to_f64(s)).collect();
            debug!(
                "classifying {:.3} s clip, rms {:.5}",
                clip.duration_secs(),
                rms(&signal)
            );
        }
        let raw = self.pipeline.extract_clip(clip)?;
        self.statistics.apply(&raw)
    }

    pub fn classify(&self, clip: &AudioClip) -> Result<ClassificationResult> {
        let features = self.features(clip)?;
        self.classifier.classify(&features)
    }

    pub fn classify_file(&self, path: &Path) -> Result<ClassificationResult> {
        let clip = decode_file(path, self.config().sample_rate)?;
        self.classify(&clip)
    }

    /// Classify raw little-endian 16-bit mono PCM at the configured rate
    pub fn classify_pcm_bytes(&self, bytes: &[u8]) -> Result<ClassificationResult> {
        let clip = clip_from_pcm_bytes(bytes, self.config().sample_rate)?;
        self.classify(&clip)
    }
}

/// Fluent construction of an [`InferenceEngine`] from an artifact directory
#[derive(Debug, Clone)]
pub struct EngineBuilder {
    config: FeatureConfig,
    artifacts_dir: Option<PathBuf>,
    kind: ModelKind,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: FeatureConfig::default(),
            artifacts_dir: None,
            kind: ModelKind::default(),
        }
    }

    pub fn feature_config(mut self, config: FeatureConfig) -> Self {
        self.config = config;
        self
    }

    pub fn artifacts_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.artifacts_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn quantized(mut self, quantized: bool) -> Self {
        self.kind = if quantized {
            ModelKind::Quantized
        } else {
            ModelKind::FullPrecision
        };
        self
    }

    pub fn build(self) -> Result<InferenceEngine> {
        let dir = self
            .artifacts_dir
            .ok_or_else(|| KwsError::artifact_missing("", "no artifact directory configured"))?;
        InferenceEngine::load(&dir, &self.config, self.kind)
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
