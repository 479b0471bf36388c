//! Feature extraction shared by corpus building and inference
//!
//! [`FeaturePipeline`] is the only place audio turns into features: the
//! corpus builder and the inference engine both hold one, so the two call
//! sites cannot drift apart.

mod frame;
mod mfcc;
mod statistics;

pub use frame::normalize_length;
pub use mfcc::MfccExtractor;
pub use statistics::{FeatureStatistics, NORM_EPSILON};

use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::path::Path;

use crate::config::FeatureConfig;
use crate::core::decoder::{decode_file, AudioClip};
use crate::error::Result;

/// Fixed-length vector of pooled cepstral coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl Deref for FeatureVector {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Decode → fix duration → MFCC
#[derive(Debug)]
pub struct FeaturePipeline {
    extractor: MfccExtractor,
}

impl FeaturePipeline {
    pub fn new(config: &FeatureConfig) -> Result<Self> {
        Ok(Self {
            extractor: MfccExtractor::new(config)?,
        })
    }

    pub fn config(&self) -> &FeatureConfig {
        self.extractor.config()
    }

    pub fn extractor(&self) -> &MfccExtractor {
        &self.extractor
    }

    /// Pad or truncate a clip to the configured duration
    pub fn normalize_clip(&self, clip: &AudioClip) -> AudioClip {
        AudioClip::new(
            normalize_length(&clip.samples, self.config().target_len()),
            clip.sample_rate,
        )
    }

    pub fn extract_clip(&self, clip: &AudioClip) -> Result<FeatureVector> {
        self.extractor.extract(&self.normalize_clip(clip))
    }

    pub fn extract_file(&self, path: &Path) -> Result<FeatureVector> {
        let clip = decode_file(path, self.config().sample_rate)?;
        self.extract_clip(&clip)
    }
}
