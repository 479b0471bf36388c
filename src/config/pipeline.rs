// src/config/pipeline.rs
//
// Immutable parameter sets passed to every pipeline component.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::dsp::WindowFunction;
use crate::error::{KwsError, Result};

/// How a buffer is cut into analysis frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// Frame `k` starts at `k * hop`; frames continue while the window still
    /// overlaps the buffer, the last one zero-padded on the right.
    #[default]
    Trailing,
    /// `n_fft / 2` zeros on both ends, `1 + len / hop` frames.
    Centered,
}

impl Framing {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "trailing" => Some(Self::Trailing),
            "centered" | "center" => Some(Self::Centered),
            _ => None,
        }
    }
}

/// Feature extraction parameters.
///
/// Training and inference must use the same values; every persisted artifact
/// carries [`FeatureConfig::fingerprint`] so a mismatch is caught at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Sample rate in Hz that decoded audio must already be at
    pub sample_rate: u32,
    /// Fixed clip duration every buffer is padded or truncated to
    pub clip_duration_secs: f32,
    pub n_fft: usize,
    pub hop_length: usize,
    /// Cepstral coefficients kept per frame (feature dimensionality)
    pub n_mfcc: usize,
    pub n_mels: usize,
    pub fmin: f32,
    /// Upper filterbank edge; `None` means Nyquist
    pub fmax: Option<f32>,
    /// Dynamic range kept below the loudest mel bin, in dB
    pub top_db: Option<f32>,
    pub window: WindowFunction,
    pub framing: Framing,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            clip_duration_secs: 1.0,
            n_fft: 1024,
            hop_length: 512,
            n_mfcc: 13,
            n_mels: 128,
            fmin: 0.0,
            fmax: None,
            top_db: Some(80.0),
            window: WindowFunction::Hann,
            framing: Framing::Trailing,
        }
    }
}

impl FeatureConfig {
    /// Number of samples in a normalized clip
    pub fn target_len(&self) -> usize {
        (self.sample_rate as f64 * self.clip_duration_secs as f64).round() as usize
    }

    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    pub fn effective_fmax(&self) -> f32 {
        self.fmax.unwrap_or_else(|| self.nyquist())
    }

    /// Stable digest of every parameter that influences feature values
    pub fn fingerprint(&self) -> String {
        let canonical = format!(
            "sr={};dur={:?};n_fft={};hop={};n_mfcc={};n_mels={};fmin={:?};fmax={:?};top_db={:?};window={:?};framing={:?}",
            self.sample_rate,
            self.clip_duration_secs,
            self.n_fft,
            self.hop_length,
            self.n_mfcc,
            self.n_mels,
            self.fmin,
            self.effective_fmax(),
            self.top_db,
            self.window,
            self.framing,
        );
        format!("{:x}", md5::compute(canonical.as_bytes()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(KwsError::invalid_input("sample_rate must be positive"));
        }
        if !self.clip_duration_secs.is_finite() || self.clip_duration_secs <= 0.0 {
            return Err(KwsError::invalid_input(format!(
                "clip_duration_secs must be positive, got {}",
                self.clip_duration_secs
            )));
        }
        if self.n_fft < 2 || self.hop_length == 0 {
            return Err(KwsError::invalid_input(
                "n_fft must be at least 2 and hop_length positive",
            ));
        }
        if self.n_mfcc == 0 || self.n_mfcc > self.n_mels {
            return Err(KwsError::invalid_input(format!(
                "n_mfcc ({}) must be between 1 and n_mels ({})",
                self.n_mfcc, self.n_mels
            )));
        }
        if self.fmin < 0.0 || self.effective_fmax() <= self.fmin || self.effective_fmax() > self.nyquist() {
            return Err(KwsError::invalid_input(format!(
                "filterbank range {}..{} Hz is invalid for {} Hz audio",
                self.fmin,
                self.effective_fmax(),
                self.sample_rate
            )));
        }
        Ok(())
    }
}

/// Classifier training parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub hidden_units: [usize; 2],
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    /// Share of every class held out for validation
    pub validation_fraction: f32,
    /// Seeds weight init, the validation split and batch shuffling
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            hidden_units: [32, 32],
            epochs: 40,
            batch_size: 16,
            learning_rate: 0.001,
            validation_fraction: 0.2,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hidden_units.contains(&0) {
            return Err(KwsError::invalid_input(format!(
                "hidden_units must all be positive, got {:?}",
                self.hidden_units
            )));
        }
        if self.batch_size == 0 {
            return Err(KwsError::invalid_input("batch_size must be positive"));
        }
        if !(0.0..1.0).contains(&self.validation_fraction) {
            return Err(KwsError::invalid_input(format!(
                "validation_fraction must be in [0, 1), got {}",
                self.validation_fraction
            )));
        }
        Ok(())
    }
}

/// Int8 calibration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizationConfig {
    /// Leading corpus examples driven through the float model for ranges
    pub calibration_samples: usize,
    /// Largest tolerated share of argmax disagreements on held-out data
    pub max_disagreement: f32,
}

impl Default for QuantizationConfig {
    fn default() -> Self {
        Self {
            calibration_samples: 100,
            max_disagreement: 0.05,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub features: FeatureConfig,
    pub training: TrainingConfig,
    pub quantization: QuantizationConfig,
}

impl PipelineConfig {
    /// Load from a JSON file; missing fields fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.features.validate()?;
        config.training.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
