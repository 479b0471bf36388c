// src/core/features/mfcc.rs
//
// MFCC extraction: framing, windowed power spectrum, mel projection, dB
// compression, DCT-II and mean pooling over time.

use super::FeatureVector;
use crate::config::{FeatureConfig, Framing};
use crate::core::decoder::{sample_to_f64, AudioClip};
use crate::core::dsp::{Dct2, FftProcessor, MelFilterbank};
use crate::error::{KwsError, Result};

/// Floor applied before taking the logarithm of mel energies
const AMIN: f64 = 1e-10;

/// Converts fixed-duration buffers into pooled cepstral vectors.
///
/// Everything is precomputed from the [`FeatureConfig`] at construction and
/// never mutated afterwards, so one extractor can serve any number of threads
/// and always yields bit-identical output for identical input.
#[derive(Debug)]
pub struct MfccExtractor {
    config: FeatureConfig,
    fft: FftProcessor,
    filterbank: MelFilterbank,
    dct: Dct2,
}

impl MfccExtractor {
    pub fn new(config: &FeatureConfig) -> Result<Self> {
        config.validate()?;

        let filterbank = MelFilterbank::new(
            config.sample_rate,
            config.n_fft,
            config.n_mels,
            config.fmin as f64,
            config.effective_fmax() as f64,
        );
        let empty = filterbank.empty_bands();
        if empty > 0 {
            log::warn!(
                "{empty} of {} mel bands cover no FFT bin (n_fft={}); they contribute only the log floor",
                config.n_mels,
                config.n_fft
            );
        }

        Ok(Self {
            config: config.clone(),
            fft: FftProcessor::new(config.n_fft, config.window),
            filterbank,
            dct: Dct2::new(config.n_mels, config.n_mfcc),
        })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Extract features from a clip that is already at the configured rate
    pub fn extract(&self, clip: &AudioClip) -> Result<FeatureVector> {
        if clip.sample_rate != self.config.sample_rate {
            return Err(KwsError::invalid_input(format!(
                "clip is {} Hz but features are computed at {} Hz",
                clip.sample_rate, self.config.sample_rate
            )));
        }
        Ok(self.extract_samples(&clip.samples))
    }

    pub fn extract_samples(&self, samples: &[i16]) -> FeatureVector {
        let signal: Vec<f64> = samples.iter().map(|&s| sample_to_f64(s)).collect();
        self.extract_signal(&signal)
    }

    /// Pooled coefficients of a float signal in [-1.0, 1.0]
    pub fn extract_signal(&self, signal: &[f64]) -> FeatureVector {
        let mfcc = self.mfcc_frames(signal);
        let n_frames = mfcc.len() as f64;

        let pooled = (0..self.config.n_mfcc)
            .map(|c| (mfcc.iter().map(|frame| frame[c]).sum::<f64>() / n_frames) as f32)
            .collect();
        FeatureVector::new(pooled)
    }

    /// Number of analysis frames for a buffer of `len` samples
    pub fn frame_count(&self, len: usize) -> usize {
        match self.config.framing {
            Framing::Trailing => len.div_ceil(self.config.hop_length).max(1),
            Framing::Centered => 1 + len / self.config.hop_length,
        }
    }

    /// Per-frame cepstral coefficients, `frames x n_mfcc`
    pub fn mfcc_frames(&self, signal: &[f64]) -> Vec<Vec<f64>> {
        self.log_mel_frames(signal)
            .iter()
            .map(|log_mel| self.dct.transform(log_mel))
            .collect()
    }

    /// Log-mel spectrogram in dB, `frames x n_mels`
    pub fn log_mel_frames(&self, signal: &[f64]) -> Vec<Vec<f64>> {
        let mut frames: Vec<Vec<f64>> = self
            .power_frames(signal)
            .iter()
            .map(|power| {
                self.filterbank
                    .apply(power)
                    .into_iter()
                    .map(|e| 10.0 * e.max(AMIN).log10())
                    .collect()
            })
            .collect();

        // Dynamic range is clamped against the loudest bin of the whole clip
        if let Some(top_db) = self.config.top_db {
            let peak = frames
                .iter()
                .flatten()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            let floor = peak - top_db as f64;
            for value in frames.iter_mut().flatten() {
                *value = value.max(floor);
            }
        }

        frames
    }

    fn power_frames(&self, signal: &[f64]) -> Vec<Vec<f64>> {
        let n_fft = self.config.n_fft;
        let hop = self.config.hop_length;
        let n_frames = self.frame_count(signal.len());

        match self.config.framing {
            Framing::Trailing => (0..n_frames)
                .map(|k| {
                    let start = (k * hop).min(signal.len());
                    let end = (start + n_fft).min(signal.len());
                    self.fft.power_spectrum(&signal[start..end])
                })
                .collect(),
            Framing::Centered => {
                let pad = n_fft / 2;
                let mut padded = vec![0.0; signal.len() + 2 * pad];
                padded[pad..pad + signal.len()].copy_from_slice(signal);
                (0..n_frames)
                    .map(|k| {
                        let start = k * hop;
                        let end = (start + n_fft).min(padded.len());
                        self.fft.power_spectrum(&padded[start..end])
                    })
                    .collect()
            }
        }
    }
}
