// src/testgen/mod.rs
//
// Synthetic audio and feature generators for tests and demos.
// Every generator is deterministic: random content comes from a seeded StdRng
// so fixtures are identical across runs and machines.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use crate::classification::Label;
use crate::core::decoder::{f64_to_sample, write_wav, AudioClip};
use crate::core::features::FeatureVector;
use crate::error::Result;

/// Sine tone, `amplitude` in full-scale units (1.0 = i16 max)
pub fn tone(freq: f64, amplitude: f64, sample_rate: u32, len: usize) -> AudioClip {
    let samples = (0..len)
        .map(|n| {
            let t = n as f64 / sample_rate as f64;
            f64_to_sample(amplitude * (2.0 * PI * freq * t).sin())
        })
        .collect();
    AudioClip::new(samples, sample_rate)
}

/// Uniform white noise in `[-amplitude, amplitude]`
pub fn noise(amplitude: f64, sample_rate: u32, len: usize, seed: u64) -> AudioClip {
    let mut rng = StdRng::seed_from_u64(seed);
    let samples = (0..len)
        .map(|_| f64_to_sample(amplitude * rng.gen_range(-1.0..=1.0)))
        .collect();
    AudioClip::new(samples, sample_rate)
}

pub fn silence(sample_rate: u32, len: usize) -> AudioClip {
    AudioClip::new(vec![0; len], sample_rate)
}

/// Linear sweep from `f0` to `f1` Hz over the clip
pub fn chirp(f0: f64, f1: f64, amplitude: f64, sample_rate: u32, len: usize) -> AudioClip {
    let duration = len as f64 / sample_rate as f64;
    let rate = if duration > 0.0 { (f1 - f0) / duration } else { 0.0 };
    let samples = (0..len)
        .map(|n| {
            let t = n as f64 / sample_rate as f64;
            let phase = 2.0 * PI * (f0 * t + 0.5 * rate * t * t);
            f64_to_sample(amplitude * phase.sin())
        })
        .collect();
    AudioClip::new(samples, sample_rate)
}

/// Sample-wise sum, saturating at the i16 range
pub fn mix(a: &AudioClip, b: &AudioClip) -> AudioClip {
    let len = a.len().max(b.len());
    let samples = (0..len)
        .map(|i| {
            let x = a.samples.get(i).copied().unwrap_or(0) as i32;
            let y = b.samples.get(i).copied().unwrap_or(0) as i32;
            (x + y).clamp(i16::MIN as i32, i16::MAX as i32) as i16
        })
        .collect();
    AudioClip::new(samples, a.sample_rate)
}

/// Three well-separated Gaussian-ish clusters, one per label, in `dim`
/// dimensions. Examples are interleaved YES, NO, BG, YES, ...
pub fn feature_clusters(
    per_class: usize,
    dim: usize,
    separation: f32,
    seed: u64,
) -> (Vec<FeatureVector>, Vec<Label>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut features = Vec::with_capacity(per_class * Label::COUNT);
    let mut labels = Vec::with_capacity(per_class * Label::COUNT);

    for _ in 0..per_class {
        for label in Label::ALL {
            let values = (0..dim)
                .map(|d| {
                    let centre = if d % Label::COUNT == label.index() {
                        separation
                    } else {
                        0.0
                    };
                    // Sum of uniforms: cheap bell-shaped jitter with unit-ish spread
                    let jitter: f32 = (0..3).map(|_| rng.gen_range(-0.5f32..0.5)).sum();
                    centre + jitter
                })
                .collect();
            features.push(FeatureVector::new(values));
            labels.push(label);
        }
    }
    (features, labels)
}

/// Synthetic clip for a label: a bright tone for YES, a low sweep for NO and
/// faint noise for BG
pub fn keyword_clip(label: Label, sample_rate: u32, len: usize, seed: u64) -> AudioClip {
    let mut rng = StdRng::seed_from_u64(seed);
    let jitter: f64 = rng.gen_range(0.9..1.1);
    match label {
        Label::Yes => mix(
            &tone(1_800.0 * jitter, 0.5, sample_rate, len),
            &noise(0.02, sample_rate, len, seed),
        ),
        Label::No => mix(
            &chirp(150.0 * jitter, 450.0 * jitter, 0.5, sample_rate, len),
            &noise(0.02, sample_rate, len, seed),
        ),
        Label::Background => noise(0.001 * jitter, sample_rate, len, seed),
    }
}

/// One entry of a generated corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub filename: String,
    pub label: Option<Label>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusManifest {
    pub sample_rate: u32,
    pub entries: Vec<CorpusEntry>,
}

impl CorpusManifest {
    pub fn labelled(&self) -> usize {
        self.entries.iter().filter(|e| e.label.is_some()).count()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }
}

/// Writes labelled WAV corpora named `<prefix>_<n>.wav`
pub struct CorpusGenerator {
    output_dir: PathBuf,
    sample_rate: u32,
    clip_len: usize,
}

impl CorpusGenerator {
    pub fn new(output_dir: &Path, sample_rate: u32, clip_len: usize) -> Result<Self> {
        std::fs::create_dir_all(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            sample_rate,
            clip_len,
        })
    }

    /// `per_class` clips of each label plus `unknown` clips whose prefix is
    /// not a label
    pub fn generate(&self, per_class: usize, unknown: usize, seed: u64) -> Result<CorpusManifest> {
        let mut entries = Vec::new();
        for label in Label::ALL {
            for n in 0..per_class {
                let clip_seed = seed
                    .wrapping_mul(1_000)
                    .wrapping_add((label.index() * per_class + n) as u64);
                let clip = keyword_clip(label, self.sample_rate, self.clip_len, clip_seed);
                let filename = format!("{}_{n:03}.wav", label.prefix());
                write_wav(&self.output_dir.join(&filename), &clip)?;
                entries.push(CorpusEntry {
                    filename,
                    label: Some(label),
                });
            }
        }
        for n in 0..unknown {
            let clip = noise(0.3, self.sample_rate, self.clip_len, seed.wrapping_add(n as u64));
            let filename = format!("maybe_{n:03}.wav");
            write_wav(&self.output_dir.join(&filename), &clip)?;
            entries.push(CorpusEntry {
                filename,
                label: None,
            });
        }
        Ok(CorpusManifest {
            sample_rate: self.sample_rate,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generators_are_deterministic() {
        assert_eq!(noise(0.5, 16_000, 100, 7), noise(0.5, 16_000, 100, 7));
        assert_ne!(noise(0.5, 16_000, 100, 7), noise(0.5, 16_000, 100, 8));
        assert_eq!(feature_clusters(3, 4, 1.0, 1), feature_clusters(3, 4, 1.0, 1));
    }

    #[test]
    fn test_tone_amplitude() {
        let clip = tone(1_000.0, 0.5, 16_000, 16_000);
        let peak = clip.samples.iter().map(|s| s.unsigned_abs()).max().unwrap();
        assert!((16_000..=16_400).contains(&peak), "peak {peak}");
        assert!(silence(16_000, 10).samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_clusters_shape() {
        let (features, labels) = feature_clusters(4, 13, 3.0, 2);
        assert_eq!(features.len(), 12);
        assert_eq!(labels[..3], Label::ALL);
        assert!(features.iter().all(|f| f.len() == 13));
    }

    #[test]
    fn test_corpus_generator_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let generator = CorpusGenerator::new(dir.path(), 16_000, 1_600).unwrap();
        let manifest = generator.generate(2, 1, 5).unwrap();
        assert_eq!(manifest.entries.len(), 7);
        assert_eq!(manifest.labelled(), 6);
        assert!(dir.path().join("bg_001.wav").exists());
        assert!(dir.path().join("maybe_000.wav").exists());

        let path = dir.path().join("manifest.json");
        manifest.save(&path).unwrap();
        assert_eq!(CorpusManifest::load(&path).unwrap().entries.len(), 7);
    }
}
