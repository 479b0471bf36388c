//! kwspot - Keyword spotting on short audio clips
//!
//! Turns one-second clips into pooled MFCC vectors, trains a small
//! feed-forward classifier over three classes (YES, NO, background),
//! quantizes it to int8 for embedded targets and classifies new clips with
//! either representation.
//!
//! ## Features
//!
//! - **One extraction path**: corpus building and inference share
//!   [`FeaturePipeline`], so training-time and inference-time features are
//!   bit-identical
//! - **Persisted normalization**: mean/std fitted once over the corpus and
//!   reused verbatim at inference
//! - **int8 quantization**: per-tensor scale/zero-point calibrated on real
//!   features, checked against the float model with a decision-stability gate
//! - **Fingerprinted artifacts**: every file records the feature configuration
//!   it was produced under
//!
//! ## Module Structure
//!
//! - `core` - Decoding, DSP, features, models, training and inference
//! - `classification` - Labels and classification results
//! - `config` - Feature, training and quantization parameters
//! - `cli` - Command-line interface
//! - `testgen` - Deterministic synthetic audio for tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kwspot::core::InferenceEngine;
//!
//! let engine = InferenceEngine::builder()
//!     .artifacts_dir("models")
//!     .quantized(true)
//!     .build()?;
//!
//! let result = engine.classify_file(Path::new("clip.wav"))?;
//! println!("Pred: {}", result.label);
//! ```
//!
//! ## Feature Parameters
//!
//! | Parameter  | Default | Notes                                  |
//! |------------|---------|----------------------------------------|
//! | sample rate| 16000   | clips are resampled on decode          |
//! | duration   | 1.0 s   | shorter clips zero-padded, longer cut  |
//! | n_fft      | 1024    | periodic Hann window                   |
//! | hop        | 512     | trailing frames zero-padded            |
//! | mel bands  | 128     | Slaney scale and area normalization    |
//! | MFCCs      | 13      | orthonormal DCT-II, mean over frames   |

// Decoding, features, models and the inference engine
pub mod core;

// Command-line interface
pub mod cli;

// Pipeline configuration
pub mod config;

// Labels and results
pub mod classification;

pub mod error;

// Synthetic signals for tests and demos
pub mod testgen;

pub use classification::{ClassificationResult, Label};
pub use config::{FeatureConfig, Framing, PipelineConfig, QuantizationConfig, TrainingConfig};
pub use core::{
    AudioClip, Classify, CorpusBuilder, Dataset, EngineBuilder, FeaturePipeline,
    FeatureStatistics, FeatureVector, InferenceEngine, ModelKind, TrainedArtifacts,
};
pub use error::{KwsError, Result};
