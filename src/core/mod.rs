//! Core pipeline: decoding, features, models, training and inference

pub mod artifacts;
pub mod corpus;
pub mod decoder;
pub mod dsp;
pub mod features;
pub mod inference;
pub mod model;
pub mod training;

pub use corpus::{collect_wav_files, CorpusBuilder, CorpusReport, Dataset, SkippedFile};
pub use decoder::{decode_file, AudioClip};
pub use features::{FeaturePipeline, FeatureStatistics, FeatureVector, MfccExtractor};
pub use inference::{EngineBuilder, InferenceEngine, ModelKind};
pub use model::{Classify, FeedForwardNet, QuantizationReport, QuantizedNet, Trainer, TrainingReport};
pub use training::{train_from_dataset, TrainedArtifacts, TrainingSummary};
