//! Configuration module for kwspot

mod pipeline;

pub use pipeline::{FeatureConfig, Framing, PipelineConfig, QuantizationConfig, TrainingConfig};
