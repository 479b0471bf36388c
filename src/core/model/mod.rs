//! Keyword classifiers: the float network, its trainer and the int8 variant

mod network;
mod quantize;
mod train;

pub use network::{Activation, DenseLayer, FeedForwardNet};
pub use quantize::{
    compare_decisions, quantize, QuantParams, QuantizationReport, QuantizedLayer, QuantizedNet,
};
pub use train::{accuracy, stratified_split, EpochStats, Trainer, TrainingReport};

use crate::classification::{ClassificationResult, Label};
use crate::error::{KwsError, Result};

/// A loaded classifier. Implementations are immutable after construction,
/// so one instance can be shared by concurrent callers.
pub trait Classify: Send + Sync {
    fn input_dim(&self) -> usize;

    /// Short name of the numeric representation, for reports
    fn kind(&self) -> &'static str;

    /// Class probabilities indexed by [`Label::index`]
    fn predict_probabilities(&self, features: &[f32]) -> Result<[f32; Label::COUNT]>;

    fn classify(&self, features: &[f32]) -> Result<ClassificationResult> {
        Ok(ClassificationResult::from_probabilities(
            self.predict_probabilities(features)?,
        ))
    }

    fn check_input(&self, features: &[f32]) -> Result<()> {
        if features.len() != self.input_dim() {
            return Err(KwsError::invalid_input(format!(
                "classifier expects {} features, got {}",
                self.input_dim(),
                features.len()
            )));
        }
        Ok(())
    }
}
