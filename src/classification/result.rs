//! Classification result types

use serde::Serialize;

use super::label::Label;
use crate::core::dsp::argmax;

/// Outcome of classifying one clip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub label: Label,
    /// Probabilities indexed by [`Label::index`]
    pub probabilities: [f32; Label::COUNT],
}

impl ClassificationResult {
    /// Pick the most probable label; ties go to the lower index
    pub fn from_probabilities(probabilities: [f32; Label::COUNT]) -> Self {
        let label = Label::from_index(argmax(&probabilities)).unwrap_or(Label::Background);
        Self {
            label,
            probabilities,
        }
    }

    pub fn probability(&self, label: Label) -> f32 {
        self.probabilities[label.index()]
    }

    pub fn confidence(&self) -> f32 {
        self.probability(self.label)
    }
}
