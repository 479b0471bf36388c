// src/core/training.rs
//
// Corpus → statistics → float model → int8 model, plus persistence of the lot.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{FeatureConfig, PipelineConfig};
use crate::core::artifacts::{self, MODEL_FILE, NORM_STATS_FILE, QUANTIZED_MODEL_FILE, REPORT_FILE};
use crate::core::corpus::Dataset;
use crate::core::features::{FeatureStatistics, FeatureVector};
use crate::core::model::{
    compare_decisions, quantize, FeedForwardNet, QuantizationReport, QuantizedNet, Trainer,
    TrainingReport,
};
use crate::error::{KwsError, Result};

/// Reports written next to the model files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub training: TrainingReport,
    pub quantization: QuantizationReport,
    pub passes_gate: bool,
}

/// Everything produced by one training run
#[derive(Debug, Clone)]
pub struct TrainedArtifacts {
    pub feature_config: FeatureConfig,
    pub statistics: FeatureStatistics,
    pub model: FeedForwardNet,
    pub quantized: QuantizedNet,
    pub summary: TrainingSummary,
}

impl TrainedArtifacts {
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let config = &self.feature_config;
        artifacts::save(&dir.join(NORM_STATS_FILE), config, &self.statistics)?;
        artifacts::save(&dir.join(MODEL_FILE), config, &self.model)?;
        artifacts::save(&dir.join(QUANTIZED_MODEL_FILE), config, &self.quantized)?;
        artifacts::save(&dir.join(REPORT_FILE), config, &self.summary)?;
        Ok(())
    }
}

/// Fit normalization over the whole corpus, train, then quantize using the
/// first `calibration_samples` normalized vectors in corpus order.
pub fn train_from_dataset(dataset: &Dataset, config: &PipelineConfig) -> Result<TrainedArtifacts> {
    if dataset.is_empty() {
        return Err(KwsError::Training("dataset is empty".into()));
    }
    let counts = dataset.class_counts();
    if counts.iter().any(|&c| c == 0) {
        warn!("corpus is missing at least one class: YES={} NO={} BG={}", counts[0], counts[1], counts[2]);
    }

    let statistics = FeatureStatistics::fit(&dataset.features)?;
    let normalized = statistics.apply_all(&dataset.features)?;

    let (model, training) = Trainer::new(&config.training).train(&normalized, &dataset.labels)?;

    let n_calib = config.quantization.calibration_samples.min(normalized.len());
    let quantized = quantize(&model, &normalized[..n_calib])?;

    // Held-out evaluation set: the validation split, or everything when the
    // corpus was too small to hold anything out
    let eval_indices: Vec<usize> = if training.validation_indices.is_empty() {
        (0..normalized.len()).collect()
    } else {
        training.validation_indices.clone()
    };
    let eval_features: Vec<FeatureVector> =
        eval_indices.iter().map(|&i| normalized[i].clone()).collect();
    let eval_labels: Vec<_> = eval_indices.iter().map(|&i| dataset.labels[i]).collect();

    let quantization = compare_decisions(
        &model,
        &quantized,
        &eval_features,
        &eval_labels,
        training.validation_accuracy,
    )?;
    let passes_gate = quantization.passes_gate(config.quantization.max_disagreement);
    if passes_gate {
        info!("int8 model passes the decision-stability gate");
    } else {
        warn!(
            "int8 model fails the decision-stability gate: agreement {:.3} vs validation accuracy {:.3}, disagreement {:.3} (max {:.3})",
            quantization.agreement,
            quantization.reference_accuracy,
            quantization.disagreement_rate,
            config.quantization.max_disagreement
        );
    }

    Ok(TrainedArtifacts {
        feature_config: config.features.clone(),
        statistics,
        model,
        quantized,
        summary: TrainingSummary {
            training,
            quantization,
            passes_gate,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingConfig;
    use crate::testgen;
    use std::path::PathBuf;

    fn cluster_dataset() -> Dataset {
        let (features, labels) = testgen::feature_clusters(30, 13, 3.0, 4);
        let mut dataset = Dataset::default();
        for (i, (f, l)) in features.into_iter().zip(labels).enumerate() {
            dataset.push(f, l, PathBuf::from(format!("{i}.wav")));
        }
        dataset
    }

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            training: TrainingConfig {
                epochs: 50,
                learning_rate: 0.01,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_train_from_dataset() {
        let trained = train_from_dataset(&cluster_dataset(), &fast_config()).unwrap();
        assert_eq!(trained.statistics.dim(), 13);
        assert!(trained.summary.training.validation_accuracy > 0.9);
        assert!(trained.summary.quantization.disagreement_rate <= 0.05);
        assert_eq!(trained.summary.quantization.evaluated, 18);
    }

    #[test]
    fn test_save_writes_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let trained = train_from_dataset(&cluster_dataset(), &fast_config()).unwrap();
        trained.save(dir.path()).unwrap();

        for name in [NORM_STATS_FILE, MODEL_FILE, QUANTIZED_MODEL_FILE, REPORT_FILE] {
            assert!(dir.path().join(name).exists(), "{name}");
        }
        let model: FeedForwardNet =
            artifacts::load(&dir.path().join(MODEL_FILE), &FeatureConfig::default()).unwrap();
        assert_eq!(model, trained.model);
    }

    #[test]
    fn test_empty_dataset() {
        assert!(train_from_dataset(&Dataset::default(), &PipelineConfig::default()).is_err());
    }
}
