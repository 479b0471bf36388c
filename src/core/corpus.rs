// src/core/corpus.rs
//
// Labelled corpus scanning and batch feature extraction.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::classification::Label;
use crate::config::FeatureConfig;
use crate::core::artifacts;
use crate::core::features::{FeaturePipeline, FeatureVector};
use crate::error::{KwsError, Result};

/// Features with their labels, in sorted source-path order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<Label>,
    pub sources: Vec<PathBuf>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Number of examples per label, indexed by [`Label::index`]
    pub fn class_counts(&self) -> [usize; Label::COUNT] {
        let mut counts = [0; Label::COUNT];
        for label in &self.labels {
            counts[label.index()] += 1;
        }
        counts
    }

    pub fn push(&mut self, features: FeatureVector, label: Label, source: PathBuf) {
        self.features.push(features);
        self.labels.push(label);
        self.sources.push(source);
    }

    pub fn save(&self, path: &Path, config: &FeatureConfig) -> Result<()> {
        artifacts::save(path, config, self)
    }

    pub fn load(path: &Path, config: &FeatureConfig) -> Result<Self> {
        let dataset: Self = artifacts::load(path, config)?;
        if dataset.features.len() != dataset.labels.len() {
            return Err(KwsError::artifact_missing(
                path,
                "feature and label counts differ",
            ));
        }
        Ok(dataset)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CorpusReport {
    pub extracted: usize,
    pub skipped: Vec<SkippedFile>,
}

/// All `*.wav` files under `dir`, recursively, sorted by path
pub fn collect_wav_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(KwsError::invalid_input(format!(
            "corpus directory {} does not exist",
            dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Label a corpus file from its name prefix
pub fn label_for(path: &Path) -> Result<Label> {
    Label::from_path(path).ok_or_else(|| KwsError::UnrecognizedLabel {
        file: path.to_path_buf(),
        prefix: Label::file_prefix(path),
    })
}

pub struct CorpusBuilder {
    pipeline: FeaturePipeline,
    show_progress: bool,
}

impl CorpusBuilder {
    pub fn new(config: &FeatureConfig) -> Result<Self> {
        Ok(Self {
            pipeline: FeaturePipeline::new(config)?,
            show_progress: false,
        })
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Extract every labelled WAV under `dir`
    pub fn build_from_dir(&self, dir: &Path) -> Result<(Dataset, CorpusReport)> {
        let files = collect_wav_files(dir)?;
        info!("found {} wav files under {}", files.len(), dir.display());
        Ok(self.build(&files))
    }

    /// Extract features for `files` in parallel. Files with an unknown label
    /// or that fail to decode are skipped and reported; output keeps the
    /// input order.
    pub fn build(&self, files: &[PathBuf]) -> (Dataset, CorpusReport) {
        let progress = self.progress_bar(files.len());

        let results: Vec<Result<(FeatureVector, Label)>> = files
            .par_iter()
            .map(|path| {
                let outcome = label_for(path)
                    .and_then(|label| Ok((self.pipeline.extract_file(path)?, label)));
                progress.inc(1);
                outcome
            })
            .collect();
        progress.finish_and_clear();

        let mut dataset = Dataset::default();
        let mut report = CorpusReport::default();
        for (path, result) in files.iter().zip(results) {
            match result {
                Ok((features, label)) => dataset.push(features, label, path.clone()),
                Err(KwsError::UnrecognizedLabel { prefix, .. }) => {
                    warn!("Skip (unknown label): {} [{prefix}]", path.display());
                    report.skipped.push(SkippedFile {
                        path: path.clone(),
                        reason: format!("unknown label '{prefix}'"),
                    });
                }
                Err(e) => {
                    warn!("Skip (unreadable): {}: {e}", path.display());
                    report.skipped.push(SkippedFile {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        report.extracted = dataset.len();

        let counts = dataset.class_counts();
        info!(
            "extracted {} feature vectors (YES={} NO={} BG={}), skipped {}",
            report.extracted,
            counts[0],
            counts[1],
            counts[2],
            report.skipped.len()
        );
        (dataset, report)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::with_draw_target(Some(len as u64), ProgressDrawTarget::stderr());
        if let Ok(style) =
            ProgressStyle::with_template("{spinner} extracting [{bar:40}] {pos}/{len} ({eta})")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar
    }
}
