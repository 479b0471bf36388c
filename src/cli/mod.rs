// src/cli/mod.rs
//
// Command-line interface module

mod args;
mod output;

pub use args::{Cli, Command};
pub use output::{
    format_corpus_report, format_json, format_prediction, format_scores, format_summary,
    format_training_summary,
};

use anyhow::{bail, Context, Result};
use colorful::Colorful;
use log::warn;
use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;
use crate::core::artifacts::FEATURES_FILE;
use crate::core::decoder::{convert_raw_dir, read_raw_file};
use crate::core::{collect_wav_files, train_from_dataset, CorpusBuilder, Dataset, InferenceEngine};

/// Run a parsed command line
pub fn run(cli: &Cli) -> Result<()> {
    let config = cli.pipeline_config()?;

    match &cli.command {
        Command::Convert { raw_dir, wav_dir } => {
            let written = convert_raw_dir(raw_dir, wav_dir, config.features.sample_rate)
                .with_context(|| format!("Failed to convert {}", raw_dir.display()))?;
            println!("Converted {} files into {}", written.len(), wav_dir.display());
        }
        Command::Extract { corpus, output } => {
            let dataset = extract(corpus, &config, cli.verbose)?;
            dataset
                .save(output, &config.features)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Saved {} vectors to {}", dataset.len(), output.display());
        }
        Command::Train { input, output } => {
            let dataset = if input.is_dir() {
                extract(input, &config, cli.verbose)?
            } else {
                Dataset::load(input, &config.features)
                    .with_context(|| format!("Failed to load dataset {}", input.display()))?
            };
            if dataset.is_empty() {
                bail!("No labelled clips found in {}", input.display());
            }
            if input.is_dir() {
                dataset.save(&output.join(FEATURES_FILE), &config.features)?;
            }

            let trained = train_from_dataset(&dataset, &config)?;
            trained
                .save(output)
                .with_context(|| format!("Failed to write artifacts to {}", output.display()))?;
            print!("{}", format_training_summary(&trained.summary));
            println!("Artifacts written to {}", output.display());
        }
        Command::Classify {
            inputs,
            models,
            quantized,
            raw,
            json,
        } => classify(inputs, models, *quantized, *raw, *json, &config)?,
    }

    Ok(())
}

fn extract(corpus: &Path, config: &PipelineConfig, verbose: bool) -> Result<Dataset> {
    let builder = CorpusBuilder::new(&config.features)?.with_progress(true);
    let (dataset, report) = builder
        .build_from_dir(corpus)
        .with_context(|| format!("Failed to scan corpus {}", corpus.display()))?;
    print!("{}", format_corpus_report(&report, verbose));
    Ok(dataset)
}

fn classify(
    inputs: &[PathBuf],
    models: &Path,
    quantized: bool,
    raw: bool,
    json: bool,
    config: &PipelineConfig,
) -> Result<()> {
    let engine = InferenceEngine::builder()
        .feature_config(config.features.clone())
        .artifacts_dir(models)
        .quantized(quantized)
        .build()
        .with_context(|| format!("Failed to load artifacts from {}", models.display()))?;

    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(collect_wav_files(input)?);
        } else {
            files.push(input.clone());
        }
    }
    if files.is_empty() {
        println!("{}", "No audio files found!".red());
        return Ok(());
    }

    let mut results = Vec::with_capacity(files.len());
    let mut failed = 0;
    for file in &files {
        let result = if raw {
            read_raw_file(file, config.features.sample_rate).and_then(|clip| engine.classify(&clip))
        } else {
            engine.classify_file(file)
        };
        match result {
            Ok(result) => {
                if json {
                    println!("{}", format_json(file, engine.classifier_kind(), &result));
                } else {
                    print!("{}", format_prediction(file, &result));
                }
                results.push(result);
            }
            Err(e) => {
                warn!("{}: {e}", file.display());
                eprintln!("{} {}: {e}", "error".red(), file.display());
                failed += 1;
            }
        }
    }

    if !json && files.len() > 1 {
        print!("{}", format_summary(&results, failed));
    }
    if failed > 0 {
        bail!("{failed} of {} clips could not be classified", files.len());
    }
    Ok(())
}
