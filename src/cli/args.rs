//! CLI argument parsing

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{Framing, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "kwspot")]
#[command(about = "Keyword spotting: MFCC features, tiny classifier, int8 quantization")]
#[command(version)]
pub struct Cli {
    /// Pipeline configuration (JSON); missing fields use defaults
    #[arg(short, long, global = true, env = "KWSPOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Frame placement: trailing (default) or centered
    #[arg(long, global = true, value_parser = parse_framing)]
    pub framing: Option<Framing>,

    /// Debug-level logging, including per-epoch training statistics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert raw 16-bit little-endian PCM files into WAV
    Convert {
        /// Directory of *.raw files
        raw_dir: PathBuf,

        /// Output directory for *.wav files
        #[arg(default_value = "wav")]
        wav_dir: PathBuf,
    },

    /// Extract features from a labelled corpus of yes_/no_/bg_ WAV files
    Extract {
        /// Corpus directory, scanned recursively
        corpus: PathBuf,

        /// Output dataset file
        #[arg(short, long, default_value = "features.json")]
        output: PathBuf,
    },

    /// Train the classifier, quantize it and write all artifacts
    Train {
        /// Corpus directory or a dataset file written by `extract`
        input: PathBuf,

        /// Artifact output directory
        #[arg(short, long, default_value = "models")]
        output: PathBuf,
    },

    /// Classify clips with previously trained artifacts
    Classify {
        /// Audio files or directories of WAV files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Artifact directory
        #[arg(short, long, default_value = "models")]
        models: PathBuf,

        /// Use the int8 model instead of the float one
        #[arg(short, long)]
        quantized: bool,

        /// Treat inputs as raw 16-bit PCM at the configured sample rate
        #[arg(long)]
        raw: bool,

        /// JSON output
        #[arg(long)]
        json: bool,
    },
}

fn parse_framing(name: &str) -> std::result::Result<Framing, String> {
    Framing::from_name(name).ok_or_else(|| format!("unknown framing '{name}' (trailing, centered)"))
}

impl Cli {
    /// Configuration file (or defaults) with command-line overrides applied
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(framing) = self.framing {
            config.features.framing = framing;
        }
        config.features.validate()?;
        Ok(config)
    }
}

fn load_config(path: &Path) -> Result<PipelineConfig> {
    PipelineConfig::from_file(path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))
}
