// Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use kwspot::core::decoder::write_wav;
use kwspot::testgen::{self, CorpusGenerator, CorpusManifest};
use kwspot::{PipelineConfig, TrainingConfig};

pub const SAMPLE_RATE: u32 = 16_000;
pub const CLIP_LEN: usize = 16_000;

pub fn binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_kwspot"))
}

pub fn run_kwspot() -> Command {
    let mut cmd = Command::new(binary_path());
    cmd.env("RUST_LOG", "warn");
    cmd
}

/// Defaults, but with a training schedule short enough for tests
pub fn fast_config() -> PipelineConfig {
    PipelineConfig {
        training: TrainingConfig {
            epochs: 80,
            learning_rate: 0.01,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Labelled synthetic corpus plus `unknown` clips with an unrecognized prefix.
/// A few background clips are exact digital silence.
pub fn write_corpus(dir: &Path, per_class: usize, unknown: usize) -> CorpusManifest {
    let manifest = CorpusGenerator::new(dir, SAMPLE_RATE, CLIP_LEN)
        .and_then(|g| g.generate(per_class, unknown, 17))
        .expect("failed to write corpus");
    for n in 0..3 {
        write_wav(
            &dir.join(format!("bg_silence_{n}.wav")),
            &testgen::silence(SAMPLE_RATE, CLIP_LEN),
        )
        .expect("failed to write silence");
    }
    manifest
}
