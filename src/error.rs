// src/error.rs
//
// Typed failures surfaced by the library. The binary wraps these in anyhow.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the keyword-spotting pipeline
#[derive(Debug, Error)]
pub enum KwsError {
    /// A corpus file whose name prefix is not one of the known labels.
    /// Corpus building skips these instead of aborting.
    #[error("unrecognized label '{prefix}' for {}", file.display())]
    UnrecognizedLabel { file: PathBuf, prefix: String },

    /// Classifier weights or normalization record could not be located or loaded
    #[error("artifact missing: {} ({reason})", path.display())]
    ArtifactMissing { path: PathBuf, reason: String },

    /// Audio could not be decoded to samples, or decoded to nothing
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An artifact was produced with different feature parameters
    #[error("feature configuration mismatch: expected fingerprint {expected}, artifact has {found}")]
    ConfigMismatch { expected: String, found: String },

    #[error("training failed: {0}")]
    Training(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Wav(#[from] hound::Error),
}

pub type Result<T> = std::result::Result<T, KwsError>;

impl KwsError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn artifact_missing(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ArtifactMissing {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
