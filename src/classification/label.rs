//! The closed label enumeration shared by the corpus and every artifact

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Keyword classes. Indices are part of the artifact schema: changing them
/// invalidates every persisted dataset and model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "usize", try_from = "usize")]
pub enum Label {
    Yes = 0,
    No = 1,
    Background = 2,
}

impl Label {
    pub const ALL: [Label; 3] = [Label::Yes, Label::No, Label::Background];
    pub const COUNT: usize = 3;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Map a corpus file-name prefix (`yes`, `no`, `bg`)
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_lowercase().as_str() {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            "bg" => Some(Self::Background),
            _ => None,
        }
    }

    /// Label prefix of a corpus file: the part of the file name before the
    /// first `_`, lower-cased. `yes_003.wav` gives `yes`.
    pub fn file_prefix(path: &Path) -> String {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        name.split('_').next().unwrap_or_default().to_lowercase()
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        Self::from_prefix(&Self::file_prefix(path))
    }

    /// Display name used in reports
    pub fn name(self) -> &'static str {
        match self {
            Label::Yes => "YES",
            Label::No => "NO",
            Label::Background => "BG",
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Label::Yes => "yes",
            Label::No => "no",
            Label::Background => "bg",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Label> for usize {
    fn from(label: Label) -> Self {
        label.index()
    }
}

impl TryFrom<usize> for Label {
    type Error = String;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Label::from_index(index).ok_or_else(|| format!("label index {index} out of range"))
    }
}
