//! Shared result types passed from the engine to its caller.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Why a single file failed to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The input could not be read or decoded.
    Input,
    /// Workflow preservation was requested for a non-PNG input.
    FormatMismatch,
    /// The output directory or file could not be created or written.
    Filesystem,
    /// The encoder rejected the image.
    Encode,
}

/// Outcome of converting one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    Success {
        input: PathBuf,
        output: PathBuf,
    },
    Failure {
        input: PathBuf,
        kind: FailureKind,
        reason: String,
    },
}

impl ConversionOutcome {
    pub fn input(&self) -> &PathBuf {
        match self {
            ConversionOutcome::Success { input, .. } | ConversionOutcome::Failure { input, .. } => {
                input
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Success { .. })
    }
}

/// A collision resolved by suffixing: `photo.webp -> photo_1.webp`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RenameRecord {
    /// The name the output would have had without a collision.
    pub original: String,
    /// The name actually written.
    pub renamed: String,
}

impl fmt::Display for RenameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.original, self.renamed)
    }
}

/// Everything a batch produced: one outcome per input plus the rename log.
///
/// Both lists are in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub outcomes: Vec<ConversionOutcome>,
    pub renames: Vec<RenameRecord>,
}

impl BatchResult {
    pub fn successes(&self) -> impl Iterator<Item = &ConversionOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConversionOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}
