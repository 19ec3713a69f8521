//! Error taxonomy for labeling operations.
//!
//! Command plumbing uses `anyhow`; the conditions callers need to match on
//! (skip a file during training, abort a prediction, tell a missing label
//! from a broken registry) are carried by [`LabelError`].

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("unsupported format for {path:?}: {reason}")]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("file not found: {0:?}")]
    FileNotFound(PathBuf),

    #[error("no vectoriser #{0}")]
    ArtifactNotFound(i64),

    #[error("label {0} not found")]
    LabelNotFound(String),

    /// Warning-level: logged by the trainer, never returned as a failure.
    #[error(
        "too few examples for {label}: {positives} positive / {negatives} negative (need {minimum} of each)"
    )]
    InsufficientExamples {
        label: String,
        positives: usize,
        negatives: usize,
        minimum: usize,
    },

    /// A stored artifact cannot be used: undecodable blob, or a model whose
    /// vectoriser no longer resolves.
    #[error("internal error: {what} #{id} is unusable: {reason}")]
    Corrupt {
        what: &'static str,
        id: i64,
        reason: String,
    },
}

impl LabelError {
    /// True for extraction failures that training skips over.
    pub fn is_extraction_failure(&self) -> bool {
        matches!(
            self,
            LabelError::UnsupportedFormat { .. } | LabelError::FileNotFound(_)
        )
    }
}
