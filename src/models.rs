//! Core data models for the corpus and the artifact registry.
//!
//! Timestamps are Unix epoch milliseconds as stored in SQLite.

/// One (file, label) association in the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusEntry {
    pub id: i64,
    /// Absolute path; follows the content hash across renames.
    pub filename: String,
    /// Hex SHA-256 of the file content; the canonical identity.
    pub content_hash: String,
    /// Normalized (trimmed, uppercased) label.
    pub label: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A fitted vectoriser, stored as an opaque blob.
#[derive(Debug, Clone)]
pub struct VectorizerArtifact {
    pub id: i64,
    pub transform_blob: Vec<u8>,
    pub created_at: i64,
}

/// A fitted per-label model, stored as an opaque blob.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    pub id: i64,
    /// The vectoriser whose features the model was trained on.
    pub vectorizer_id: i64,
    pub label: String,
    pub model_blob: Vec<u8>,
    pub created_at: i64,
}

/// Result of adding a (file, label) pair to the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Inserted,
    Duplicate,
}

/// Normalize a user-supplied label: trimmed and uppercased.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_uppercase()
}

/// Render a stored millisecond timestamp as ISO 8601 (UTC).
pub fn format_ts_iso(ts_millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts_millis)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts_millis.to_string())
}

/// Current time in the storage representation.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
