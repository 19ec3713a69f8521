//! Capability traits for the two fitted artifacts.
//!
//! Training only needs to know that a vectoriser turns a corpus into a
//! [`Transform`], and that a trainer turns a feature matrix plus membership
//! vector into a [`Classifier`]. Both fitted objects are stored as opaque
//! blobs; the JSON encoding lives in the default `to_blob`/`from_blob`
//! methods so every implementation is persisted the same way.
//!
//! # Row alignment
//!
//! Row `i` of the matrix passed to [`Trainer::fit`] and element `i` of the
//! target vector must describe the same document.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Sparse feature vector: `(feature index, value)` pairs sorted by index.
pub type SparseVec = Vec<(usize, f64)>;

/// Fits a text transform over a corpus.
pub trait Vectorizer {
    type Output: Transform;

    /// Learn the vocabulary and weighting from `corpus`. The resulting
    /// transform is frozen: scoring must reuse it rather than refit.
    fn fit(&self, corpus: &[String]) -> Result<Self::Output>;
}

/// A fitted text-to-vector transform.
pub trait Transform: Serialize + DeserializeOwned {
    /// Map `text` into the fitted feature space. Unknown terms are dropped.
    fn apply(&self, text: &str) -> SparseVec;

    /// Feature names in index order.
    fn feature_names(&self) -> &[String];

    fn dims(&self) -> usize {
        self.feature_names().len()
    }

    fn to_blob(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context("Failed to serialize transform")
    }

    fn from_blob(blob: &[u8]) -> Result<Self> {
        serde_json::from_slice(blob).context("Failed to deserialize transform")
    }
}

/// Fits a binary classifier over a feature matrix.
pub trait Trainer {
    type Output: Classifier;

    /// `matrix` rows and `targets` must have equal length and alignment.
    /// `dims` is the feature-space width.
    fn fit(&self, matrix: &[SparseVec], targets: &[bool], dims: usize) -> Result<Self::Output>;
}

/// A fitted binary classifier.
pub trait Classifier: Serialize + DeserializeOwned {
    /// Probability in `[0, 1]` that `x` belongs to the positive class.
    fn predict_probability(&self, x: &SparseVec) -> f64;

    /// One weight per feature, aligned with [`Transform::feature_names`].
    fn feature_weights(&self) -> &[f64];

    fn to_blob(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context("Failed to serialize model")
    }

    fn from_blob(blob: &[u8]) -> Result<Self> {
        serde_json::from_slice(blob).context("Failed to deserialize model")
    }
}
