//! TF-IDF over word n-grams.
//!
//! Tokens are lowercase runs of two or more alphanumeric (or `_`)
//! characters. Features are every n-gram with `n` in the configured range
//! seen during fitting, sorted lexicographically, so feature indices are a
//! pure function of the fitted corpus.
//!
//! ```text
//! idf(t)   = ln((1 + N) / (1 + df(t))) + 1
//! x[t]     = count(t, doc) * idf(t)
//! x        = x / ‖x‖₂
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::traits::{SparseVec, Transform, Vectorizer};

/// Unfitted vectoriser parameters.
#[derive(Debug, Clone, Copy)]
pub struct TfidfVectorizer {
    pub ngram_min: usize,
    pub ngram_max: usize,
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self {
            ngram_min: 1,
            ngram_max: 3,
        }
    }
}

/// A fitted TF-IDF transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfTransform {
    ngram_min: usize,
    ngram_max: usize,
    /// Sorted; a feature's index is its position here.
    vocabulary: Vec<String>,
    idf: Vec<f64>,
    documents: usize,
}

/// Lowercased word tokens of at least two characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .map(|t| t.to_lowercase())
        .collect()
}

/// Space-joined n-grams of `tokens` for every `n` in `min..=max`.
pub fn ngrams(tokens: &[String], min: usize, max: usize) -> Vec<String> {
    let mut out = Vec::new();
    for n in min..=max {
        if n == 0 || n > tokens.len() {
            continue;
        }
        out.extend(tokens.windows(n).map(|w| w.join(" ")));
    }
    out
}

impl TfidfVectorizer {
    fn terms(&self, text: &str) -> Vec<String> {
        ngrams(&tokenize(text), self.ngram_min, self.ngram_max)
    }
}

impl Vectorizer for TfidfVectorizer {
    type Output = TfidfTransform;

    fn fit(&self, corpus: &[String]) -> Result<TfidfTransform> {
        if self.ngram_min == 0 || self.ngram_min > self.ngram_max {
            bail!(
                "invalid n-gram range {}..={}",
                self.ngram_min,
                self.ngram_max
            );
        }

        let mut df: BTreeMap<String, usize> = BTreeMap::new();
        for doc in corpus {
            let unique: BTreeSet<String> = self.terms(doc).into_iter().collect();
            for term in unique {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let n = corpus.len() as f64;
        let (vocabulary, idf): (Vec<String>, Vec<f64>) = df
            .into_iter()
            .map(|(term, count)| {
                let idf = ((1.0 + n) / (1.0 + count as f64)).ln() + 1.0;
                (term, idf)
            })
            .unzip();

        Ok(TfidfTransform {
            ngram_min: self.ngram_min,
            ngram_max: self.ngram_max,
            vocabulary,
            idf,
            documents: corpus.len(),
        })
    }
}

impl TfidfTransform {
    fn index_of(&self, term: &str) -> Option<usize> {
        self.vocabulary
            .binary_search_by(|probe| probe.as_str().cmp(term))
            .ok()
    }

    /// Number of documents the transform was fitted on.
    pub fn documents(&self) -> usize {
        self.documents
    }

    /// Apply to every document, one row per input in input order.
    pub fn apply_all(&self, corpus: &[String]) -> Vec<SparseVec> {
        corpus.iter().map(|doc| self.apply(doc)).collect()
    }
}

impl Transform for TfidfTransform {
    fn apply(&self, text: &str) -> SparseVec {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in ngrams(&tokenize(text), self.ngram_min, self.ngram_max) {
            if let Some(i) = self.index_of(&term) {
                *counts.entry(i).or_insert(0.0) += 1.0;
            }
        }

        let mut row: SparseVec = counts
            .into_iter()
            .map(|(i, tf)| (i, tf * self.idf[i]))
            .collect();
        row.sort_unstable_by_key(|&(i, _)| i);

        let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in row.iter_mut() {
                *v /= norm;
            }
        }
        row
    }

    fn feature_names(&self) -> &[String] {
        &self.vocabulary
    }
}
