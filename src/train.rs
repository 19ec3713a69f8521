//! Training orchestration.
//!
//! One run fits a fresh vectoriser over every extractable corpus file, stores
//! it, then fits and stores one classifier per label against that shared
//! feature matrix. Row `i` of the matrix and element `i` of every membership
//! vector refer to the same file: both are built from one filename list.
//!
//! Files whose text cannot be extracted are skipped with a warning. The
//! vectoriser is committed before any model that references it.

use std::path::Path;

use anyhow::{bail, Result};

use crate::classifier::LogisticRegressionTrainer;
use crate::config::{Config, InsufficientPolicy};
use crate::db::Session;
use crate::error::LabelError;
use crate::extract;
use crate::progress::{ProgressMode, ProgressReporter, TrainProgressEvent};
use crate::tfidf::TfidfVectorizer;
use crate::traits::{Classifier, SparseVec, Trainer, Transform, Vectorizer};

/// Outcome of training one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTraining {
    pub label: String,
    pub positives: usize,
    pub negatives: usize,
    /// Below the configured minimum on either side.
    pub insufficient: bool,
    /// `None` when the label was skipped by policy.
    pub model_id: Option<i64>,
}

/// What a training run produced.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub vectorizer_id: i64,
    /// Files that made it into the feature matrix, in row order.
    pub documents: Vec<String>,
    /// Files dropped because their text could not be extracted.
    pub skipped: Vec<String>,
    pub features: usize,
    pub labels: Vec<LabelTraining>,
}

impl TrainSummary {
    pub fn models_trained(&self) -> usize {
        self.labels.iter().filter(|l| l.model_id.is_some()).count()
    }
}

/// Extracted corpus text, aligned by index with its filenames.
pub struct ExtractedCorpus {
    pub filenames: Vec<String>,
    pub texts: Vec<String>,
    pub skipped: Vec<String>,
}

/// Read every file, keeping the ones whose text can be extracted.
pub fn extract_corpus(
    filenames: Vec<String>,
    max_file_bytes: u64,
    reporter: &dyn ProgressReporter,
) -> Result<ExtractedCorpus> {
    let total = filenames.len() as u64;
    let mut corpus = ExtractedCorpus {
        filenames: Vec::with_capacity(filenames.len()),
        texts: Vec::with_capacity(filenames.len()),
        skipped: Vec::new(),
    };

    for (i, filename) in filenames.into_iter().enumerate() {
        match extract::extract_file(Path::new(&filename), max_file_bytes) {
            Ok(text) => {
                corpus.filenames.push(filename);
                corpus.texts.push(text);
            }
            Err(e) if e.is_extraction_failure() => {
                tracing::warn!("skipping {}: {}", filename, e);
                corpus.skipped.push(filename);
            }
            Err(e) => return Err(e.into()),
        }
        reporter.report(TrainProgressEvent::Extracting {
            n: i as u64 + 1,
            total,
        });
    }

    Ok(corpus)
}

/// Run a full training pass against `session`.
pub async fn train(
    session: &Session,
    config: &Config,
    reporter: &dyn ProgressReporter,
) -> Result<TrainSummary> {
    let corpus_store = session.corpus();
    let registry = session.registry();

    let filenames = corpus_store.distinct_filenames().await?;
    let corpus = extract_corpus(filenames, config.extract.max_file_bytes, reporter)?;
    if corpus.texts.is_empty() {
        bail!("No extractable documents in the corpus; add files before training");
    }

    let vectorizer = TfidfVectorizer {
        ngram_min: config.training.ngram_min,
        ngram_max: config.training.ngram_max,
    };
    let transform = vectorizer.fit(&corpus.texts)?;
    let matrix: Vec<SparseVec> = transform.apply_all(&corpus.texts);
    debug_assert_eq!(matrix.len(), corpus.filenames.len());

    let vectorizer_id = registry.store_vectorizer(&transform.to_blob()?).await?;
    tracing::info!(
        vectorizer_id,
        documents = matrix.len(),
        features = transform.dims(),
        "stored vectoriser"
    );

    let trainer = LogisticRegressionTrainer {
        c: config.classifier.c,
        max_iter: config.classifier.max_iter,
        tolerance: config.classifier.tolerance,
    };
    let minimum = config.training.min_examples;

    let labels = corpus_store.distinct_labels().await?;
    let total_labels = labels.len() as u64;
    let mut results = Vec::with_capacity(labels.len());

    for (n, label) in labels.into_iter().enumerate() {
        let mut targets = Vec::with_capacity(corpus.filenames.len());
        for filename in &corpus.filenames {
            targets.push(corpus_store.has_label(filename, &label).await?);
        }
        let positives = targets.iter().filter(|&&t| t).count();
        let negatives = targets.len() - positives;

        reporter.report(TrainProgressEvent::Fitting {
            label: label.clone(),
            n: n as u64 + 1,
            total: total_labels,
            positives: positives as u64,
            negatives: negatives as u64,
        });

        let insufficient = positives < minimum || negatives < minimum;
        if insufficient {
            let warning = LabelError::InsufficientExamples {
                label: label.clone(),
                positives,
                negatives,
                minimum,
            };
            tracing::warn!("{}", warning);
            if config.training.insufficient_policy == InsufficientPolicy::Skip {
                results.push(LabelTraining {
                    label,
                    positives,
                    negatives,
                    insufficient,
                    model_id: None,
                });
                continue;
            }
        }

        let model = trainer.fit(&matrix, &targets, transform.dims())?;
        let model_id = registry
            .store_model(vectorizer_id, &label, &model.to_blob()?)
            .await?;
        tracing::info!(
            label = %label,
            model_id,
            iterations = model.iterations(),
            converged = model.converged(),
            "stored model"
        );

        results.push(LabelTraining {
            label,
            positives,
            negatives,
            insufficient,
            model_id: Some(model_id),
        });
    }

    Ok(TrainSummary {
        vectorizer_id,
        documents: corpus.filenames,
        skipped: corpus.skipped,
        features: transform.dims(),
        labels: results,
    })
}

/// CLI entry point for `doclabel train`.
pub async fn run_train(config: &Config, progress: ProgressMode) -> Result<()> {
    let session = Session::open(config).await?;
    let reporter = progress.reporter();
    let summary = train(&session, config, reporter.as_ref()).await?;
    session.close().await;

    for skipped in &summary.skipped {
        println!("Skipped {} (no extractable text)", skipped);
    }
    println!("Stored the vectoriser as id = {}", summary.vectorizer_id);
    for label in &summary.labels {
        if label.insufficient {
            println!("Too few labels");
        }
        match label.model_id {
            Some(id) => println!(
                "{}: {} positive / {} negative -> model {}",
                label.label, label.positives, label.negatives, id
            ),
            None => println!(
                "{}: {} positive / {} negative -> skipped",
                label.label, label.positives, label.negatives
            ),
        }
    }
    println!(
        "Trained {} model(s) over {} document(s).",
        summary.models_trained(),
        summary.documents.len()
    );

    Ok(())
}
