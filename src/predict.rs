//! Label prediction for a single file.
//!
//! Scores the file against the latest model of every trained label. Labels
//! trained in the same run share a vectoriser, so the decoded transform is
//! kept across labels and only reloaded when a label's model points at a
//! different one.

use std::path::Path;

use anyhow::Result;

use crate::config::Config;
use crate::db::Session;
use crate::extract;
use crate::registry::{decode_model, decode_transform, ensure_aligned};
use crate::tfidf::TfidfTransform;
use crate::traits::{Classifier, Transform};

/// A label whose probability cleared the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    /// Positive-class probability in `[0, 1]`.
    pub probability: f64,
    pub model_id: i64,
}

/// Score `text` against every trained label, returning those whose
/// probability × 100 strictly exceeds `threshold_percent`, in label order.
pub async fn predict_text(
    session: &Session,
    text: &str,
    threshold_percent: f64,
) -> Result<Vec<Prediction>> {
    let registry = session.registry();
    let mut cached: Option<(i64, TfidfTransform)> = None;
    let mut predictions = Vec::new();

    for label in registry.list_labels_with_models().await? {
        let model_artifact = registry.get_latest_model(&label).await?;

        let transform = match cached.take() {
            Some((id, transform)) if id == model_artifact.vectorizer_id => transform,
            _ => {
                let artifact = registry.vectorizer_for_model(&model_artifact).await?;
                tracing::debug!(vectorizer_id = artifact.id, "loading vectoriser");
                decode_transform(&artifact)?
            }
        };

        let model = decode_model(&model_artifact)?;
        ensure_aligned(&model_artifact, &model, &transform)?;
        let probability = model.predict_probability(&transform.apply(text));
        tracing::debug!(label = %label, probability, "scored");

        if probability * 100.0 > threshold_percent {
            predictions.push(Prediction {
                label,
                probability,
                model_id: model_artifact.id,
            });
        }
        cached = Some((model_artifact.vectorizer_id, transform));
    }

    Ok(predictions)
}

/// Extract `path` and predict its labels. Extraction failures are fatal.
pub async fn predict_file(
    session: &Session,
    config: &Config,
    path: &Path,
    threshold_percent: f64,
) -> Result<Vec<Prediction>> {
    let text = extract::extract_file(path, config.extract.max_file_bytes)?;
    predict_text(session, &text, threshold_percent).await
}

/// CLI entry point for `doclabel predict`.
pub async fn run_predict(config: &Config, path: &Path, threshold: Option<f64>) -> Result<()> {
    let threshold = threshold.unwrap_or(config.predict.threshold);
    if !(0.0..=100.0).contains(&threshold) {
        anyhow::bail!("--threshold must be in [0, 100], got {}", threshold);
    }

    let session = Session::open(config).await?;
    let predictions = predict_file(&session, config, path, threshold).await?;
    session.close().await;

    if predictions.is_empty() {
        println!("No labels above {:.0}% threshold", threshold);
    }
    for p in &predictions {
        println!("{:.0}% {}", p.probability * 100.0, p.label);
    }

    Ok(())
}
