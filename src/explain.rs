//! Explain a label: the features that push hardest toward it.

use anyhow::Result;

use crate::config::Config;
use crate::db::Session;
use crate::models::{format_ts_iso, ModelArtifact};
use crate::registry::{decode_model, decode_transform, ensure_aligned};
use crate::traits::{Classifier, Transform};

/// One positively-weighted feature of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct Strength {
    pub coefficient: f64,
    pub feature: String,
}

/// The model an explanation was drawn from, plus its strongest features.
#[derive(Debug, Clone)]
pub struct Explanation {
    pub model: ModelArtifact,
    pub strengths: Vec<Strength>,
}

/// Pair feature names with weights, keep strictly positive weights, and
/// return the `count` largest in descending order.
pub fn top_positive_features(names: &[String], weights: &[f64], count: usize) -> Vec<Strength> {
    let mut strengths: Vec<Strength> = names
        .iter()
        .zip(weights)
        .filter(|(_, &w)| w > 0.0)
        .map(|(name, &w)| Strength {
            coefficient: w,
            feature: name.clone(),
        })
        .collect();
    strengths.sort_by(|a, b| {
        b.coefficient
            .total_cmp(&a.coefficient)
            .then_with(|| a.feature.cmp(&b.feature))
    });
    strengths.truncate(count);
    strengths
}

/// Load the latest model for `label` and its vectoriser, and rank features.
pub async fn explain_label(session: &Session, label: &str, count: usize) -> Result<Explanation> {
    let registry = session.registry();
    let model_artifact = registry.get_latest_model(label).await?;
    let vectorizer = registry.vectorizer_for_model(&model_artifact).await?;

    let transform = decode_transform(&vectorizer)?;
    let model = decode_model(&model_artifact)?;
    ensure_aligned(&model_artifact, &model, &transform)?;
    let strengths = top_positive_features(transform.feature_names(), model.feature_weights(), count);

    Ok(Explanation {
        model: model_artifact,
        strengths,
    })
}

/// CLI entry point for `doclabel explain`.
pub async fn run_explain(config: &Config, label: &str, display_count: Option<usize>) -> Result<()> {
    let count = display_count.unwrap_or(config.explain.display_count);
    let session = Session::open(config).await?;
    let explanation = explain_label(&session, label, count).await?;
    session.close().await;

    println!(
        "Model #{} (created {}) - predicts {}",
        explanation.model.id,
        format_ts_iso(explanation.model.created_at),
        explanation.model.label
    );
    for s in &explanation.strengths {
        println!(" - {:.2} {}", s.coefficient, s.feature);
    }

    Ok(())
}
