//! Versioned storage of fitted vectorisers and per-label models.
//!
//! Artifacts are immutable and accumulate across retrains. "Latest" for a
//! label is the row with the greatest `created_at`, ties broken by the
//! greater id so two artifacts stored within one millisecond still resolve
//! to the later insert.
//!
//! Every `store_*` call is a single committed INSERT, so a run interrupted
//! mid-training leaves a consistent (if incomplete) set of models.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::classifier::LogisticRegression;
use crate::error::LabelError;
use crate::models::{normalize_label, now_millis, ModelArtifact, VectorizerArtifact};
use crate::tfidf::TfidfTransform;
use crate::traits::{Classifier, Transform};

pub struct Registry {
    pool: SqlitePool,
}

impl Registry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn store_vectorizer(&self, blob: &[u8]) -> Result<i64> {
        let id = sqlx::query("INSERT INTO vectorizers (transform_blob, created_at) VALUES (?, ?)")
            .bind(blob)
            .bind(now_millis())
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        Ok(id)
    }

    /// Fails with [`LabelError::ArtifactNotFound`] when no such vectoriser exists.
    pub async fn get_vectorizer(&self, id: i64) -> Result<VectorizerArtifact> {
        let row = sqlx::query("SELECT id, transform_blob, created_at FROM vectorizers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(LabelError::ArtifactNotFound(id))?;

        Ok(VectorizerArtifact {
            id: row.get("id"),
            transform_blob: row.get("transform_blob"),
            created_at: row.get("created_at"),
        })
    }

    pub async fn store_model(&self, vectorizer_id: i64, label: &str, blob: &[u8]) -> Result<i64> {
        let id = sqlx::query(
            "INSERT INTO models (vectorizer_id, label, model_blob, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(vectorizer_id)
        .bind(normalize_label(label))
        .bind(blob)
        .bind(now_millis())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(id)
    }

    /// The newest model for `label`; fails with [`LabelError::LabelNotFound`]
    /// when the label has never been trained.
    pub async fn get_latest_model(&self, label: &str) -> Result<ModelArtifact> {
        let label = normalize_label(label);
        let row = sqlx::query(
            r#"
            SELECT id, vectorizer_id, label, model_blob, created_at
            FROM models
            WHERE label = ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(&label)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(LabelError::LabelNotFound(label))?;

        Ok(ModelArtifact {
            id: row.get("id"),
            vectorizer_id: row.get("vectorizer_id"),
            label: row.get("label"),
            model_blob: row.get("model_blob"),
            created_at: row.get("created_at"),
        })
    }

    /// The vectoriser a model was trained against. A model whose vectoriser
    /// does not resolve is reported as [`LabelError::Corrupt`], not as an
    /// ordinary not-found.
    pub async fn vectorizer_for_model(&self, model: &ModelArtifact) -> Result<VectorizerArtifact> {
        match self.get_vectorizer(model.vectorizer_id).await {
            Err(e) if matches!(e.downcast_ref::<LabelError>(), Some(LabelError::ArtifactNotFound(_))) => {
                Err(LabelError::Corrupt {
                    what: "model",
                    id: model.id,
                    reason: format!("vectoriser #{} does not exist", model.vectorizer_id),
                }
                .into())
            }
            other => other,
        }
    }

    /// Labels with at least one model of any vintage, sorted.
    pub async fn list_labels_with_models(&self) -> Result<Vec<String>> {
        let labels = sqlx::query_scalar("SELECT DISTINCT label FROM models ORDER BY label")
            .fetch_all(&self.pool)
            .await?;
        Ok(labels)
    }

    pub async fn vectorizer_count(&self) -> Result<i64> {
        let n = sqlx::query_scalar("SELECT COUNT(*) FROM vectorizers")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    pub async fn model_count(&self) -> Result<i64> {
        let n = sqlx::query_scalar("SELECT COUNT(*) FROM models")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

/// Decode a stored vectoriser blob.
pub fn decode_transform(artifact: &VectorizerArtifact) -> Result<TfidfTransform> {
    TfidfTransform::from_blob(&artifact.transform_blob).map_err(|e| {
        LabelError::Corrupt {
            what: "vectoriser",
            id: artifact.id,
            reason: format!("{:#}", e),
        }
        .into()
    })
}

/// Decode a stored model blob.
pub fn decode_model(artifact: &ModelArtifact) -> Result<LogisticRegression> {
    LogisticRegression::from_blob(&artifact.model_blob).map_err(|e| {
        LabelError::Corrupt {
            what: "model",
            id: artifact.id,
            reason: format!("{:#}", e),
        }
        .into()
    })
}

/// Fail with [`LabelError::Corrupt`] unless the model has exactly one weight
/// per feature of the transform it is paired with.
pub fn ensure_aligned(
    artifact: &ModelArtifact,
    model: &LogisticRegression,
    transform: &TfidfTransform,
) -> Result<()> {
    let weights = model.feature_weights().len();
    if weights != transform.dims() {
        return Err(LabelError::Corrupt {
            what: "model",
            id: artifact.id,
            reason: format!(
                "{} weights for vectoriser #{} with {} features",
                weights,
                artifact.vectorizer_id,
                transform.dims()
            ),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::Session;
    use tempfile::TempDir;

    async fn open() -> (TempDir, Session) {
        let tmp = TempDir::new().unwrap();
        let config = Config::with_db_path(tmp.path().join("registry.sqlite"));
        let session = Session::open(&config).await.unwrap();
        (tmp, session)
    }

    #[tokio::test]
    async fn vectorizer_round_trip() {
        let (_tmp, session) = open().await;
        let registry = session.registry();

        let id = registry.store_vectorizer(b"transform").await.unwrap();
        let artifact = registry.get_vectorizer(id).await.unwrap();
        assert_eq!(artifact.id, id);
        assert_eq!(artifact.transform_blob, b"transform");
    }

    #[tokio::test]
    async fn missing_vectorizer_is_artifact_not_found() {
        let (_tmp, session) = open().await;
        let err = session.registry().get_vectorizer(99).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LabelError>(),
            Some(LabelError::ArtifactNotFound(99))
        ));
    }

    #[tokio::test]
    async fn latest_model_is_from_second_training() {
        let (_tmp, session) = open().await;
        let registry = session.registry();

        let v1 = registry.store_vectorizer(b"v1").await.unwrap();
        let first = registry.store_model(v1, "work", b"m1").await.unwrap();
        let v2 = registry.store_vectorizer(b"v2").await.unwrap();
        let second = registry.store_model(v2, "WORK", b"m2").await.unwrap();
        assert_ne!(first, second);

        let latest = registry.get_latest_model(" work").await.unwrap();
        assert_eq!(latest.id, second);
        assert_eq!(latest.vectorizer_id, v2);
        assert_eq!(latest.model_blob, b"m2");
        assert_eq!(latest.label, "WORK");
    }

    #[tokio::test]
    async fn unknown_label_is_label_not_found() {
        let (_tmp, session) = open().await;
        let err = session.registry().get_latest_model("nope").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LabelError>(),
            Some(LabelError::LabelNotFound(l)) if l == "NOPE"
        ));
    }

    #[tokio::test]
    async fn dangling_vectorizer_reference_is_corrupt() {
        let (_tmp, session) = open().await;
        let registry = session.registry();
        let model = ModelArtifact {
            id: 5,
            vectorizer_id: 404,
            label: "WORK".into(),
            model_blob: Vec::new(),
            created_at: 0,
        };
        let err = registry.vectorizer_for_model(&model).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LabelError>(),
            Some(LabelError::Corrupt { id: 5, .. })
        ));
    }

    #[test]
    fn undecodable_blob_is_corrupt() {
        let artifact = VectorizerArtifact {
            id: 3,
            transform_blob: b"not json".to_vec(),
            created_at: 0,
        };
        let err = decode_transform(&artifact).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LabelError>(),
            Some(LabelError::Corrupt { what: "vectoriser", id: 3, .. })
        ));
    }

    #[test]
    fn mismatched_weight_count_is_corrupt() {
        use crate::classifier::LogisticRegressionTrainer;
        use crate::tfidf::TfidfVectorizer;
        use crate::traits::{Trainer, Vectorizer};

        let small: Vec<String> = vec!["alpha beta".into(), "gamma".into()];
        let large: Vec<String> = vec!["alpha beta delta".into(), "gamma epsilon zeta".into()];
        let small_t = TfidfVectorizer::default().fit(&small).unwrap();
        let large_t = TfidfVectorizer::default().fit(&large).unwrap();
        let model = LogisticRegressionTrainer::default()
            .fit(&small_t.apply_all(&small), &[true, false], small_t.dims())
            .unwrap();
        let artifact = ModelArtifact {
            id: 8,
            vectorizer_id: 2,
            label: "WORK".into(),
            model_blob: model.to_blob().unwrap(),
            created_at: 0,
        };

        assert!(ensure_aligned(&artifact, &model, &small_t).is_ok());
        let err = ensure_aligned(&artifact, &model, &large_t).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LabelError>(),
            Some(LabelError::Corrupt { what: "model", id: 8, .. })
        ));
    }

    #[tokio::test]
    async fn labels_with_models_are_distinct() {
        let (_tmp, session) = open().await;
        let registry = session.registry();
        let v = registry.store_vectorizer(b"v").await.unwrap();
        registry.store_model(v, "personal", b"a").await.unwrap();
        registry.store_model(v, "work", b"b").await.unwrap();
        registry.store_model(v, "work", b"c").await.unwrap();

        assert_eq!(
            registry.list_labels_with_models().await.unwrap(),
            vec!["PERSONAL", "WORK"]
        );
        assert_eq!(registry.model_count().await.unwrap(), 3);
        assert_eq!(registry.vectorizer_count().await.unwrap(), 1);
    }
}
