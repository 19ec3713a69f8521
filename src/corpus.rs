//! Corpus store: which files carry which labels.
//!
//! Rows are keyed logically by (filename, content_hash, label). Adding a file
//! first reconciles existing rows against its identity, so edits at a known
//! path and renames of known content update the stored rows instead of
//! growing the corpus.
//!
//! Reconciliation is not safe against concurrent writers: two `add` runs on
//! the same row can both miss the existing-row check and insert twice.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::identity::FileIdentity;
use crate::models::{normalize_label, now_millis, AddOutcome, CorpusEntry};

/// Per-label corpus size, as reported by `stats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCount {
    pub label: String,
    pub files: i64,
}

pub struct CorpusStore {
    pool: SqlitePool,
}

impl CorpusStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Associate `label` with the file described by `identity`.
    ///
    /// In order: rows at the same path pick up the new hash; rows with the
    /// same hash pick up the new path; if the exact triple now exists the
    /// call is a duplicate, otherwise a new row is inserted. Rows that the
    /// two updates collapse onto the same triple are merged into the oldest.
    pub async fn add_label(&self, identity: &FileIdentity, label: &str) -> Result<AddOutcome> {
        let filename = identity.path.to_string_lossy().into_owned();
        let hash = identity.content_hash.as_str();
        let label = normalize_label(label);
        let now = now_millis();

        let mut tx = self.pool.begin().await?;

        let content_changed = sqlx::query(
            "UPDATE corpus SET content_hash = ?, updated_at = ? WHERE filename = ? AND content_hash <> ?",
        )
        .bind(hash)
        .bind(now)
        .bind(&filename)
        .bind(hash)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let moved = sqlx::query(
            "UPDATE corpus SET filename = ?, updated_at = ? WHERE content_hash = ? AND filename <> ?",
        )
        .bind(&filename)
        .bind(now)
        .bind(hash)
        .bind(&filename)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if content_changed > 0 {
            tracing::info!(filename = %filename, rows = content_changed, "content changed at known path");
        }
        if moved > 0 {
            tracing::info!(filename = %filename, rows = moved, "known content moved to new path");
        }

        if content_changed > 0 || moved > 0 {
            let merged = sqlx::query(
                r#"
                DELETE FROM corpus
                WHERE filename = ? AND content_hash = ?
                  AND id NOT IN (
                      SELECT MIN(id) FROM corpus
                      WHERE filename = ? AND content_hash = ?
                      GROUP BY label
                  )
                "#,
            )
            .bind(&filename)
            .bind(hash)
            .bind(&filename)
            .bind(hash)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            if merged > 0 {
                tracing::info!(filename = %filename, rows = merged, "merged reconciled duplicates");
            }
        }

        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM corpus WHERE filename = ? AND content_hash = ? AND label = ?",
        )
        .bind(&filename)
        .bind(hash)
        .bind(&label)
        .fetch_one(&mut *tx)
        .await?;

        let outcome = if existing > 0 {
            AddOutcome::Duplicate
        } else {
            sqlx::query(
                "INSERT INTO corpus (filename, content_hash, label, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&filename)
            .bind(hash)
            .bind(&label)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            AddOutcome::Inserted
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Every tracked filename, sorted.
    pub async fn distinct_filenames(&self) -> Result<Vec<String>> {
        let names = sqlx::query_scalar("SELECT DISTINCT filename FROM corpus ORDER BY filename")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    /// Every label in use, sorted.
    pub async fn distinct_labels(&self) -> Result<Vec<String>> {
        let labels = sqlx::query_scalar("SELECT DISTINCT label FROM corpus ORDER BY label")
            .fetch_all(&self.pool)
            .await?;
        Ok(labels)
    }

    pub async fn has_label(&self, filename: &str, label: &str) -> Result<bool> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM corpus WHERE filename = ? AND label = ?)",
        )
        .bind(filename)
        .bind(normalize_label(label))
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    /// All rows for `filename`, oldest first.
    pub async fn entries_for(&self, filename: &str) -> Result<Vec<CorpusEntry>> {
        let rows = sqlx::query(
            "SELECT id, filename, content_hash, label, created_at, updated_at FROM corpus WHERE filename = ? ORDER BY id",
        )
        .bind(filename)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| CorpusEntry {
                id: row.get("id"),
                filename: row.get("filename"),
                content_hash: row.get("content_hash"),
                label: row.get("label"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            })
            .collect())
    }

    pub async fn count(&self) -> Result<i64> {
        let n = sqlx::query_scalar("SELECT COUNT(*) FROM corpus")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Number of distinct files per label, sorted by label.
    pub async fn label_counts(&self) -> Result<Vec<LabelCount>> {
        let rows = sqlx::query(
            "SELECT label, COUNT(DISTINCT filename) AS files FROM corpus GROUP BY label ORDER BY label",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| LabelCount {
                label: row.get("label"),
                files: row.get("files"),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::Session;
    use std::path::PathBuf;
    use tempfile::TempDir;

    async fn open() -> (TempDir, Session) {
        let tmp = TempDir::new().unwrap();
        let config = Config::with_db_path(tmp.path().join("corpus.sqlite"));
        let session = Session::open(&config).await.unwrap();
        (tmp, session)
    }

    fn ident(path: &str, hash: &str) -> FileIdentity {
        FileIdentity {
            path: PathBuf::from(path),
            content_hash: hash.to_string(),
        }
    }

    #[tokio::test]
    async fn re_adding_same_triple_is_idempotent() {
        let (_tmp, session) = open().await;
        let corpus = session.corpus();
        let a = ident("/docs/a.txt", "h1");

        assert_eq!(corpus.add_label(&a, "work").await.unwrap(), AddOutcome::Inserted);
        assert_eq!(corpus.add_label(&a, " WORK ").await.unwrap(), AddOutcome::Duplicate);
        assert_eq!(corpus.add_label(&a, "Work").await.unwrap(), AddOutcome::Duplicate);
        assert_eq!(corpus.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn second_label_on_same_file_is_inserted() {
        let (_tmp, session) = open().await;
        let corpus = session.corpus();
        let a = ident("/docs/a.txt", "h1");

        corpus.add_label(&a, "work").await.unwrap();
        assert_eq!(
            corpus.add_label(&a, "urgent").await.unwrap(),
            AddOutcome::Inserted
        );
        assert_eq!(corpus.distinct_labels().await.unwrap(), vec!["URGENT", "WORK"]);
        assert_eq!(corpus.distinct_filenames().await.unwrap(), vec!["/docs/a.txt"]);
    }

    #[tokio::test]
    async fn changed_content_at_known_path_updates_hash() {
        let (_tmp, session) = open().await;
        let corpus = session.corpus();

        corpus.add_label(&ident("/docs/a.txt", "old"), "work").await.unwrap();
        let outcome = corpus
            .add_label(&ident("/docs/a.txt", "new"), "work")
            .await
            .unwrap();
        assert_eq!(outcome, AddOutcome::Duplicate);

        let entries = corpus.entries_for("/docs/a.txt").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content_hash, "new");
        assert!(entries[0].updated_at >= entries[0].created_at);
    }

    #[tokio::test]
    async fn renamed_content_follows_hash() {
        let (_tmp, session) = open().await;
        let corpus = session.corpus();

        corpus.add_label(&ident("/docs/old.txt", "h1"), "work").await.unwrap();
        corpus.add_label(&ident("/docs/new.txt", "h1"), "work").await.unwrap();

        assert!(corpus.entries_for("/docs/old.txt").await.unwrap().is_empty());
        let moved = corpus.entries_for("/docs/new.txt").await.unwrap();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].label, "WORK");
        assert_eq!(corpus.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn both_rules_apply_and_collapse_duplicates() {
        let (_tmp, session) = open().await;
        let corpus = session.corpus();

        // Path P held old content; hash H lived at another path.
        corpus.add_label(&ident("/docs/p.txt", "old"), "work").await.unwrap();
        corpus.add_label(&ident("/docs/q.txt", "h"), "work").await.unwrap();

        let outcome = corpus.add_label(&ident("/docs/p.txt", "h"), "work").await.unwrap();
        assert_eq!(outcome, AddOutcome::Duplicate);

        let entries = corpus.entries_for("/docs/p.txt").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content_hash, "h");
        assert!(corpus.entries_for("/docs/q.txt").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn has_label_normalizes() {
        let (_tmp, session) = open().await;
        let corpus = session.corpus();
        corpus.add_label(&ident("/docs/a.txt", "h1"), "work").await.unwrap();

        assert!(corpus.has_label("/docs/a.txt", " work").await.unwrap());
        assert!(!corpus.has_label("/docs/a.txt", "personal").await.unwrap());
        assert!(!corpus.has_label("/docs/b.txt", "work").await.unwrap());
    }

    #[tokio::test]
    async fn label_counts_are_per_distinct_file() {
        let (_tmp, session) = open().await;
        let corpus = session.corpus();
        corpus.add_label(&ident("/a", "1"), "work").await.unwrap();
        corpus.add_label(&ident("/b", "2"), "work").await.unwrap();
        corpus.add_label(&ident("/c", "3"), "home").await.unwrap();

        let counts = corpus.label_counts().await.unwrap();
        assert_eq!(
            counts,
            vec![
                LabelCount { label: "HOME".into(), files: 1 },
                LabelCount { label: "WORK".into(), files: 2 },
            ]
        );
    }
}
