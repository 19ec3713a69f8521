use anyhow::Result;
use sqlx::SqlitePool;

/// Create tables and indexes if they do not exist yet. Safe to run on every
/// open.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;

    // (filename, content_hash, label) is kept unique by Add's reconciliation,
    // not by a constraint.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS corpus (
            id INTEGER PRIMARY KEY,
            filename TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            label TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vectorizers (
            id INTEGER PRIMARY KEY,
            transform_blob BLOB NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS models (
            id INTEGER PRIMARY KEY,
            vectorizer_id INTEGER NOT NULL REFERENCES vectorizers(id),
            label TEXT NOT NULL,
            model_blob BLOB NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_corpus_filename ON corpus(filename)")
        .execute(&mut *tx)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_corpus_content_hash ON corpus(content_hash)")
        .execute(&mut *tx)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_corpus_label ON corpus(label)")
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_models_label_created_at ON models(label, created_at)",
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
