//! Storage session.
//!
//! Every command opens one [`Session`]: a single SQLite connection with the
//! schema in place. Component operations receive the session (or a store
//! built from it) explicitly. Dropping the session releases the connection
//! on every exit path; [`Session::close`] does so gracefully.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::Config;
use crate::corpus::CorpusStore;
use crate::migrate;
use crate::registry::Registry;

pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// One storage connection for the lifetime of a command.
pub struct Session {
    pool: SqlitePool,
}

impl Session {
    /// Connect and make sure the schema exists.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = connect(config).await?;
        if let Err(e) = migrate::create_schema(&pool).await {
            pool.close().await;
            return Err(e);
        }
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn corpus(&self) -> CorpusStore {
        CorpusStore::new(self.pool.clone())
    }

    pub fn registry(&self) -> Registry {
        Registry::new(self.pool.clone())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
