//! Corpus and registry overview.
//!
//! A quick summary of what is tracked and what has been trained, used by
//! `doclabel stats` to check that adds and trains landed as expected.

use anyhow::Result;

use crate::config::Config;
use crate::db::Session;
use crate::error::LabelError;
use crate::models::format_ts_iso;

/// Per-label corpus size and latest model.
#[derive(Debug, Clone)]
pub struct LabelStats {
    pub label: String,
    pub files: i64,
    /// `(model id, created_at)` of the latest model, if any.
    pub latest_model: Option<(i64, i64)>,
}

#[derive(Debug, Clone)]
pub struct Stats {
    pub entries: i64,
    pub files: usize,
    pub vectorizers: i64,
    pub models: i64,
    pub labels: Vec<LabelStats>,
}

pub async fn collect_stats(session: &Session) -> Result<Stats> {
    let corpus = session.corpus();
    let registry = session.registry();

    let mut labels = Vec::new();
    for count in corpus.label_counts().await? {
        let latest_model = match registry.get_latest_model(&count.label).await {
            Ok(m) => Some((m.id, m.created_at)),
            Err(e) if matches!(e.downcast_ref::<LabelError>(), Some(LabelError::LabelNotFound(_))) => {
                None
            }
            Err(e) => return Err(e),
        };
        labels.push(LabelStats {
            label: count.label,
            files: count.files,
            latest_model,
        });
    }

    Ok(Stats {
        entries: corpus.count().await?,
        files: corpus.distinct_filenames().await?.len(),
        vectorizers: registry.vectorizer_count().await?,
        models: registry.model_count().await?,
        labels,
    })
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let session = Session::open(config).await?;
    let stats = collect_stats(&session).await?;
    session.close().await;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("doclabel — Database Stats");
    println!("=========================");
    println!();
    println!("  Database:     {}", config.db.path.display());
    println!("  Size:         {}", format_bytes(db_size));
    println!();
    println!("  Entries:      {}", stats.entries);
    println!("  Files:        {}", stats.files);
    println!("  Labels:       {}", stats.labels.len());
    println!("  Vectorisers:  {}", stats.vectorizers);
    println!("  Models:       {}", stats.models);

    if !stats.labels.is_empty() {
        println!();
        println!("  {:<24} {:>6}   {}", "LABEL", "FILES", "LATEST MODEL");
        println!("  {}", "-".repeat(60));
        for l in &stats.labels {
            let model = match l.latest_model {
                Some((id, created)) => format!("#{} ({})", id, format_ts_iso(created)),
                None => "untrained".to_string(),
            };
            println!("  {:<24} {:>6}   {}", l.label, l.files, model);
        }
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
