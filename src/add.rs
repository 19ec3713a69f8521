//! `add` and `remove` commands.

use std::path::Path;

use anyhow::{bail, Result};

use crate::config::Config;
use crate::db::Session;
use crate::identity;
use crate::models::{normalize_label, AddOutcome};

/// Resolve `path`'s identity and record `label` for it.
pub async fn add_file(session: &Session, path: &Path, label: &str) -> Result<AddOutcome> {
    if normalize_label(label).is_empty() {
        bail!("label must not be empty");
    }
    let identity = identity::resolve(path)?;
    tracing::debug!(
        path = %identity.path.display(),
        hash = %identity.content_hash,
        "resolved file identity"
    );
    session.corpus().add_label(&identity, label).await
}

/// CLI entry point for `doclabel add`.
pub async fn run_add(config: &Config, path: &Path, label: &str) -> Result<()> {
    let session = Session::open(config).await?;
    let outcome = add_file(&session, path, label).await?;
    session.close().await;

    match outcome {
        AddOutcome::Duplicate => println!("Label already present."),
        AddOutcome::Inserted => println!(
            "Added {} as {}.",
            identity::normalize_lexically(&std::path::absolute(path)?).display(),
            normalize_label(label)
        ),
    }
    Ok(())
}

/// CLI entry point for `doclabel remove`.
///
/// Removal semantics (label only, whole file, cascading to trained models)
/// are undecided, so the command refuses rather than guessing.
pub fn run_remove(path: &Path, label: Option<&str>) -> Result<()> {
    let target = match label {
        Some(l) => format!("{} from {}", normalize_label(l), path.display()),
        None => path.display().to_string(),
    };
    bail!("remove is not implemented yet (nothing was removed: {})", target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn add_then_duplicate() {
        let tmp = TempDir::new().unwrap();
        let config = Config::with_db_path(tmp.path().join("add.sqlite"));
        let session = Session::open(&config).await.unwrap();
        let file = tmp.path().join("a.txt");
        std::fs::write(&file, "meeting notes").unwrap();

        assert_eq!(add_file(&session, &file, "work").await.unwrap(), AddOutcome::Inserted);
        assert_eq!(add_file(&session, &file, "work").await.unwrap(), AddOutcome::Duplicate);
        assert_eq!(session.corpus().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn edited_file_keeps_one_row() {
        let tmp = TempDir::new().unwrap();
        let config = Config::with_db_path(tmp.path().join("add.sqlite"));
        let session = Session::open(&config).await.unwrap();
        let file = tmp.path().join("a.txt");

        std::fs::write(&file, "first draft").unwrap();
        add_file(&session, &file, "work").await.unwrap();
        std::fs::write(&file, "second draft").unwrap();
        add_file(&session, &file, "work").await.unwrap();

        let name = std::path::absolute(&file).unwrap();
        let entries = session
            .corpus()
            .entries_for(&name.to_string_lossy())
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content_hash, identity::hash_file(&file).unwrap());
    }

    #[tokio::test]
    async fn dotdot_path_and_direct_path_are_one_file() {
        let tmp = TempDir::new().unwrap();
        let config = Config::with_db_path(tmp.path().join("add.sqlite"));
        let session = Session::open(&config).await.unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        let file = tmp.path().join("a.txt");

        std::fs::write(&file, "first draft").unwrap();
        let indirect = tmp.path().join("sub").join("..").join("a.txt");
        add_file(&session, &indirect, "work").await.unwrap();
        std::fs::write(&file, "second draft").unwrap();
        let outcome = add_file(&session, &file, "work").await.unwrap();

        assert_eq!(outcome, AddOutcome::Duplicate);
        let filenames = session.corpus().distinct_filenames().await.unwrap();
        assert_eq!(filenames.len(), 1);
        assert!(!filenames[0].contains(".."));
        assert_eq!(session.corpus().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_label_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let config = Config::with_db_path(tmp.path().join("add.sqlite"));
        let session = Session::open(&config).await.unwrap();
        let file = tmp.path().join("a.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(add_file(&session, &file, "   ").await.is_err());
    }

    #[tokio::test]
    async fn missing_file_cannot_be_added() {
        let tmp = TempDir::new().unwrap();
        let config = Config::with_db_path(tmp.path().join("add.sqlite"));
        let session = Session::open(&config).await.unwrap();
        assert!(add_file(&session, &tmp.path().join("absent.txt"), "work")
            .await
            .is_err());
    }

    #[test]
    fn remove_reports_not_implemented() {
        let err = run_remove(Path::new("/tmp/a.txt"), Some("work")).unwrap_err();
        assert!(err.to_string().contains("not implemented"));
    }
}
