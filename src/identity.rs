//! Content identity for corpus files.
//!
//! A file is identified by the SHA-256 digest of its bytes; its path is
//! mutable metadata that follows the digest across renames. Hashing streams
//! the file in fixed-size chunks so memory use does not grow with file size.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::LabelError;

const HASH_CHUNK_BYTES: usize = 64 * 1024;

/// A file's absolute path together with the hex SHA-256 of its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    pub path: PathBuf,
    pub content_hash: String,
}

/// Resolve `path` to a normalised absolute path and hash its full content.
pub fn resolve(path: &Path) -> anyhow::Result<FileIdentity> {
    let absolute = normalize_lexically(&std::path::absolute(path)?);
    let content_hash = hash_file(&absolute)?;
    Ok(FileIdentity {
        path: absolute,
        content_hash,
    })
}

/// Drop `.` components and fold `..` into its parent without touching the
/// filesystem, so one file always maps to one stored path. `..` at the root
/// stays at the root. Symlinks are not resolved.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Hex SHA-256 over every byte of the file, read in bounded chunks.
pub fn hash_file(path: &Path) -> anyhow::Result<String> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => anyhow::Error::new(LabelError::FileNotFound(path.to_path_buf())),
        _ => anyhow::Error::new(e).context(format!("Failed to open {}", path.display())),
    })?;

    hash_reader(&mut file)
}

/// Hex SHA-256 of everything readable from `reader`.
pub fn hash_reader<R: Read>(reader: &mut R) -> anyhow::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_BYTES];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
