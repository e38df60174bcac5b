//! Directory-backed script storage
//!
//! Scripts are plain text files directly under one directory. Filenames are
//! a single path component; anything that could escape the directory is
//! rejected before touching the filesystem.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ScriptStoreError {
    #[error("invalid script filename '{0}'")]
    InvalidFilename(String),

    #[error("script '{0}' not found")]
    NotFound(String),

    #[error("script store I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScriptStoreError {
    pub fn code(&self) -> &'static str {
        match self {
            ScriptStoreError::InvalidFilename(_) => "INVALID_FILENAME",
            ScriptStoreError::NotFound(_) => "SCRIPT_NOT_FOUND",
            ScriptStoreError::Io { .. } => "SCRIPT_IO_ERROR",
        }
    }
}

type Result<T> = std::result::Result<T, ScriptStoreError>;

/// Acknowledgement of a save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedScript {
    pub filename: String,
    pub path: String,
    pub size: u64,
    pub sha256: String,
}

/// A script read back from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedScript {
    pub filename: String,
    pub code: String,
    pub size: u64,
    pub path: String,
    pub sha256: String,
}

/// One row of `list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEntry {
    pub filename: String,
    pub size: u64,
    /// RFC 3339, UTC
    pub modified: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedScript {
    pub filename: String,
    pub deleted: bool,
}

#[derive(Debug, Clone)]
pub struct ScriptStore {
    root: PathBuf,
}

impl ScriptStore {
    /// Store rooted at `root`; the directory is created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn save(&self, filename: &str, code: &str) -> Result<SavedScript> {
        let path = self.resolve(filename)?;
        std::fs::create_dir_all(&self.root).map_err(|source| ScriptStoreError::Io {
            path: self.root.clone(),
            source,
        })?;
        std::fs::write(&path, code).map_err(|source| ScriptStoreError::Io {
            path: path.clone(),
            source,
        })?;

        info!(filename, bytes = code.len(), "Saved script");
        Ok(SavedScript {
            filename: filename.to_string(),
            path: path.display().to_string(),
            size: code.len() as u64,
            sha256: digest(code),
        })
    }

    pub fn load(&self, filename: &str) -> Result<LoadedScript> {
        let path = self.resolve(filename)?;
        let code = std::fs::read_to_string(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ScriptStoreError::NotFound(filename.to_string()),
            _ => ScriptStoreError::Io {
                path: path.clone(),
                source,
            },
        })?;

        debug!(filename, bytes = code.len(), "Loaded script");
        Ok(LoadedScript {
            filename: filename.to_string(),
            size: code.len() as u64,
            sha256: digest(&code),
            path: path.display().to_string(),
            code,
        })
    }

    /// Every regular file in the store, sorted by filename.
    ///
    /// A store whose directory does not exist yet is empty, not an error.
    pub fn list(&self) -> Result<Vec<ScriptEntry>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ScriptStoreError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut scripts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ScriptStoreError::Io {
                path: self.root.clone(),
                source,
            })?;
            let metadata = entry.metadata().map_err(|source| ScriptStoreError::Io {
                path: entry.path(),
                source,
            })?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            scripts.push(ScriptEntry {
                filename: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
                modified: modified.to_rfc3339_opts(SecondsFormat::Secs, true),
            });
        }
        scripts.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(scripts)
    }

    pub fn delete(&self, filename: &str) -> Result<DeletedScript> {
        let path = self.resolve(filename)?;
        std::fs::remove_file(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ScriptStoreError::NotFound(filename.to_string()),
            _ => ScriptStoreError::Io {
                path: path.clone(),
                source,
            },
        })?;

        info!(filename, "Deleted script");
        Ok(DeletedScript {
            filename: filename.to_string(),
            deleted: true,
        })
    }

    /// Map a filename to a path inside the store root
    fn resolve(&self, filename: &str) -> Result<PathBuf> {
        let invalid = || ScriptStoreError::InvalidFilename(filename.to_string());
        if filename.is_empty() || filename.contains(['/', '\\']) {
            return Err(invalid());
        }
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(filename)),
            _ => Err(invalid()),
        }
    }
}

fn digest(code: &str) -> String {
    let hash = Sha256::digest(code.as_bytes());
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}
