//! Document collection persistence
//!
//! The whole collection lives under one logical key. Every mutation reads
//! the full collection, changes it, and writes the full collection back, so
//! two writers racing on the same key resolve as last-writer-wins.
//!
//! `DocumentBackend` is the narrow seam the store depends on. A backend with
//! compare-and-swap or per-record keys can be dropped in without touching
//! `DocumentStore`.
//!
//! Files (`JsonFileBackend`):
//! - `documents.json` - `{"version": 1, "documents": [...]}`

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::{StorageError, StorageResult};
use crate::config::Config;
use crate::models::Document;

/// Current on-disk schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Load/save access to the whole document collection
pub trait DocumentBackend {
    /// Read the full collection; an absent collection is empty
    fn load_all(&self) -> StorageResult<Vec<Document>>;

    /// Replace the full collection
    fn save_all(&mut self, documents: &[Document]) -> StorageResult<()>;
}

/// Versioned envelope written to disk
#[derive(Debug, Serialize, Deserialize)]
struct CollectionFile {
    version: u32,
    documents: Vec<Document>,
}

/// Accepted on-disk layouts
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCollection {
    Versioned(CollectionFile),
    /// Bare array written before the envelope existed
    Legacy(Vec<Document>),
}

/// Stores the collection as a JSON file, written atomically
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backend at the configured documents path
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.documents_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if a collection file exists on disk
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Size of the collection file in bytes (0 when absent)
    pub fn file_size(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    fn parse(&self, bytes: &[u8]) -> StorageResult<Vec<Document>> {
        match serde_json::from_slice::<StoredCollection>(bytes) {
            Ok(StoredCollection::Versioned(file)) => {
                if file.version > SCHEMA_VERSION {
                    return Err(StorageError::UnsupportedVersion {
                        path: self.path.clone(),
                        found: file.version,
                        supported: SCHEMA_VERSION,
                    });
                }
                Ok(file.documents)
            }
            Ok(StoredCollection::Legacy(documents)) => {
                debug!("Loaded legacy collection layout from {:?}", self.path);
                Ok(documents)
            }
            Err(e) => {
                let backup_path = self.backup_path();
                warn!(
                    "Collection at {:?} is unreadable, backing up to {:?}",
                    self.path, backup_path
                );
                fs::copy(&self.path, &backup_path)
                    .map_err(|io| StorageError::from_io(io, backup_path.clone()))?;
                Err(StorageError::CorruptCollection {
                    path: self.path.clone(),
                    backup_path,
                    details: e.to_string(),
                })
            }
        }
    }
}

impl DocumentBackend for JsonFileBackend {
    fn load_all(&self) -> StorageResult<Vec<Document>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let bytes = fs::read(&self.path).map_err(|e| StorageError::from_read(e, self.path.clone()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        self.parse(&bytes)
    }

    fn save_all(&mut self, documents: &[Document]) -> StorageResult<()> {
        let file = CollectionFile {
            version: SCHEMA_VERSION,
            documents: documents.to_vec(),
        };
        let bytes = serde_json::to_vec_pretty(&file)?;
        atomic_write(&self.path, &bytes)?;
        debug!("Saved {} document(s) to {:?}", documents.len(), self.path);
        Ok(())
    }
}

/// Keeps the collection in memory; used for tests and throwaway sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    documents: Vec<Document>,
    writes: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save_all` calls so far
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl DocumentBackend for MemoryBackend {
    fn load_all(&self) -> StorageResult<Vec<Document>> {
        Ok(self.documents.clone())
    }

    fn save_all(&mut self, documents: &[Document]) -> StorageResult<()> {
        self.documents = documents.to_vec();
        self.writes += 1;
        Ok(())
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// The target file is never left partially written.
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}
