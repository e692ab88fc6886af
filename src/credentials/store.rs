//! Persisted candidate network list
//!
//! The list lives in one JSON document. Saves write a sibling `.tmp` file
//! and rename it over the target so readers only ever see a whole document.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use tracker_shared::codec::{self, CodecError};
use tracker_shared::{CredentialList, NetworkCredential};

/// Errors from credential storage
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Credential list file on durable storage
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the list, treating a missing or unreadable document as empty.
    pub async fn load(&self) -> CredentialList {
        match self.try_load().await {
            Ok(Some(list)) => {
                info!("[STORE] Loaded {} networks from {}", list.len(), self.path.display());
                list
            }
            Ok(None) => {
                info!("[STORE] No saved network list at {}", self.path.display());
                CredentialList::new()
            }
            Err(e) => {
                warn!("[STORE] Ignoring saved network list: {}", e);
                CredentialList::new()
            }
        }
    }

    /// Load the list. Returns `Ok(None)` if the document doesn't exist.
    pub async fn try_load(&self) -> Result<Option<CredentialList>, StorageError> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(codec::decode_credentials(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(&self.path, e)),
        }
    }

    /// Replace the persisted document with `list`
    pub async fn save(&self, list: &[NetworkCredential]) -> Result<(), StorageError> {
        let bytes = codec::encode_credentials(list)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(parent, e))?;
        }

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| self.io_error(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| self.io_error(&self.path, e))?;

        info!("[STORE] Saved {} networks to {}", list.len(), self.path.display());
        Ok(())
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
