//! Candidate network list management
//!
//! This module handles:
//! - Loading and saving the ordered network list on durable storage
//! - Refreshing the list from the remote directory service

mod store;
mod sync;

pub use store::{CredentialStore, StorageError};
pub use sync::{CredentialSync, DirectoryConfig, SyncError};
