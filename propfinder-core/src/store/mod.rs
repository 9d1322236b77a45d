//! Key-value secret storage.
//!
//! This module provides:
//! - [`Secret`] - A wrapper for sensitive values that prevents accidental logging
//! - [`SecretStore`] - Trait for key-value storage backends
//! - [`MemoryStore`] - In-memory implementation for testing
//! - [`FileStore`] - JSON file implementation that survives restarts
//! - [`KeyringStore`] - OS keyring implementation (with `keyring-store` feature)
//! - [`create_store`] - Helper to select a backend from configuration
//!
//! # Example
//!
//! ```rust
//! use propfinder_core::store::{MemoryStore, Secret, SecretStore};
//!
//! let store = MemoryStore::new();
//! store.set("token", &Secret::new("abc")).unwrap();
//!
//! let retrieved = store.get("token").unwrap();
//! assert_eq!(retrieved.unwrap().expose(), "abc");
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

mod file;
mod memory;
#[cfg(feature = "keyring-store")]
mod keyring;

pub use file::FileStore;
pub use memory::MemoryStore;
#[cfg(feature = "keyring-store")]
pub use keyring::KeyringStore;

/// A secret value that prevents accidental exposure in logs.
///
/// The inner value is only accessible via [`expose()`](Secret::expose).
/// Debug and Display implementations show `[REDACTED]` instead of the value,
/// and the backing memory is zeroed on drop.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the secret holds an empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

/// Error type for secret store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Access to the storage area was denied.
    #[error("access denied to secret: {key}")]
    AccessDenied { key: String },

    /// The storage backend encountered an error.
    #[error("backend error: {message}")]
    BackendError { message: String },

    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The keyring backend is not available.
    #[error("keyring not available: {message}")]
    KeyringUnavailable { message: String },

    /// No platform data directory could be determined.
    #[error("data directory not available")]
    DirectoryUnavailable,
}

/// Abstraction over key-value storage backends.
///
/// Operations are synchronous; a missing key is `Ok(None)`, never an error.
pub trait SecretStore: Send + Sync {
    /// Retrieve a secret by key.
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    fn get(&self, key: &str) -> Result<Option<Secret>, StoreError>;

    /// Store a secret at the given key.
    ///
    /// Overwrites any existing value.
    fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError>;

    /// Delete a secret by key.
    ///
    /// Returns `Ok(())` even if the key didn't exist.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Which backend [`create_store`] should build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local storage, lost on exit.
    Memory,
    /// JSON file in the platform data directory.
    #[default]
    File,
    /// OS keyring.
    Keyring,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::File => write!(f, "file"),
            Self::Keyring => write!(f, "keyring"),
        }
    }
}

/// Create a secret store for the requested backend.
///
/// # Backend Selection Logic
///
/// - `File`: opens `path`, or [`FileStore::default_path`] when `path` is `None`.
///   I/O and parse failures are returned to the caller.
/// - `Keyring`: attempts a [`KeyringStore`]; falls back to [`MemoryStore`]
///   with a warning if the keyring is unavailable or the `keyring-store`
///   feature is disabled.
/// - `Memory`: returns a [`MemoryStore`].
pub fn create_store(
    backend: StorageBackend,
    path: Option<&Path>,
) -> Result<Arc<dyn SecretStore>, StoreError> {
    match backend {
        StorageBackend::File => {
            let store = match path {
                Some(path) => FileStore::open(path)?,
                None => FileStore::open(FileStore::default_path()?)?,
            };
            tracing::debug!("Using file storage at {:?}", store.path());
            Ok(Arc::new(store))
        }
        StorageBackend::Keyring => Ok(keyring_or_memory()),
        StorageBackend::Memory => {
            tracing::debug!("Using in-memory token storage");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(feature = "keyring-store")]
fn keyring_or_memory() -> Arc<dyn SecretStore> {
    match KeyringStore::try_new("propfinder") {
        Ok(store) => {
            tracing::info!("Using OS keyring for token storage");
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(
                "Keyring unavailable ({}), falling back to memory store. \
                 The token will not persist across restarts.",
                e
            );
            Arc::new(MemoryStore::new())
        }
    }
}

#[cfg(not(feature = "keyring-store"))]
fn keyring_or_memory() -> Arc<dyn SecretStore> {
    tracing::warn!(
        "Keyring storage requested but keyring-store feature not enabled. \
         Using memory store. The token will not persist across restarts."
    );
    Arc::new(MemoryStore::new())
}
