//! JSON file-backed secret storage.
//!
//! Entries are kept in memory and written through to a single JSON file on
//! every mutation, so a value set by one process is visible to the next.
//!
//! # Storage Location
//!
//! By default the file lives at `~/.local/share/propfinder/storage.json` on
//! Linux, with the platform equivalents elsewhere.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{Secret, SecretStore, StoreError};

/// On-disk format of the storage file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StorageData {
    /// Version of the file format.
    version: u32,

    /// Stored key-value pairs.
    #[serde(default)]
    entries: BTreeMap<String, Secret>,
}

impl Default for StorageData {
    fn default() -> Self {
        Self {
            version: 1,
            entries: BTreeMap::new(),
        }
    }
}

/// Secret store persisted as a JSON file.
pub struct FileStore {
    path: PathBuf,
    data: RwLock<StorageData>,
}

impl FileStore {
    /// Default storage file path in the platform data directory.
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let dirs = directories::ProjectDirs::from("com", "propfinder", "propfinder")
            .ok_or(StoreError::DirectoryUnavailable)?;
        Ok(dirs.data_dir().join("storage.json"))
    }

    /// Open the store at `path`.
    ///
    /// Parent directories are created if needed. A missing file is an empty
    /// store; an unreadable or malformed one is an error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            StorageData::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, data: &StorageData) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, contents)?;
        restrict_permissions(&self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("keys_count", &self.data.read().entries.len())
            .finish()
    }
}

impl SecretStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Secret>, StoreError> {
        Ok(self.data.read().entries.get(key).cloned())
    }

    fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError> {
        let mut data = self.data.write();
        if data.entries.get(key) == Some(secret) {
            return Ok(());
        }
        data.entries.insert(key.to_string(), secret.clone());
        self.save(&data)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut data = self.data.write();
        if data.entries.remove(key).is_none() {
            return Ok(());
        }
        self.save(&data)
    }
}
