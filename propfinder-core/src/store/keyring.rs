//! OS keyring-backed secret storage implementation.

use keyring::Entry;

use super::{Secret, SecretStore, StoreError};

/// OS keyring-backed secret store.
///
/// This store uses the platform's native keyring service:
/// - macOS: Keychain
/// - Linux: kernel keyutils (session keyring)
/// - Windows: Credential Manager
///
/// Entries are stored under the service name `{service_name}/{key}`.
pub struct KeyringStore {
    service_name: String,
}

impl KeyringStore {
    /// Try to create a new keyring store.
    ///
    /// Writes, reads back and deletes a throwaway entry first. Returns
    /// [`StoreError::KeyringUnavailable`] if the platform keyring cannot hold
    /// a value, including when only the crate's in-process mock is compiled in.
    pub fn try_new(service_name: &str) -> Result<Self, StoreError> {
        let store = Self {
            service_name: service_name.to_string(),
        };
        store.check_round_trip()?;
        Ok(store)
    }

    fn check_round_trip(&self) -> Result<(), StoreError> {
        let unavailable = |message: String| StoreError::KeyringUnavailable { message };
        let check_service = format!("{}/__availability__", self.service_name);
        let entry = Entry::new(&check_service, "availability_check")
            .map_err(|e| unavailable(format!("keyring backend not available: {}", e)))?;

        entry
            .set_password("ok")
            .map_err(|e| unavailable(format!("keyring rejected a write: {}", e)))?;
        let read_back = Entry::new(&check_service, "availability_check")
            .and_then(|entry| entry.get_password());
        let _ = entry.delete_credential();

        match read_back {
            Ok(value) if value == "ok" => Ok(()),
            Ok(_) => Err(unavailable("keyring returned a different value".to_string())),
            Err(e) => Err(unavailable(format!("keyring did not persist a write: {}", e))),
        }
    }

    fn create_entry(&self, key: &str) -> Result<Entry, StoreError> {
        let service = format!("{}/{}", self.service_name, key);
        Entry::new(&service, "propfinder").map_err(|e| StoreError::BackendError {
            message: format!("failed to create keyring entry: {}", e),
        })
    }
}

impl std::fmt::Debug for KeyringStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringStore")
            .field("service_name", &self.service_name)
            .finish()
    }
}

impl SecretStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<Secret>, StoreError> {
        let entry = self.create_entry(key)?;

        match entry.get_password() {
            Ok(password) => Ok(Some(Secret::new(password))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::NoStorageAccess(_)) => Err(StoreError::AccessDenied {
                key: key.to_string(),
            }),
            Err(keyring::Error::PlatformFailure(e)) => Err(StoreError::BackendError {
                message: format!("platform keyring failure: {}", e),
            }),
            Err(e) => Err(StoreError::BackendError {
                message: format!("keyring error: {}", e),
            }),
        }
    }

    fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError> {
        let entry = self.create_entry(key)?;

        entry
            .set_password(secret.expose())
            .map_err(|e| match e {
                keyring::Error::NoStorageAccess(_) => StoreError::AccessDenied {
                    key: key.to_string(),
                },
                e => StoreError::BackendError {
                    message: format!("failed to set keyring password: {}", e),
                },
            })
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let entry = self.create_entry(key)?;

        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::BackendError {
                message: format!("failed to delete keyring entry: {}", e),
            }),
        }
    }
}
