//! Bearer token and its persisted slot.
//!
//! This module provides:
//! - [`Token`] - An opaque bearer credential
//! - [`TokenStore`] - Zero-or-one token persisted under a fixed key

use std::sync::Arc;

use crate::store::{MemoryStore, Secret, SecretStore, StoreError};

/// Storage key the token is persisted under unless configured otherwise.
pub const DEFAULT_TOKEN_KEY: &str = "token";

/// An opaque bearer credential.
///
/// Debug and Display output are redacted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token(Secret);

impl Token {
    /// Create a token from a raw string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Secret::new(value))
    }

    /// Interpret an optional raw value, treating an empty string as no token.
    pub fn parse(value: Option<&str>) -> Option<Self> {
        value.filter(|v| !v.is_empty()).map(Self::new)
    }

    /// Expose the raw token value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        self.0.expose()
    }

    /// The `Authorization` header value for this token.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.0.expose())
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The persisted bearer token slot.
///
/// Binds a [`SecretStore`] backend to one key. Cloning shares the backend.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn SecretStore>,
    key: String,
}

impl TokenStore {
    /// Create a token store over `backend` using [`DEFAULT_TOKEN_KEY`].
    pub fn new(backend: Arc<dyn SecretStore>) -> Self {
        Self::with_key(backend, DEFAULT_TOKEN_KEY)
    }

    /// Create a token store over `backend` using a custom key.
    pub fn with_key(backend: Arc<dyn SecretStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Create a token store over a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// The key the token is persisted under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the persisted token.
    ///
    /// Returns `Ok(None)` when nothing (or an empty string) is stored.
    pub fn get(&self) -> Result<Option<Token>, StoreError> {
        Ok(self
            .backend
            .get(&self.key)?
            .filter(|secret| !secret.is_empty())
            .map(Token))
    }

    /// Persist `token`, overwriting any prior value.
    pub fn set(&self, token: &Token) -> Result<(), StoreError> {
        self.backend.set(&self.key, &token.0)
    }

    /// Remove the persisted token. A no-op if none is stored.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.delete(&self.key)
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").field("key", &self.key).finish()
    }
}
