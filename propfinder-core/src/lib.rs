//! # Propfinder Core
//!
//! Core library for the Propfinder session client.
//!
//! This crate provides:
//! - The [`Token`] bearer credential type
//! - The [`SecretStore`] trait with memory, file and (optionally) keyring backends
//! - [`TokenStore`], the persisted zero-or-one token slot
//!
//! ## Quick Start
//!
//! ```rust
//! use propfinder_core::{Token, TokenStore};
//!
//! let store = TokenStore::in_memory();
//! store.set(&Token::new("abc")).unwrap();
//! assert_eq!(store.get().unwrap(), Some(Token::new("abc")));
//! ```

pub mod store;
pub mod token;

pub use store::{
    FileStore,
    MemoryStore,
    Secret,
    SecretStore,
    StorageBackend,
    StoreError,
    create_store,
};

#[cfg(feature = "keyring-store")]
pub use store::KeyringStore;

pub use token::{DEFAULT_TOKEN_KEY, Token, TokenStore};
