//! Propfinder Client Library
//!
//! An HTTP client that keeps a bearer token attached to every request,
//! persists that token across restarts, and redirects to the login route
//! when the server reports an expired session.
//!
//! # Overview
//!
//! - [`AuthenticatedClient`] owns the transport and the default
//!   `Authorization` header. It reads the persisted token once at
//!   construction; afterwards [`AuthenticatedClient::set_auth_token`] is the
//!   only writer, updating the [`TokenStore`] and the header together.
//! - Every response passes through the registered [`ResponseInterceptor`]s.
//!   The built-in [`UnauthorizedInterceptor`] calls an injected handler once
//!   per 401 and the original error still reaches the caller.
//! - The [`property`] module adds typed calls for the listing search and the
//!   per-property endpoints on top of the same request path.
//! - [`Router`] holds the client-side route table and implements
//!   [`Navigator`], the only thing the HTTP layer needs from routing.
//!
//! # Quick Start
//!
//! ```no_run
//! use propfinder_client::{
//!     AuthenticatedClientBuilder, ClientConfig, LOGIN_PATH, Router, default_routes, redirect_to,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> propfinder_client::Result<()> {
//!     let config = ClientConfig::load()?;
//!     let router = Arc::new(Router::new(default_routes()));
//!
//!     let client = AuthenticatedClientBuilder::from_config(&config)?
//!         .on_unauthorized(redirect_to(router.clone(), LOGIN_PATH))
//!         .build()?;
//!
//!     client.set_auth_token(Some("abc"))?;
//!     let response = client.get("properties/").await?;
//!     println!("{}", response.text());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - `keyring-store` (default): enable the OS keyring token backend

mod client;
pub mod config;
pub mod interceptor;
pub mod property;
pub mod router;
pub mod transport;
pub mod types;

pub use client::{AuthenticatedClient, AuthenticatedClientBuilder};

pub use config::ClientConfig;
pub use interceptor::{ResponseInterceptor, UnauthorizedHandler, UnauthorizedInterceptor, redirect_to};
pub use property::{
    NewProperty, PropertyDetail, PropertyListing, PropertyPage, PropertyQuery, PropertyRecord,
    PropertyUpdate,
};
pub use router::{
    Component, LOGIN_PATH, LazyView, Navigator, Route, RouteError, RouteMatch, Router, View,
    default_routes,
};
pub use transport::{ReqwestTransport, Transport};
pub use types::{ClientError, HttpRequest, HttpResponse, Result, TokenResponse};

pub use propfinder_core::{Token, TokenStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        let _: Token = Token::new("test");
        let _: ClientConfig = ClientConfig::default();
        let _: Router = Router::new(default_routes());
        let _: TokenStore = TokenStore::in_memory();
    }
}
