//! Wiring of configuration, token storage, client and router for one CLI run.

use anyhow::{Context, Result};
use propfinder_client::{
    AuthenticatedClient, AuthenticatedClientBuilder, ClientConfig, Router, default_routes,
    redirect_to,
};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs.
pub struct Session {
    pub config: ClientConfig,
    pub client: AuthenticatedClient,
    pub router: Arc<Router>,
}

impl Session {
    /// Load configuration (explicit path or platform default) and build the session.
    pub fn open(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => ClientConfig::load_from_path(path)
                .with_context(|| format!("Failed to load config from {:?}", path))?,
            None => ClientConfig::load().context("Failed to load configuration")?,
        };
        Self::from_config(config)
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        debug!(
            "base url {}, {} token storage",
            config.base_url, config.storage
        );

        let router = Arc::new(Router::new(default_routes()));
        let client = AuthenticatedClientBuilder::from_config(&config)
            .context("Failed to open token storage")?
            .on_unauthorized(redirect_to(router.clone(), config.login_path.clone()))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            client,
            router,
        })
    }

    /// Whether the last request sent the router to the login route.
    pub fn redirected_to_login(&self) -> bool {
        self.router.current().as_deref() == Some(self.config.login_path.as_str())
    }
}
