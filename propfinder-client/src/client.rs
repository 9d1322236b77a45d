use base64::Engine as _;
use parking_lot::RwLock;
use propfinder_core::{Token, TokenStore};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::config::ClientConfig;
use crate::interceptor::{ResponseInterceptor, UnauthorizedHandler, UnauthorizedInterceptor};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{ClientError, HttpRequest, HttpResponse, Result, TokenResponse};

/// HTTP client that carries the persisted bearer token on every request.
///
/// The default `Authorization` header is hydrated from the [`TokenStore`] at
/// construction and only changes through [`set_auth_token`]. Every outcome
/// runs through the registered interceptors before reaching the caller.
///
/// # Example
///
/// ```no_run
/// use propfinder_client::{AuthenticatedClient, Router, default_routes, redirect_to};
/// use std::sync::Arc;
///
/// # async fn run() -> propfinder_client::Result<()> {
/// let router = Arc::new(Router::new(default_routes()));
/// let client = AuthenticatedClient::builder()
///     .base_url("http://localhost:8000/")
///     .on_unauthorized(redirect_to(router.clone(), "/"))
///     .build()?;
///
/// client.login("admin", "password").await?;
/// let properties: serde_json::Value = client.get_json("properties/").await?;
/// # Ok(())
/// # }
/// ```
///
/// [`set_auth_token`]: AuthenticatedClient::set_auth_token
pub struct AuthenticatedClient {
    base_url: Url,
    transport: Arc<dyn Transport>,
    store: TokenStore,
    default_headers: RwLock<HeaderMap>,
    interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}

impl AuthenticatedClient {
    pub fn builder() -> AuthenticatedClientBuilder {
        AuthenticatedClientBuilder::new()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.store
    }

    /// The current default `Authorization` header value, if authenticated.
    pub fn authorization_header(&self) -> Option<String> {
        self.default_headers
            .read()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// Whether a bearer token is currently attached to requests.
    pub fn is_authenticated(&self) -> bool {
        self.default_headers.read().contains_key(AUTHORIZATION)
    }

    /// Replace or clear the session token.
    ///
    /// A non-empty token is persisted and then installed as the default
    /// header. `None` or an empty string clears the store and removes the
    /// header. Both steps happen under the header write lock, so no request
    /// built concurrently sees one without the other. If the store write
    /// fails the header is left as it was.
    pub fn set_auth_token(&self, token: Option<&str>) -> Result<()> {
        let mut headers = self.default_headers.write();

        match Token::parse(token) {
            Some(token) => {
                let value = bearer_header(&token)?;
                self.store.set(&token)?;
                headers.insert(AUTHORIZATION, value);
                info!("auth token set");
            }
            None => {
                self.store.clear()?;
                headers.remove(AUTHORIZATION);
                info!("auth token cleared");
            }
        }

        Ok(())
    }

    /// Exchange credentials for a token via `POST /token` and install it.
    pub async fn login(&self, username: &str, password: &str) -> Result<Token> {
        let mut request = self.request(Method::POST, "token")?;
        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", username, password));
        let mut value = HeaderValue::from_str(&format!("Basic {}", credentials))
            .map_err(|e| ClientError::InvalidHeader(e.to_string()))?;
        value.set_sensitive(true);
        request.headers.insert(AUTHORIZATION, value);

        let response: TokenResponse = self.execute(request).await?.json()?;
        if !response.token_type.eq_ignore_ascii_case("bearer") {
            return Err(ClientError::Decode(format!(
                "unsupported token type: {}",
                response.token_type
            )));
        }

        let token = Token::parse(Some(response.access_token.as_str()))
            .ok_or_else(|| ClientError::Decode("empty access token".to_string()))?;
        self.set_auth_token(Some(token.expose()))?;
        Ok(token)
    }

    /// Forget the session token.
    pub fn logout(&self) -> Result<()> {
        self.set_auth_token(None)
    }

    /// Build a request for `path` carrying a snapshot of the default headers.
    pub fn request(&self, method: Method, path: &str) -> Result<HttpRequest> {
        let url = self.resolve_url(path)?;
        let mut request = HttpRequest::new(method, url);
        request.headers = self.default_headers.read().clone();
        Ok(request)
    }

    /// Send a prepared request.
    ///
    /// Non-success statuses become errors: 401 is
    /// [`ClientError::SessionExpired`], anything else
    /// [`ClientError::Status`]. Interceptors observe the outcome, which is
    /// then returned unchanged.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!("{} {}", request.method, request.url);

        let outcome = match self.transport.send(request.clone()).await {
            Ok(response) => check_status(response),
            Err(e) => Err(e),
        };

        for interceptor in &self.interceptors {
            interceptor.intercept(&request, &outcome);
        }

        outcome
    }

    pub async fn send(&self, method: Method, path: &str) -> Result<HttpResponse> {
        let request = self.request(method, path)?;
        self.execute(request).await
    }

    pub async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<HttpResponse> {
        let mut request = self.request(method, path)?;
        let body = serde_json::to_vec(body)
            .map_err(|e| ClientError::Decode(format!("failed to encode body: {}", e)))?;
        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        request.body = Some(body);
        self.execute(request).await
    }

    pub async fn get(&self, path: &str) -> Result<HttpResponse> {
        self.send(Method::GET, path).await
    }

    pub async fn delete(&self, path: &str) -> Result<HttpResponse> {
        self.send(Method::DELETE, path).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<HttpResponse> {
        self.send_json(Method::POST, path, body).await
    }

    pub async fn put_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<HttpResponse> {
        self.send_json(Method::PUT, path, body).await
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get(path).await?.json()
    }

    /// Resolve `path` relative to the base URL.
    ///
    /// Absolute URLs are accepted only on the base URL's origin, since every
    /// request carries the session token.
    fn resolve_url(&self, path: &str) -> Result<Url> {
        if let Ok(url) = Url::parse(path) {
            if url.origin() != self.base_url.origin() {
                return Err(ClientError::InvalidUrl(format!(
                    "{} is outside {}",
                    url, self.base_url
                )));
            }
            return Ok(url);
        }
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", path, e)))
    }
}

impl std::fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("base_url", &self.base_url.as_str())
            .field("store", &self.store)
            .field("authenticated", &self.is_authenticated())
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

fn bearer_header(token: &Token) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&token.authorization_header())
        .map_err(|_| ClientError::InvalidHeader("token contains invalid characters".to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

fn check_status(response: HttpResponse) -> Result<HttpResponse> {
    if response.status.is_success() {
        return Ok(response);
    }

    let url = response.url.to_string();
    let body = response.text();
    if response.status == StatusCode::UNAUTHORIZED {
        Err(ClientError::SessionExpired { url, body })
    } else {
        Err(ClientError::Status {
            status: response.status.as_u16(),
            url,
            body,
        })
    }
}

/// Builder for [`AuthenticatedClient`].
pub struct AuthenticatedClientBuilder {
    base_url: String,
    timeout: Duration,
    store: Option<TokenStore>,
    transport: Option<Arc<dyn Transport>>,
    interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}

impl AuthenticatedClientBuilder {
    /// Create a builder with the default configuration and an in-memory store.
    pub fn new() -> Self {
        let defaults = ClientConfig::default();
        let timeout = defaults.timeout();
        Self {
            base_url: defaults.base_url,
            timeout,
            store: None,
            transport: None,
            interceptors: Vec::new(),
        }
    }

    /// Create a builder from configuration, opening the configured store.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new()
            .base_url(config.base_url.clone())
            .timeout(config.timeout())
            .token_store(config.token_store()?))
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Request timeout for the default `reqwest` transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn token_store(mut self, store: TokenStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a custom transport instead of `reqwest`.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn interceptor(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Invoke `handler` once for every response that signals an expired session.
    pub fn on_unauthorized(self, handler: UnauthorizedHandler) -> Self {
        self.interceptor(Arc::new(UnauthorizedInterceptor::new(handler)))
    }

    /// Build the client, hydrating the default header from the token store.
    pub fn build(self) -> Result<AuthenticatedClient> {
        let mut base_url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let store = self.store.unwrap_or_else(TokenStore::in_memory);
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.timeout)?),
        };

        let mut default_headers = HeaderMap::new();
        if let Some(token) = store.get()? {
            default_headers.insert(AUTHORIZATION, bearer_header(&token)?);
            debug!("restored auth token from {:?}", store);
        }

        Ok(AuthenticatedClient {
            base_url,
            transport,
            store,
            default_headers: RwLock::new(default_headers),
            interceptors: self.interceptors,
        })
    }
}

impl Default for AuthenticatedClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
