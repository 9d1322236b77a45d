use propfinder_core::StoreError;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// A fully prepared request handed to a [`Transport`](crate::Transport).
///
/// Headers are a snapshot of the client's defaults taken when the request
/// was built, plus any per-request additions.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Create a request with no headers and no body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// A response as delivered by a [`Transport`](crate::Transport).
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a response with the given status and body.
    pub fn new(status: StatusCode, url: Url, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            url,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// The body decoded as (lossy) UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The body parsed as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Body of a successful `POST /token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Errors that can occur when issuing requests.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered 401: the session is invalid or expired.
    #[error("session expired: {url} returned 401")]
    SessionExpired { url: String, body: String },

    /// The server answered with another non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String, body: String },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// Reading or writing the persisted token failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A path could not be resolved against the base URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// A value could not be encoded as an HTTP header.
    #[error("invalid header value: {0}")]
    InvalidHeader(String),

    /// A response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::SessionExpired { .. } => Some(StatusCode::UNAUTHORIZED.as_u16()),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this error signals an invalid or expired session.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("http://localhost:8000/properties/").unwrap()
    }

    #[test]
    fn test_response_json() {
        let response = HttpResponse::new(StatusCode::OK, url(), r#"{"access_token":"a","token_type":"bearer"}"#);
        let parsed: TokenResponse = response.json().unwrap();
        assert_eq!(parsed.access_token, "a");
    }

    #[test]
    fn test_response_json_decode_error() {
        let response = HttpResponse::new(StatusCode::OK, url(), "nope");
        let result: Result<TokenResponse> = response.json();
        assert!(matches!(result, Err(ClientError::Decode(_))));
    }

    #[test]
    fn test_error_status() {
        let expired = ClientError::SessionExpired {
            url: url().to_string(),
            body: String::new(),
        };
        assert_eq!(expired.status(), Some(401));
        assert!(expired.is_session_expired());

        let server = ClientError::Status {
            status: 500,
            url: url().to_string(),
            body: String::new(),
        };
        assert_eq!(server.status(), Some(500));
        assert!(!server.is_session_expired());

        assert_eq!(ClientError::Transport("refused".into()).status(), None);
    }
}
