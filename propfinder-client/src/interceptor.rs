//! Response interceptors.
//!
//! Interceptors see every outcome flowing back through
//! [`AuthenticatedClient`](crate::AuthenticatedClient), success or error,
//! by shared reference. They can trigger side effects but cannot alter or
//! replace the outcome the caller receives.

use reqwest::StatusCode;
use std::sync::Arc;
use tracing::warn;

use crate::router::Navigator;
use crate::types::{HttpRequest, HttpResponse, Result};

/// Observes each request's outcome after the transport returns.
pub trait ResponseInterceptor: Send + Sync {
    fn intercept(&self, request: &HttpRequest, outcome: &Result<HttpResponse>);
}

/// Callback invoked when a response signals an expired session.
pub type UnauthorizedHandler = Arc<dyn Fn() + Send + Sync>;

/// Build a handler that sends `navigator` to `path`.
pub fn redirect_to(navigator: Arc<dyn Navigator>, path: impl Into<String>) -> UnauthorizedHandler {
    let path = path.into();
    Arc::new(move || navigator.navigate(&path))
}

/// Calls its handler once for every 401 outcome.
pub struct UnauthorizedInterceptor {
    handler: UnauthorizedHandler,
}

impl UnauthorizedInterceptor {
    pub fn new(handler: UnauthorizedHandler) -> Self {
        Self { handler }
    }
}

impl ResponseInterceptor for UnauthorizedInterceptor {
    fn intercept(&self, request: &HttpRequest, outcome: &Result<HttpResponse>) {
        let unauthorized = match outcome {
            Ok(response) => response.status == StatusCode::UNAUTHORIZED,
            Err(e) => e.is_session_expired(),
        };

        if unauthorized {
            warn!(
                "session expired on {} {}, redirecting to login",
                request.method, request.url
            );
            (self.handler)();
        }
    }
}
