//! Client-side route table and navigation.
//!
//! The HTTP layer only depends on [`Navigator`]. [`Router`] is the concrete
//! navigator: it holds the ordered route table, tracks the current location,
//! and resolves view references, loading lazy ones on first access.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Path of the login view, the redirect target on session expiry.
pub const LOGIN_PATH: &str = "/";

/// Something that can move the application to another location.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Errors from route resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// No route matches the requested path.
    #[error("no route matches {0}")]
    NotFound(String),

    /// A lazy view failed to load.
    #[error("failed to load view chunk {chunk}: {message}")]
    LoadFailed { chunk: String, message: String },
}

/// Reference to the view backing a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub name: String,
}

impl View {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

type ViewFuture = Pin<Box<dyn Future<Output = Result<View, RouteError>> + Send>>;
type ViewLoader = Arc<dyn Fn() -> ViewFuture + Send + Sync>;

/// A view resolved on first access and cached afterwards.
pub struct LazyView {
    chunk: String,
    loader: ViewLoader,
    loaded: OnceCell<View>,
}

impl LazyView {
    /// Create a lazy view whose `loader` runs at most once successfully.
    pub fn new<F, Fut>(chunk: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<View, RouteError>> + Send + 'static,
    {
        Self {
            chunk: chunk.into(),
            loader: Arc::new(move || Box::pin(loader()) as ViewFuture),
            loaded: OnceCell::new(),
        }
    }

    pub fn chunk(&self) -> &str {
        &self.chunk
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    /// Load the view, running the loader only if no earlier load succeeded.
    pub async fn load(&self) -> Result<&View, RouteError> {
        self.loaded
            .get_or_try_init(|| {
                debug!("loading view chunk {}", self.chunk);
                (self.loader)()
            })
            .await
    }
}

impl std::fmt::Debug for LazyView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyView")
            .field("chunk", &self.chunk)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// How a route's view is obtained.
#[derive(Debug)]
pub enum Component {
    /// Available at startup.
    Eager(View),
    /// Loaded on first navigation.
    Lazy(LazyView),
}

/// One entry of the route table.
#[derive(Debug)]
pub struct Route {
    pub path: String,
    pub name: String,
    pub component: Component,
    /// Pass matched params through to the view as props.
    pub props: bool,
}

impl Route {
    pub fn new(path: impl Into<String>, name: impl Into<String>, component: Component) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            component,
            props: false,
        }
    }

    pub fn with_props(mut self) -> Self {
        self.props = true;
        self
    }

    fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let pattern = segments(&self.path);
        let actual = segments(path);
        if pattern.len() != actual.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (expected, given) in pattern.iter().zip(&actual) {
            match expected.strip_prefix(':') {
                Some(name) => {
                    params.insert(name.to_string(), given.to_string());
                }
                None if expected == given => {}
                None => return None,
            }
        }
        Some(params)
    }
}

fn segments(path: &str) -> Vec<&str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// A successful resolution of a path against the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub path: String,
    pub name: String,
    pub params: BTreeMap<String, String>,
    index: usize,
    props: bool,
}

impl RouteMatch {
    /// Params handed to the view; empty unless the route passes props.
    pub fn props(&self) -> BTreeMap<String, String> {
        if self.props {
            self.params.clone()
        } else {
            BTreeMap::new()
        }
    }
}

#[derive(Debug, Default)]
struct Location {
    current: Option<String>,
    history: Vec<String>,
}

/// Ordered route table plus the current location.
#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
    location: Mutex<Location>,
}

impl Router {
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes,
            location: Mutex::new(Location::default()),
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Resolve `path` to the first matching route.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        self.routes.iter().enumerate().find_map(|(index, route)| {
            route.matches(path).map(|params| RouteMatch {
                path: path.to_string(),
                name: route.name.clone(),
                params,
                index,
                props: route.props,
            })
        })
    }

    /// Move to `path`.
    ///
    /// Pushing the current location again leaves history untouched.
    pub fn push(&self, path: &str) -> Result<RouteMatch, RouteError> {
        let matched = self
            .resolve(path)
            .ok_or_else(|| RouteError::NotFound(path.to_string()))?;

        let mut location = self.location.lock();
        if location.current.as_deref() == Some(path) {
            debug!("already at {}, skipping navigation", path);
            return Ok(matched);
        }
        location.current = Some(path.to_string());
        location.history.push(path.to_string());
        debug!("navigated to {} ({})", path, matched.name);

        Ok(matched)
    }

    pub fn current(&self) -> Option<String> {
        self.location.lock().current.clone()
    }

    pub fn history(&self) -> Vec<String> {
        self.location.lock().history.clone()
    }

    /// Resolve the view for a match, loading a lazy view if needed.
    pub async fn view(&self, matched: &RouteMatch) -> Result<View, RouteError> {
        let route = self
            .routes
            .get(matched.index)
            .ok_or_else(|| RouteError::NotFound(matched.path.clone()))?;

        match &route.component {
            Component::Eager(view) => Ok(view.clone()),
            Component::Lazy(lazy) => lazy.load().await.cloned(),
        }
    }
}

impl Navigator for Router {
    fn navigate(&self, path: &str) {
        if let Err(e) = self.push(path) {
            warn!("navigation to {} failed: {}", path, e);
        }
    }
}

/// The application's route table.
pub fn default_routes() -> Vec<Route> {
    vec![
        Route::new(LOGIN_PATH, "UserLogin", Component::Eager(View::new("UserLogin"))),
        Route::new("/home", "home", Component::Eager(View::new("HomeView"))),
        Route::new(
            "/about",
            "about",
            Component::Lazy(LazyView::new("about", || async { Ok(View::new("AboutView")) })),
        ),
        Route::new(
            "/properties/:id",
            "PropertyDetails",
            Component::Eager(View::new("PropertyDetails")),
        )
        .with_props(),
    ]
}
