//! Route tables and their compilation into an axum router.
//!
//! # Route Compilation (at daemon start)
//! ```text
//! SubRoute[] (+ optional static dir)
//!     → reject duplicate prefixes and duplicate (path, method) pairs
//!     → reject paths the matcher cannot hold side by side
//!     → compose each handler with subroute ++ route middleware
//!     → group by full path into method routers
//!     → mount static files under /static/, outside the middleware chains
//!     → Freeze as immutable axum::Router
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use axum::{
    body::Body,
    http::{Method, Request},
    routing::{MethodFilter, MethodRouter},
    Router,
};
use thiserror::Error;
use tower_http::services::ServeDir;

use crate::http::chain::{compose, Handler, Middleware};

pub const GET: Method = Method::GET;
pub const POST: Method = Method::POST;

/// URL prefix under which the static directory is served.
pub const STATIC_PREFIX: &str = "/static";

/// Errors detected while compiling a route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("subroute prefix {0:?} registered twice")]
    DuplicatePrefix(String),

    #[error("route {method} {prefix}{path} registered twice")]
    DuplicateRoute {
        prefix: String,
        path: String,
        method: Method,
    },

    #[error("route path {0:?} is not a valid route pattern")]
    InvalidPath(String),

    #[error("route {path:?} conflicts with {existing:?}")]
    Conflict { path: String, existing: String },

    #[error("method {0} cannot be routed")]
    UnsupportedMethod(Method),
}

/// A single endpoint.
#[derive(Clone)]
pub struct Route {
    pub path: String,
    pub method: Method,
    pub handler: Handler,
    pub middleware: Vec<Middleware>,
}

impl Route {
    pub fn new(method: Method, path: impl Into<String>, handler: Handler) -> Self {
        Self {
            path: path.into(),
            method,
            handler,
            middleware: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>, handler: Handler) -> Self {
        Self::new(GET, path, handler)
    }

    pub fn post(path: impl Into<String>, handler: Handler) -> Self {
        Self::new(POST, path, handler)
    }

    /// Append a middleware; earlier ones run first.
    pub fn with(mut self, middleware: Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

/// A group of routes sharing a prefix and a middleware set.
///
/// The group's middleware wraps every contained route outside the route's
/// own middleware.
#[derive(Clone, Default)]
pub struct SubRoute {
    pub prefix: String,
    pub routes: Vec<Route>,
    pub middleware: Vec<Middleware>,
}

impl SubRoute {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn with(mut self, middleware: Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }
}

impl std::fmt::Debug for SubRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubRoute")
            .field("prefix", &self.prefix)
            .field("routes", &self.routes)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

/// Everything a daemon serves: its subroutes and an optional static dir.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    pub sub_routes: Vec<SubRoute>,
    pub static_dir: Option<PathBuf>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sub_route(mut self, sub_route: SubRoute) -> Self {
        self.sub_routes.push(sub_route);
        self
    }

    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Number of routes across all subroutes.
    pub fn len(&self) -> usize {
        self.sub_routes.iter().map(|s| s.routes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compile into a dispatchable router.
    ///
    /// Duplicate prefixes and duplicate (path, method) pairs within a
    /// subroute are rejected, as are patterns that would collide inside the
    /// matcher: the same shape under different capture names, or anything
    /// at or below the static prefix while a static dir is set.
    pub fn compile(&self) -> Result<Router, RouteError> {
        let mut prefixes = HashSet::new();
        let mut registered: HashSet<(String, Method)> = HashSet::new();
        let mut shapes: HashMap<String, String> = HashMap::new();
        let mut paths: BTreeMap<String, MethodRouter> = BTreeMap::new();

        for sub_route in &self.sub_routes {
            if !prefixes.insert(sub_route.prefix.as_str()) {
                return Err(RouteError::DuplicatePrefix(sub_route.prefix.clone()));
            }

            for route in &sub_route.routes {
                let full_path = join_path(&sub_route.prefix, &route.path)?;
                let shape = path_shape(&full_path)?;
                if self.static_dir.is_some() && under_static_prefix(&full_path) {
                    return Err(RouteError::Conflict {
                        path: full_path,
                        existing: format!("{STATIC_PREFIX}/"),
                    });
                }
                match shapes.get(&shape) {
                    Some(existing) if *existing != full_path => {
                        return Err(RouteError::Conflict {
                            path: full_path,
                            existing: existing.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        shapes.insert(shape, full_path.clone());
                    }
                }

                if !registered.insert((full_path.clone(), route.method.clone())) {
                    return Err(RouteError::DuplicateRoute {
                        prefix: sub_route.prefix.clone(),
                        path: route.path.clone(),
                        method: route.method.clone(),
                    });
                }

                let filter = MethodFilter::try_from(route.method.clone())
                    .map_err(|_| RouteError::UnsupportedMethod(route.method.clone()))?;

                let chain: Vec<Middleware> = sub_route
                    .middleware
                    .iter()
                    .chain(&route.middleware)
                    .cloned()
                    .collect();
                let composed = compose(route.handler.clone(), &chain);

                let method_router = paths.remove(&full_path).unwrap_or_else(MethodRouter::new);
                paths.insert(
                    full_path,
                    method_router.on(filter, move |request: Request<Body>| composed(request)),
                );
            }
        }

        let mut router = Router::new();
        for (path, method_router) in paths {
            tracing::debug!(path = %path, "Route registered");
            router = router.route(&path, method_router);
        }

        if let Some(dir) = &self.static_dir {
            tracing::debug!(dir = %dir.display(), "Serving static files under {}/", STATIC_PREFIX);
            router = router.nest_service(STATIC_PREFIX, ServeDir::new(dir));
        }

        Ok(router)
    }
}

fn join_path(prefix: &str, path: &str) -> Result<String, RouteError> {
    if !path.is_empty() && !path.starts_with('/') {
        return Err(RouteError::InvalidPath(path.to_string()));
    }
    if !prefix.is_empty() && !prefix.starts_with('/') {
        return Err(RouteError::InvalidPath(prefix.to_string()));
    }

    let joined = format!("{}{}", prefix.trim_end_matches('/'), path);
    if joined.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(joined)
    }
}

/// Normalized form of a pattern with capture names erased, so `/{id}` and
/// `/{user}` map to the same shape.
fn path_shape(path: &str) -> Result<String, RouteError> {
    let invalid = || RouteError::InvalidPath(path.to_string());
    let segments: Vec<&str> = path.split('/').skip(1).collect();
    let mut shape = String::with_capacity(path.len());

    for (index, segment) in segments.iter().enumerate() {
        shape.push('/');
        if segment.starts_with(':') || segment.starts_with('*') {
            return Err(invalid());
        }
        match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => match name.strip_prefix('*') {
                Some(rest) if rest.is_empty() || index + 1 != segments.len() => {
                    return Err(invalid());
                }
                Some(_) => shape.push_str("{*}"),
                None if name.is_empty() || name.contains(['{', '}']) => {
                    return Err(invalid());
                }
                None => shape.push_str("{}"),
            },
            None if segment.contains(['{', '}']) => return Err(invalid()),
            None => shape.push_str(segment),
        }
    }

    Ok(shape)
}

fn under_static_prefix(path: &str) -> bool {
    path.strip_prefix(STATIC_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
