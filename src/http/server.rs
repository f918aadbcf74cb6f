//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Compile the daemon's route table into an Axum Router
//! - Wire up middleware (timeouts, CORS, access log)
//! - Restrict cross-origin access to the configured endpoint
//!
//! # Layer Order (outermost first)
//! ```text
//! response body timeout → access log → CORS → handler timeout
//!     → request body timeout → router
//! ```
//!
//! The response body timeout sits outside the access log so the log still
//! sees the body's exact size.

use std::time::Duration;

use axum::{
    http::{header::InvalidHeaderValue, HeaderValue, Method, StatusCode},
    Router,
};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::timeout::{RequestBodyTimeoutLayer, ResponseBodyTimeoutLayer, TimeoutLayer};

use crate::http::route::{RouteError, RouteTable};
use crate::observability::access_log::{self, AccessLog};

/// Bound applied to header read, body read and write, handling, and idle waits.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors building a server from a route table.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Routes(#[from] RouteError),

    #[error("endpoint {endpoint:?} is not a valid CORS origin: {source}")]
    InvalidOrigin {
        endpoint: String,
        source: InvalidHeaderValue,
    },
}

/// A compiled, fully layered application for one endpoint.
pub struct HttpServer {
    router: Router,
    endpoint: String,
}

impl HttpServer {
    /// Compile `table` and wrap it for serving at `endpoint`.
    pub fn new(
        table: &RouteTable,
        endpoint: &str,
        access_log: AccessLog,
    ) -> Result<Self, ServerError> {
        let origin = HeaderValue::from_str(&cors_origin(endpoint)).map_err(|source| {
            ServerError::InvalidOrigin {
                endpoint: endpoint.to_string(),
                source,
            }
        })?;

        let router = Self::build_router(table.compile()?, origin, access_log);
        tracing::debug!(endpoint = %endpoint, routes = table.len(), "HTTP server built");

        Ok(Self {
            router,
            endpoint: endpoint.to_string(),
        })
    }

    fn build_router(routes: Router, origin: HeaderValue, access_log: AccessLog) -> Router {
        routes
            .layer(RequestBodyTimeoutLayer::new(CONNECTION_TIMEOUT))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                CONNECTION_TIMEOUT,
            ))
            .layer(
                CorsLayer::new()
                    .allow_origin(origin)
                    .allow_methods([Method::GET, Method::POST]),
            )
            .layer(axum::middleware::from_fn_with_state(
                access_log,
                access_log::record,
            ))
            .layer(ResponseBodyTimeoutLayer::new(CONNECTION_TIMEOUT))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

/// The single origin allowed by CORS for an endpoint.
///
/// Bare addresses are served over TLS, so they gain an `https://` scheme.
pub fn cors_origin(endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.trim_end_matches('/').to_string()
    } else {
        format!("https://{endpoint}")
    }
}
