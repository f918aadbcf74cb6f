//! TLS listener for a daemon's route table.
//!
//! # Responsibilities
//! - Parse and bind the configured endpoint
//! - Load the TLS material named in the settings
//! - Serve the layered router on a background task
//! - Enforce the header-read timeout at the protocol level, and bound
//!   prior-knowledge HTTP/2 connections with keep-alive pings

use std::net::SocketAddr;
use std::path::PathBuf;

use hyper_util::rt::TokioTimer;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::context::Context;
use crate::http::route::RouteTable;
use crate::http::server::{HttpServer, ServerError, CONNECTION_TIMEOUT};
use crate::net::tls::{load_tls_config, TlsError};
use crate::observability::AccessLog;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("invalid endpoint {endpoint:?}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        source: std::net::AddrParseError,
    },

    #[error("failed to bind {endpoint}: {source}")]
    Bind {
        endpoint: String,
        source: std::io::Error,
    },

    #[error("failed to load TLS material for {endpoint} (cert {cert:?}, key {key:?}): {source}")]
    Tls {
        endpoint: String,
        cert: PathBuf,
        key: PathBuf,
        source: TlsError,
    },

    #[error("failed to build server for {endpoint}: {source}")]
    Server {
        endpoint: String,
        source: ServerError,
    },
}

/// A running TLS server.
///
/// Dropping the handle leaves the server running.
#[derive(Debug)]
pub struct ServerHandle {
    endpoint: String,
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Address actually bound (differs from the endpoint for port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the serving task to end.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::error!(endpoint = %self.endpoint, error = %e, "HTTP server task failed");
        }
    }
}

/// Start serving `table` over TLS at `endpoint`, logging access to stdout.
pub async fn listen(
    ctx: &Context,
    endpoint: &str,
    table: &RouteTable,
) -> Result<ServerHandle, ListenerError> {
    listen_with(ctx, endpoint, table, AccessLog::stdout()).await
}

/// Start serving `table` over TLS at `endpoint` with a custom access log.
///
/// Returns once the socket is bound; serving continues on a spawned task.
pub async fn listen_with(
    ctx: &Context,
    endpoint: &str,
    table: &RouteTable,
    access_log: AccessLog,
) -> Result<ServerHandle, ListenerError> {
    let addr: SocketAddr = endpoint
        .parse()
        .map_err(|source| ListenerError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            source,
        })?;

    let server =
        HttpServer::new(table, endpoint, access_log).map_err(|source| ListenerError::Server {
            endpoint: endpoint.to_string(),
            source,
        })?;

    let tls = &ctx.settings().tls;
    let rustls = load_tls_config(&tls.cert, &tls.key)
        .await
        .map_err(|source| ListenerError::Tls {
            endpoint: endpoint.to_string(),
            cert: tls.cert.clone(),
            key: tls.key.clone(),
            source,
        })?;

    let bind_err = |source| ListenerError::Bind {
        endpoint: endpoint.to_string(),
        source,
    };
    let socket = std::net::TcpListener::bind(addr).map_err(bind_err)?;
    socket.set_nonblocking(true).map_err(bind_err)?;
    let local_addr = socket.local_addr().map_err(bind_err)?;

    let mut tls_server = axum_server::from_tcp_rustls(socket, rustls);
    let builder = tls_server.http_builder();
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(CONNECTION_TIMEOUT);
    builder
        .http2()
        .timer(TokioTimer::new())
        .keep_alive_interval(CONNECTION_TIMEOUT)
        .keep_alive_timeout(CONNECTION_TIMEOUT);

    let app = server
        .into_router()
        .into_make_service_with_connect_info::<SocketAddr>();

    tracing::debug!(
        endpoint = %endpoint,
        address = %local_addr,
        "Listening for HTTPS connections"
    );

    let serve_endpoint = endpoint.to_string();
    let task = tokio::spawn(async move {
        if let Err(e) = tls_server.serve(app).await {
            tracing::error!(endpoint = %serve_endpoint, error = %e, "HTTP server stopped");
        }
    });

    Ok(ServerHandle {
        endpoint: endpoint.to_string(),
        local_addr,
        task,
    })
}
