//! The statically named subsystems `kit` can start.
//!
//! Each daemon builds its own route table and, when its settings section
//! names an endpoint, serves it through [`crate::net::listen`]. A daemon
//! without an endpoint is ready as soon as it has been set up.

pub mod api;
pub mod core;
pub mod discovery;
pub mod node;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::context::Context;
use crate::http::{handler, Handler, Route, RouteTable};
use crate::lifecycle::{DaemonEntry, DaemonError, DaemonRegistry};
use crate::net::{self, ServerHandle};

/// Every daemon name, in the order used when none are requested.
pub const NAMES: [&str; 4] = [api::NAME, self::core::NAME, discovery::NAME, node::NAME];

/// Registry holding all known daemons.
pub fn registry() -> Result<DaemonRegistry, DaemonError> {
    let mut registry = DaemonRegistry::new();
    for entry in entries() {
        registry.register(entry)?;
    }
    Ok(registry)
}

fn entries() -> [DaemonEntry; 4] {
    [api::entry(), self::core::entry(), discovery::entry(), node::entry()]
}

/// Bind the daemon's listener if it has an endpoint configured.
async fn serve(
    ctx: &Context,
    name: &str,
    table: RouteTable,
) -> Result<Option<ServerHandle>, DaemonError> {
    let Some(endpoint) = ctx.service(name).and_then(|s| s.endpoint.clone()) else {
        tracing::info!(daemon = %name, "No endpoint configured, running without HTTP listener");
        return Ok(None);
    };

    let handle = net::listen(ctx, &endpoint, &table).await?;
    tracing::info!(
        daemon = %name,
        endpoint = %handle.endpoint(),
        address = %handle.local_addr(),
        routes = table.len(),
        "HTTP listener started"
    );
    Ok(Some(handle))
}

/// `GET <prefix>/health` returning the daemon's name.
fn health_route(name: &'static str) -> Route {
    Route::get("/health", health(name))
}

fn health(name: &'static str) -> Handler {
    handler(move |_request| async move {
        (StatusCode::OK, Json(json!({ "status": "ok", "daemon": name }))).into_response()
    })
}
