//! Core daemon.

use std::time::Instant;

use axum::Json;
use serde_json::json;

use crate::context::Context;
use crate::http::{chain, handler, Route, RouteTable, SubRoute};
use crate::lifecycle::{DaemonEntry, DaemonError};

pub const NAME: &str = "core";

pub fn entry() -> DaemonEntry {
    DaemonEntry::new(NAME, start)
}

async fn start(ctx: Context) -> Result<(), DaemonError> {
    let table = routes(&ctx, Instant::now());
    super::serve(&ctx, NAME, table).await?;
    Ok(())
}

pub fn routes(ctx: &Context, started: Instant) -> RouteTable {
    RouteTable::new()
        .sub_route(
            SubRoute::new("/core/v1")
                .with(chain::trace())
                .route(super::health_route(NAME))
                .route(Route::get(
                    "/status",
                    handler(move |_request| async move {
                        Json(json!({
                            "daemon": NAME,
                            "uptime_secs": started.elapsed().as_secs(),
                        }))
                    }),
                )),
        )
        .static_dir(ctx.service(NAME).and_then(|s| s.static_dir.clone()))
}
