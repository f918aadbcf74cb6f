//! Discovery daemon: tells clients where each subsystem listens.

use std::collections::BTreeMap;

use axum::Json;

use crate::context::Context;
use crate::http::{chain, handler, Route, RouteTable, SubRoute};
use crate::lifecycle::{DaemonEntry, DaemonError};

pub const NAME: &str = "discovery";

pub fn entry() -> DaemonEntry {
    DaemonEntry::new(NAME, start)
}

async fn start(ctx: Context) -> Result<(), DaemonError> {
    let table = routes(&ctx);
    super::serve(&ctx, NAME, table).await?;
    Ok(())
}

/// Configured endpoints keyed by daemon name.
pub fn endpoints(ctx: &Context) -> BTreeMap<&'static str, String> {
    ctx.settings()
        .services()
        .filter_map(|(name, s)| s.endpoint.clone().map(|e| (name, e)))
        .collect()
}

pub fn routes(ctx: &Context) -> RouteTable {
    let endpoints = endpoints(ctx);

    RouteTable::new()
        .sub_route(
            SubRoute::new("/discovery/v1")
                .with(chain::trace())
                .route(super::health_route(NAME))
                .route(Route::get(
                    "/endpoints",
                    handler(move |_request| {
                        let endpoints = endpoints.clone();
                        async move { Json(endpoints) }
                    }),
                )),
        )
        .static_dir(ctx.service(NAME).and_then(|s| s.static_dir.clone()))
}
