//! Node daemon.

use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::context::Context;
use crate::http::{chain, handler, Route, RouteTable, SubRoute};
use crate::lifecycle::{DaemonEntry, DaemonError};

pub const NAME: &str = "node";

pub fn entry() -> DaemonEntry {
    DaemonEntry::new(NAME, start)
}

async fn start(ctx: Context) -> Result<(), DaemonError> {
    let id = Uuid::new_v4();
    tracing::debug!(node_id = %id, "Node identity assigned");
    let table = routes(&ctx, id);
    super::serve(&ctx, NAME, table).await?;
    Ok(())
}

/// Routes under `/node/v1`; `id` identifies this node for the run.
pub fn routes(ctx: &Context, id: Uuid) -> RouteTable {
    RouteTable::new()
        .sub_route(
            SubRoute::new("/node/v1")
                .with(chain::trace())
                .with(chain::request_id())
                .route(super::health_route(NAME))
                .route(Route::get(
                    "/id",
                    handler(move |_request| async move { Json(json!({ "id": id })) }),
                )),
        )
        .static_dir(ctx.service(NAME).and_then(|s| s.static_dir.clone()))
}
