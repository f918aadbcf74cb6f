//! Public API daemon.

use axum::{body::Body, http::Request, Json};
use serde_json::{json, Value};

use crate::context::Context;
use crate::http::{chain, handler, Route, RouteTable, SubRoute};
use crate::lifecycle::{DaemonEntry, DaemonError};

pub const NAME: &str = "api";

pub fn entry() -> DaemonEntry {
    DaemonEntry::new(NAME, start)
}

async fn start(ctx: Context) -> Result<(), DaemonError> {
    let table = routes(&ctx);
    super::serve(&ctx, NAME, table).await?;
    Ok(())
}

/// Routes served under `/api/v1`, plus static assets when configured.
pub fn routes(ctx: &Context) -> RouteTable {
    let services: Vec<&'static str> = ctx
        .settings()
        .services()
        .filter(|(_, s)| s.endpoint.is_some())
        .map(|(name, _)| name)
        .collect();

    RouteTable::new()
        .sub_route(
            SubRoute::new("/api/v1")
                .with(chain::trace())
                .with(chain::request_id())
                .route(super::health_route(NAME))
                .route(Route::get(
                    "/info",
                    handler(move |_request| {
                        let services = services.clone();
                        async move {
                            Json(json!({
                                "name": env!("CARGO_PKG_NAME"),
                                "version": env!("CARGO_PKG_VERSION"),
                                "listening": services,
                            }))
                        }
                    }),
                ))
                .route(Route::post("/echo", handler(echo))),
        )
        .static_dir(ctx.service(NAME).and_then(|s| s.static_dir.clone()))
}

/// Return the JSON body unchanged; malformed JSON is rejected by the extractor.
async fn echo(request: Request<Body>) -> axum::response::Response {
    use axum::extract::FromRequest;
    use axum::response::IntoResponse;

    match Json::<Value>::from_request(request, &()).await {
        Ok(Json(value)) => Json(value).into_response(),
        Err(rejection) => rejection.into_response(),
    }
}
