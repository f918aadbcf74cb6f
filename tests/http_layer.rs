//! The serving layer as a daemon sees it: route table in, layered app out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use pandora::http::{from_fn, handler, HttpServer, Route, RouteTable, SubRoute};
use pandora::observability::AccessLog;
use tower::ServiceExt;

mod common;

fn guarded_table(static_dir: &std::path::Path, hits: &Arc<AtomicUsize>) -> RouteTable {
    let counted = Arc::clone(hits);
    let deny_without_token = from_fn(move |request: Request<Body>, next| {
        counted.fetch_add(1, Ordering::SeqCst);
        async move {
            if request.headers().contains_key(header::AUTHORIZATION) {
                next(request).await
            } else {
                axum::response::IntoResponse::into_response(StatusCode::UNAUTHORIZED)
            }
        }
    });

    RouteTable::new()
        .sub_route(
            SubRoute::new("/v1")
                .with(deny_without_token)
                .route(Route::get("/secret", handler(|_req| async { "secret" })))
                .route(Route::post("/secret", handler(|_req| async { "stored" }))),
        )
        .static_dir(Some(static_dir.to_path_buf()))
}

#[tokio::test]
async fn static_assets_skip_route_middleware_but_are_logged() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("x.txt"), "plain").unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let capture = common::Capture::default();

    let app = HttpServer::new(
        &guarded_table(dir.path(), &hits),
        "127.0.0.1:8443",
        AccessLog::new(capture.clone()),
    )
    .unwrap()
    .into_router();

    let request = Request::builder()
        .uri("/static/x.txt")
        .header(header::USER_AGENT, "curl")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    let lines = capture.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("\"GET /static/x.txt HTTP/1.1\" 200 5 "));
    assert!(lines[0].ends_with(" curl"));
}

#[tokio::test]
async fn subroute_guard_short_circuits_handler() {
    let dir = tempfile::tempdir().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let app = HttpServer::new(
        &guarded_table(dir.path(), &hits),
        "127.0.0.1:8443",
        AccessLog::new(common::Capture::default()),
    )
    .unwrap()
    .into_router();

    let anonymous = Request::builder().uri("/v1/secret").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(anonymous).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let authorized = Request::builder()
        .method("POST")
        .uri("/v1/secret")
        .header(header::AUTHORIZATION, "Bearer token")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(authorized).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");

    let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&bytes[..], b"stored");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn preflight_from_foreign_origin_is_not_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let app = HttpServer::new(
        &guarded_table(dir.path(), &hits),
        "127.0.0.1:8443",
        AccessLog::new(common::Capture::default()),
    )
    .unwrap()
    .into_router();

    let preflight = Request::builder()
        .method("OPTIONS")
        .uri("/v1/secret")
        .header(header::ORIGIN, "https://elsewhere.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(preflight).await.unwrap();

    let allowed = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .map(|v| v.to_str().unwrap().to_string());
    assert_ne!(allowed.as_deref(), Some("https://elsewhere.example"));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}
