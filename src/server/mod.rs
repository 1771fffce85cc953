//! HTTP endpoints over the capture library.
//!
//! | Route | Method | Body | Answer |
//! |-------|--------|------|--------|
//! | `/screenshot` | POST | `{url}` | `{success, screenshotUrl}` |
//! | `/bulk-screenshot` | POST | `{urls, speed?}` | ZIP bytes |
//! | both of the above | OPTIONS | | `200`, CORS headers |
//! | `/health` | GET | | `{status, configured}` |
//!
//! Errors are `{"error": …}` with 400 for bad input and 500 otherwise. Any
//! other method on a capture route gets 405. Every response carries the CORS
//! headers.

pub mod error;
pub mod handlers;

use crate::config::ServiceConfig;
use crate::error::ShotError;
use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Extension, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::ApiError;

/// Environment variable for the listen host of `serve`.
pub const HOST_ENV: &str = "BULKSHOT_HOST";

/// Environment variable for the listen port of `serve`.
pub const PORT_ENV: &str = "BULKSHOT_PORT";

pub const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
pub const ALLOW_METHODS: &str = "POST, OPTIONS";

/// Shared by every handler.
#[derive(Debug)]
pub struct AppState {
    pub config: ServiceConfig,
}

/// Build the router with tracing and CORS layers applied.
pub fn router(config: ServiceConfig) -> Router {
    let state = Arc::new(AppState { config });

    Router::new()
        .route(
            "/screenshot",
            post(handlers::screenshot).options(handlers::preflight),
        )
        .route(
            "/bulk-screenshot",
            post(handlers::bulk_screenshot).options(handlers::preflight),
        )
        .route("/health", get(handlers::health))
        .layer(Extension(state))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, config: ServiceConfig) -> Result<(), ShotError> {
    if !config.is_configured() {
        tracing::warn!("No access key configured; capture routes will answer 500");
    }
    let app = router(config);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ShotError::Io {
            path: addr.to_string().into(),
            source: e,
        })?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .map_err(|e| ShotError::Internal(format!("server error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};
    use axum_test::TestServer;
    use serde_json::{json, Value};

    fn server(config: ServiceConfig) -> TestServer {
        TestServer::new(router(config)).unwrap()
    }

    #[tokio::test]
    async fn preflight_answers_with_cors_headers() {
        let server = server(ServiceConfig::default());
        for route in ["/screenshot", "/bulk-screenshot"] {
            let res = server.method(Method::OPTIONS, route).await;
            assert_eq!(res.status_code(), StatusCode::OK);
            assert_eq!(res.header("access-control-allow-origin"), "*");
            assert_eq!(res.header("access-control-allow-headers"), ALLOW_HEADERS);
            assert_eq!(res.header("access-control-allow-methods"), ALLOW_METHODS);
        }
    }

    #[tokio::test]
    async fn wrong_method_is_405_with_cors() {
        let server = server(ServiceConfig::default());
        let res = server.get("/screenshot").await;
        assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.header("access-control-allow-origin"), "*");
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let server = server(ServiceConfig::default());
        let res = server
            .post("/screenshot")
            .content_type("application/json")
            .text("{not json")
            .await;
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = res.json();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn missing_url_field_is_400() {
        let server = server(ServiceConfig::default());
        let res = server.post("/screenshot").json(&json!({})).await;
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn invalid_url_is_400() {
        let server = server(ServiceConfig::builder().access_key("k").build().unwrap());
        let res = server
            .post("/screenshot")
            .json(&json!({"url": "javascript:alert(1)"}))
            .await;
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unconfigured_service_is_500() {
        let server = server(ServiceConfig::default());
        let res = server
            .post("/screenshot")
            .json(&json!({"url": "https://example.com"}))
            .await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = res.json();
        assert!(body["error"].as_str().unwrap().contains("SCREENSHOTONE_ACCESS_KEY"));
    }

    #[tokio::test]
    async fn oversized_batch_is_400() {
        let server = server(ServiceConfig::builder().access_key("k").build().unwrap());
        let urls: Vec<String> = (0..21).map(|i| format!("https://s{i}.com")).collect();
        let res = server
            .post("/bulk-screenshot")
            .json(&json!({ "urls": urls }))
            .await;
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_reports_configuration() {
        let res = server(ServiceConfig::default()).get("/health").await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.json::<Value>(), json!({"status": "ok", "configured": false}));
    }
}
