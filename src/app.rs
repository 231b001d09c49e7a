use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{goals, oauth, social};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route(
            "/.well-known/apple-app-site-association",
            get(apple_app_site_association),
        )
        .nest("/oauth", oauth::router())
        .nest("/social", social::router())
        .nest("/goals", goals::router())
        .nest("/api", social::device_router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "lockin API is running" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Universal Links manifest for the iOS client.
async fn apple_app_site_association() -> Json<Value> {
    Json(json!({
        "applinks": {
            "apps": [],
            "details": [
                {
                    "appID": "GWF28Z9MW3.cloud.lockin.app",
                    "paths": ["/oauth/callback", "/oauth/*", "*"]
                }
            ]
        }
    }))
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8000".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
