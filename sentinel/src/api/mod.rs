//! HTTP API
//!
//! SSEストリームとポーリング用の読み取りAPI。
//! ステータスページは別オリジンから配信されるため、CORSは全許可。

pub mod error;
pub mod sites;
pub mod stream;

use crate::AppState;
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// ルーターを構築
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/status", get(stream::status_stream))
        .route("/sse", get(stream::status_stream))
        .route("/api/snapshot", get(sites::latest_snapshot))
        .route("/api/sites", get(sites::list_sites))
        .route("/api/sites/{id}/history", get(sites::site_history))
        .route("/api/sites/{id}/uptime", get(sites::site_uptime))
        .route("/healthz", get(sites::healthz))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
