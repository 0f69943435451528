//! サイト状態API
//!
//! ポーリング用の読み取り専用エンドポイント。値はすべて履歴ストアと
//! ハブが保持する直近スナップショットから組み立てる。

use super::error::AppError;
use crate::common::error::SentinelError;
use crate::types::{Endpoint, StatusRecord, UptimeWindow};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// 履歴取得クエリ
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// 取得件数（履歴上限で頭打ち）
    pub limit: Option<u32>,
}

/// 履歴レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// 対象エンドポイント
    pub endpoint: Endpoint,
    /// 新しい順の観測結果
    pub records: Vec<StatusRecord>,
}

/// 稼働確認レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// 常に "ok"
    pub status: String,
    /// 監視中のサイト数
    pub sites: usize,
    /// 接続中の購読者数
    pub subscribers: usize,
}

/// GET /api/snapshot - 直近のスナップショット（未生成なら204）
pub async fn latest_snapshot(State(state): State<AppState>) -> Response {
    match state.hub.latest() {
        Some(payload) => (
            [(header::CONTENT_TYPE, "application/json")],
            payload.to_string(),
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// GET /api/sites - 監視中のサイト一覧
pub async fn list_sites(State(state): State<AppState>) -> Json<Vec<Endpoint>> {
    Json(state.registry.list().await)
}

/// GET /api/sites/{id}/history - 直近の観測履歴
pub async fn site_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let max = state.settings.history_limit;
    let limit = match query.limit {
        Some(0) => {
            return Err(SentinelError::InvalidArgument("limit must be at least 1".into()).into())
        }
        Some(limit) => limit.min(max),
        None => max,
    };

    let endpoint = known_endpoint(&state, &id).await?;
    let records = state.store.recent(&endpoint.id, limit).await?;

    Ok(Json(HistoryResponse { endpoint, records }))
}

/// GET /api/sites/{id}/uptime - ウィンドウ内の稼働率
pub async fn site_uptime(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UptimeWindow>, AppError> {
    let endpoint = known_endpoint(&state, &id).await?;
    let window = state
        .uptime
        .uptime(state.store.as_ref(), &endpoint.id, Utc::now())
        .await?;
    Ok(Json(window))
}

/// GET /healthz - プロセス稼働確認
pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        sites: state.registry.len().await,
        subscribers: state.hub.subscriber_count(),
    })
}

async fn known_endpoint(state: &AppState, id: &str) -> Result<Endpoint, SentinelError> {
    state
        .registry
        .find_known(id)
        .await?
        .ok_or_else(|| SentinelError::EndpointNotFound(id.to_string()))
}
