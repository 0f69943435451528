//! APIエラーレスポンス型
//!
//! axum用の共通エラーハンドリング

use crate::common::error::SentinelError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::{error, warn};

/// Axum用のエラーレスポンス型
#[derive(Debug)]
pub struct AppError(pub SentinelError);

impl<E> From<E> for AppError
where
    E: Into<SentinelError>,
{
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        // 詳細（SQLエラーやパス）はログにのみ残し、クライアントには external_message() を返す
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        } else if status != StatusCode::NOT_FOUND {
            warn!(error = %self.0, "Request rejected");
        }

        let payload = json!({
            "error": self.0.external_message()
        });

        (status, Json(payload)).into_response()
    }
}
