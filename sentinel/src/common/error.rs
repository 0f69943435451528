//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! 失敗の扱いは境界ごとに閉じる。通信失敗は観測データとして記録され、
//! ここに現れるのは設定・永続化・プログラム上の誤りのみ。

use axum::http::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// 設定（サイト一覧）読み込みエラー
///
/// 起動時の読み込み失敗は致命的。再読み込み時の失敗は既存の設定を維持する。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// ファイルを読めない
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// 設定ファイルパス
        path: PathBuf,
        /// 元のI/Oエラー
        #[source]
        source: std::io::Error,
    },

    /// JSONとして解釈できない
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    /// 監視対象が1件もない
    #[error("Config defines no sites to monitor")]
    Empty,

    /// ID重複
    #[error("Duplicate site id: {0}")]
    DuplicateId(String),

    /// 不正なエントリ
    #[error("Invalid site entry '{id}': {reason}")]
    InvalidEndpoint {
        /// 対象ID（導出できない場合は名前）
        id: String,
        /// 理由
        reason: String,
    },

    /// 不正な監視設定値
    #[error("Invalid monitor setting: {0}")]
    InvalidSetting(String),

    /// 設定ファイルの変更監視を開始できない
    #[error("Failed to watch config file {path}: {reason}")]
    Watch {
        /// 設定ファイルパス
        path: PathBuf,
        /// 理由
        reason: String,
    },
}

/// プローブエラー
///
/// 到達不能はエラーではなく観測結果として扱うため、
/// ここにはプローブ自体を行えない設定上の欠陥のみが入る。
#[derive(Debug, Error)]
pub enum ProbeError {
    /// URLが不正（解析不能、http/https以外）
    #[error("Invalid probe URL '{url}': {reason}")]
    InvalidUrl {
        /// 対象URL
        url: String,
        /// 理由
        reason: String,
    },
}

/// sentinel error type
#[derive(Debug, Error)]
pub enum SentinelError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Probe setup error
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// Endpoint not found
    #[error("Endpoint not found: {0}")]
    EndpointNotFound(String),

    /// Invalid request argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Server I/O error (bind, serve)
    #[error("Server error: {0}")]
    Server(String),
}

impl From<sqlx::Error> for SentinelError {
    fn from(err: sqlx::Error) -> Self {
        SentinelError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for SentinelError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        SentinelError::Database(format!("Failed to run migrations: {}", err))
    }
}

impl SentinelError {
    /// Returns a safe error message for external clients.
    ///
    /// Full details (paths, SQL errors) go to the server log only.
    pub fn external_message(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration error",
            Self::Probe(_) => "Invalid probe target",
            Self::EndpointNotFound(_) => "Endpoint not found",
            Self::InvalidArgument(_) => "Invalid argument",
            Self::Database(_) => "Database error",
            Self::Http(_) => "HTTP client error",
            Self::Serialization(_) => "Serialization error",
            Self::Server(_) => "Internal server error",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Probe(_) => StatusCode::BAD_REQUEST,
            Self::EndpointNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Http(_) => StatusCode::BAD_GATEWAY,
            Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
