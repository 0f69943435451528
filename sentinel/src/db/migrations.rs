//! データベース初期化とマイグレーション

use crate::common::error::SentinelError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// SQLiteデータベース接続プールを作成してマイグレーションを実行
///
/// ファイルが存在しなければ作成する。WALモードで開くため、
/// 読み取り（APIやスナップショット構築）が書き込みを長く妨げることはない。
///
/// # Arguments
/// * `database_url` - データベースURL（例: "sqlite:data/sentinel.db"）
pub async fn initialize_database(database_url: &str) -> Result<SqlitePool, SentinelError> {
    ensure_parent_dir(database_url)?;

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| SentinelError::Database(format!("Invalid database URL: {}", e)))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    tracing::info!(database_url = %database_url, "Opening database");

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| SentinelError::Database(format!("Failed to connect to database: {}", e)))?;

    run_migrations(&pool).await?;

    Ok(pool)
}

// SQLiteファイルはディレクトリが存在しないと作成できないため、先に作成しておく
fn ensure_parent_dir(database_url: &str) -> Result<(), SentinelError> {
    let Some(path) = database_url.strip_prefix("sqlite:") else {
        return Ok(());
    };
    // `sqlite::memory:` のような特殊指定はスキップ
    if path.starts_with(':') {
        return Ok(());
    }
    let normalized = path.trim_start_matches("//");
    let without_params = normalized.split('?').next().unwrap_or(normalized);
    if let Some(parent) = Path::new(without_params).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SentinelError::Database(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}

/// マイグレーションを実行（sqlx::migrate!マクロを使用）
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SentinelError> {
    tracing::info!("Running database migrations");

    sqlx::migrate!("./migrations").run(pool).await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
