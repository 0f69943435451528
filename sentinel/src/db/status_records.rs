//! ステータス履歴データベース操作
//!
//! 追記専用。削除は保持期間による `prune_before` のみ。

use super::{format_timestamp, parse_timestamp};
use crate::types::StatusRecord;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// 観測結果を追記
pub async fn append_record(pool: &SqlitePool, record: &StatusRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO status_records (id, endpoint_id, observed_at, reachable, message, latency_ms)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.endpoint_id)
    .bind(format_timestamp(record.observed_at))
    .bind(record.reachable)
    .bind(&record.message)
    .bind(i64::try_from(record.latency_ms).unwrap_or(i64::MAX))
    .execute(pool)
    .await?;

    Ok(())
}

/// 直近の観測を新しい順に最大 `limit` 件取得
///
/// 同時刻の観測は後から追記したものを先に返す。
pub async fn recent_records(
    pool: &SqlitePool,
    endpoint_id: &str,
    limit: u32,
) -> Result<Vec<StatusRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, StatusRecordRow>(
        r#"
        SELECT id, endpoint_id, observed_at, reachable, message, latency_ms
        FROM status_records
        WHERE endpoint_id = ?
        ORDER BY observed_at DESC, seq DESC
        LIMIT ?
        "#,
    )
    .bind(endpoint_id)
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(StatusRecord::from).collect())
}

/// `since` 以降（境界を含む）の観測数を取得
///
/// `reachable` が `Some` の場合はその到達可否に一致するものだけを数える。
pub async fn count_since(
    pool: &SqlitePool,
    endpoint_id: &str,
    since: DateTime<Utc>,
    reachable: Option<bool>,
) -> Result<u64, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM status_records
        WHERE endpoint_id = ?
          AND observed_at >= ?
          AND (? IS NULL OR reachable = ?)
        "#,
    )
    .bind(endpoint_id)
    .bind(format_timestamp(since))
    .bind(reachable)
    .bind(reachable)
    .fetch_one(pool)
    .await?;

    Ok(count.max(0) as u64)
}

/// `cutoff` より古い観測を削除し、削除件数を返す
pub async fn prune_before(pool: &SqlitePool, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM status_records WHERE observed_at < ?")
        .bind(format_timestamp(cutoff))
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

// --- Internal Row Types ---

#[derive(sqlx::FromRow)]
struct StatusRecordRow {
    id: String,
    endpoint_id: String,
    observed_at: String,
    reachable: bool,
    message: String,
    latency_ms: i64,
}

impl From<StatusRecordRow> for StatusRecord {
    fn from(row: StatusRecordRow) -> Self {
        StatusRecord {
            id: row.id,
            endpoint_id: row.endpoint_id,
            observed_at: parse_timestamp(&row.observed_at).unwrap_or_default(),
            reachable: row.reachable,
            message: row.message,
            latency_ms: row.latency_ms.max(0) as u64,
        }
    }
}
