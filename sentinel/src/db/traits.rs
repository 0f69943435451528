//! Repository traitパターン定義
//!
//! 履歴ストアを抽象化し、スケジューラやアップタイム計算を
//! 実DBなしでテストできるようにする。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::types::StatusRecord;

// ---------------------------------------------------------------------------
// HistoryStore
// ---------------------------------------------------------------------------

/// ステータス履歴ストア
///
/// 書き込みは単一（スケジューラ）、読み取りは複数。
/// 同じ書き込み元からは自分の書き込みが直後の読み取りで見える。
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// 観測結果を追記
    async fn append(&self, record: &StatusRecord) -> Result<(), sqlx::Error>;
    /// 直近の観測を新しい順に最大 `limit` 件取得
    async fn recent(&self, endpoint_id: &str, limit: u32)
        -> Result<Vec<StatusRecord>, sqlx::Error>;
    /// `since` 以降の観測数（`reachable` 指定時はその値に一致するもののみ）
    async fn count_since(
        &self,
        endpoint_id: &str,
        since: DateTime<Utc>,
        reachable: Option<bool>,
    ) -> Result<u64, sqlx::Error>;
    /// `cutoff` より古い観測を削除
    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error>;
}

#[async_trait]
impl HistoryStore for SqlitePool {
    async fn append(&self, record: &StatusRecord) -> Result<(), sqlx::Error> {
        super::status_records::append_record(self, record).await
    }

    async fn recent(
        &self,
        endpoint_id: &str,
        limit: u32,
    ) -> Result<Vec<StatusRecord>, sqlx::Error> {
        super::status_records::recent_records(self, endpoint_id, limit).await
    }

    async fn count_since(
        &self,
        endpoint_id: &str,
        since: DateTime<Utc>,
        reachable: Option<bool>,
    ) -> Result<u64, sqlx::Error> {
        super::status_records::count_since(self, endpoint_id, since, reachable).await
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        super::status_records::prune_before(self, cutoff).await
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockHistoryStore;
    use super::*;
    use crate::db::test_utils::test_db_pool_with;
    use crate::types::Endpoint;
    use chrono::Duration;
    use std::sync::Arc;

    async fn exercise(store: Arc<dyn HistoryStore>) {
        let now = Utc::now();
        store
            .append(
                &StatusRecord::responded("api", true, "200 OK", 5)
                    .observed_at(now - Duration::minutes(2)),
            )
            .await
            .unwrap();
        store
            .append(
                &StatusRecord::unreachable("api", "timed out")
                    .observed_at(now - Duration::minutes(1)),
            )
            .await
            .unwrap();

        let recent = store.recent("api", 60).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(!recent[0].reachable);

        let since = now - Duration::hours(1);
        assert_eq!(store.count_since("api", since, None).await.unwrap(), 2);
        assert_eq!(store.count_since("api", since, Some(true)).await.unwrap(), 1);
        assert_eq!(store.prune_before(now).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_sqlite_pool_implements_history_store() {
        let pool = test_db_pool_with(&[Endpoint::new("api", "API", "http://localhost")]).await;
        exercise(Arc::new(pool)).await;
    }

    #[tokio::test]
    async fn test_mock_store_matches_sqlite_behavior() {
        exercise(Arc::new(MockHistoryStore::default())).await;
    }

    #[tokio::test]
    async fn test_failing_mock_rejects_appends() {
        let store = MockHistoryStore::failing();
        let result = store.append(&StatusRecord::unreachable("api", "x")).await;
        assert!(result.is_err());
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn test_mock_read_failures_leave_appends_working() {
        let store = MockHistoryStore::default();
        store.set_fail_reads(true);
        store
            .append(&StatusRecord::unreachable("api", "x"))
            .await
            .unwrap();
        assert!(store.recent("api", 10).await.is_err());
        assert!(store.count_since("api", Utc::now(), None).await.is_err());
        assert_eq!(store.records().len(), 1);
    }
}
