//! エンドポイントレジストリ
//!
//! 監視対象の一覧をメモリに保持し、変更をDBへ同期する。
//! スケジューラはサイクル開始時に一覧を複製するため、
//! サイクル途中で差し替えが起きても1サイクル内の対象は変わらない。

use crate::common::error::{ConfigError, SentinelError};
use crate::db::endpoints as db;
use crate::types::Endpoint;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// 一覧差し替え時の差分
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryDiff {
    /// 新規ID
    pub added: Vec<String>,
    /// 名前またはURLが変わったID
    pub updated: Vec<String>,
    /// 監視対象から外れたID（履歴は残る）
    pub removed: Vec<String>,
}

impl RegistryDiff {
    /// 変更がないか
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// エンドポイントレジストリ
#[derive(Clone)]
pub struct EndpointRegistry {
    /// 設定順の監視対象一覧
    endpoints: Arc<RwLock<Vec<Endpoint>>>,
    /// データベースプール
    pool: SqlitePool,
}

impl EndpointRegistry {
    /// 初期一覧でレジストリを作成し、DBへ登録する
    pub async fn load(pool: SqlitePool, endpoints: Vec<Endpoint>) -> Result<Self, SentinelError> {
        let registry = Self {
            endpoints: Arc::new(RwLock::new(Vec::new())),
            pool,
        };
        let diff = registry.replace(endpoints).await?;
        info!(endpoint_count = diff.added.len(), "Loaded monitored endpoints");
        Ok(registry)
    }

    /// 監視対象一覧を差し替える
    ///
    /// IDで突き合わせて名前とURLを更新する。一覧から外れたエンドポイントは
    /// 監視対象ではなくなるが、DB上の行と履歴は削除しない。
    /// DBへの同期に失敗した場合は差し替えず、現在の一覧を維持する。
    pub async fn replace(&self, endpoints: Vec<Endpoint>) -> Result<RegistryDiff, SentinelError> {
        let mut seen = HashSet::new();
        for endpoint in &endpoints {
            if !seen.insert(endpoint.id.as_str()) {
                return Err(ConfigError::DuplicateId(endpoint.id.clone()).into());
            }
        }

        for endpoint in &endpoints {
            db::upsert_endpoint(&self.pool, endpoint).await?;
        }

        let mut current = self.endpoints.write().await;
        let diff = diff_endpoints(&current, &endpoints);
        *current = endpoints;

        if !diff.is_empty() {
            info!(
                added = ?diff.added,
                updated = ?diff.updated,
                removed = ?diff.removed,
                "Endpoint registry updated"
            );
        }

        Ok(diff)
    }

    /// 現在の監視対象一覧（設定順）
    pub async fn list(&self) -> Vec<Endpoint> {
        self.endpoints.read().await.clone()
    }

    /// 監視中のエンドポイントを取得
    pub async fn get(&self, id: &str) -> Option<Endpoint> {
        self.endpoints
            .read()
            .await
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    /// 監視中または過去に監視していたエンドポイントを取得
    pub async fn find_known(&self, id: &str) -> Result<Option<Endpoint>, SentinelError> {
        if let Some(endpoint) = self.get(id).await {
            return Ok(Some(endpoint));
        }
        Ok(db::get_endpoint(&self.pool, id).await?)
    }

    /// 監視対象数
    pub async fn len(&self) -> usize {
        self.endpoints.read().await.len()
    }

}

fn diff_endpoints(current: &[Endpoint], next: &[Endpoint]) -> RegistryDiff {
    let mut diff = RegistryDiff::default();

    for endpoint in next {
        match current.iter().find(|e| e.id == endpoint.id) {
            None => diff.added.push(endpoint.id.clone()),
            Some(existing) if existing != endpoint => diff.updated.push(endpoint.id.clone()),
            Some(_) => {}
        }
    }
    for endpoint in current {
        if !next.iter().any(|e| e.id == endpoint.id) {
            diff.removed.push(endpoint.id.clone());
        }
    }

    diff
}
