//! 購読者へ配信するスナップショット型定義

use super::{Endpoint, StatusRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 1エンドポイント分の集約ビュー
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteStatus {
    /// 監視対象
    pub endpoint: Endpoint,
    /// 直近の観測（新しい順、履歴上限以下）
    pub recent_records: Vec<StatusRecord>,
    /// 稼働率（パーセンテージ 0.0-100.0）
    pub uptime: f64,
}

/// 1サイクル分の集約スナップショット
///
/// サイクルごとに新しく構築され、購読者には不変の値として渡される。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// 生成元サイクル番号
    pub cycle: u64,
    /// 生成時刻
    pub generated_at: DateTime<Utc>,
    /// エンドポイントID → 集約ビュー
    pub sites: BTreeMap<String, SiteStatus>,
}

impl Snapshot {
    /// 空のスナップショットを作成
    pub fn new(cycle: u64) -> Self {
        Self {
            cycle,
            generated_at: Utc::now(),
            sites: BTreeMap::new(),
        }
    }

    /// エンドポイントの集約ビューを追加
    pub fn insert(&mut self, status: SiteStatus) {
        self.sites.insert(status.endpoint.id.clone(), status);
    }

    /// 含まれるエンドポイント数
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}
