//! ステータス記録とアップタイム型定義

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 1回のプローブで得られた観測結果
///
/// プローブ1回につきエンドポイントごとに1件だけ作成され、作成後は変更されない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// レコードID（UUID v4）
    pub id: String,
    /// 対象エンドポイントID
    pub endpoint_id: String,
    /// 観測時刻
    pub observed_at: DateTime<Utc>,
    /// 到達可能だったか
    pub reachable: bool,
    /// ステータス行（例: `200 OK`）または失敗理由
    pub message: String,
    /// 応答までの経過時間（ミリ秒）。通信失敗時は0
    pub latency_ms: u64,
}

impl StatusRecord {
    /// 応答を受け取れた観測を作成
    pub fn responded(
        endpoint_id: impl Into<String>,
        reachable: bool,
        message: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            endpoint_id: endpoint_id.into(),
            observed_at: Utc::now(),
            reachable,
            message: message.into(),
            latency_ms,
        }
    }

    /// 通信自体に失敗した観測を作成（DNS・接続・タイムアウト）
    pub fn unreachable(endpoint_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::responded(endpoint_id, false, message, 0)
    }

    /// 観測時刻を差し替える（履歴の再構築・テスト用）
    pub fn observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }
}

/// アップタイム算出結果
///
/// 保存はされず、履歴ストアから都度計算される。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UptimeWindow {
    /// 対象エンドポイントID
    pub endpoint_id: String,
    /// 評価ウィンドウ（秒）
    pub window_seconds: u64,
    /// 想定サンプリング間隔（秒）
    pub expected_interval_seconds: u64,
    /// ウィンドウ内の到達可能サンプル数
    pub reachable_samples: u64,
    /// ウィンドウ内の想定サンプル数
    pub expected_samples: u64,
    /// 稼働率 (0.0-1.0)
    pub ratio: f64,
}

impl UptimeWindow {
    /// 稼働率をパーセンテージ (0.0-100.0) で返す
    pub fn percentage(&self) -> f64 {
        self.ratio * 100.0
    }
}
