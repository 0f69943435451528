//! アップタイム計算
//!
//! 直近ウィンドウ内の到達可能サンプル数を、想定サンプル数
//! （ウィンドウ ÷ 実際のチェック間隔）で割って稼働率を求める。

use crate::common::error::ConfigError;
use crate::db::HistoryStore;
use crate::types::UptimeWindow;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::warn;

/// デフォルトの評価ウィンドウ（時間）
pub const DEFAULT_UPTIME_WINDOW_HOURS: u64 = 24;

/// アップタイム計算機
#[derive(Debug, Clone, Copy)]
pub struct UptimeCalculator {
    window: Duration,
    span: chrono::Duration,
    expected_interval: Duration,
}

impl UptimeCalculator {
    /// 評価ウィンドウとスケジューラの実際のチェック間隔から作成
    ///
    /// 間隔が0、またはウィンドウより長い場合は想定サンプル数が定まらないため拒否する。
    pub fn new(window: Duration, expected_interval: Duration) -> Result<Self, ConfigError> {
        if expected_interval.is_zero() {
            return Err(ConfigError::InvalidSetting(
                "uptime expected interval must be greater than zero".to_string(),
            ));
        }
        if expected_interval > window {
            return Err(ConfigError::InvalidSetting(format!(
                "check interval ({}s) must not exceed the uptime window ({}s)",
                expected_interval.as_secs(),
                window.as_secs()
            )));
        }
        let span = chrono::Duration::from_std(window).map_err(|_| {
            ConfigError::InvalidSetting(format!(
                "uptime window ({}s) is out of range",
                window.as_secs()
            ))
        })?;
        Ok(Self {
            window,
            span,
            expected_interval,
        })
    }

    /// 評価ウィンドウ
    pub fn window(&self) -> Duration {
        self.window
    }

    /// 想定サンプリング間隔
    pub fn expected_interval(&self) -> Duration {
        self.expected_interval
    }

    /// ウィンドウ内の想定サンプル数（1以上）
    pub fn expected_samples(&self) -> u64 {
        let samples = self.window.as_millis() / self.expected_interval.as_millis().max(1);
        (samples as u64).max(1)
    }

    /// 到達可能サンプル数から稼働率 (0.0-1.0) を求める
    ///
    /// 想定より多く記録されている場合（間隔の設定不一致）は警告して1.0に丸める。
    pub fn ratio_from_count(&self, reachable_samples: u64) -> f64 {
        let expected = self.expected_samples();
        let raw = reachable_samples as f64 / expected as f64;
        if raw > 1.0 {
            warn!(
                reachable_samples,
                expected_samples = expected,
                interval_secs = self.expected_interval.as_secs(),
                "Uptime ratio exceeds 1.0; check interval does not match recorded history"
            );
        }
        raw.clamp(0.0, 1.0)
    }

    /// 履歴ストアからエンドポイントの稼働率を算出
    pub async fn uptime(
        &self,
        store: &dyn HistoryStore,
        endpoint_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UptimeWindow, sqlx::Error> {
        // ウィンドウが記録可能な時刻範囲を越える場合は全履歴が対象
        let since = now
            .checked_sub_signed(self.span)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let reachable_samples = store.count_since(endpoint_id, since, Some(true)).await?;

        Ok(UptimeWindow {
            endpoint_id: endpoint_id.to_string(),
            window_seconds: self.window.as_secs(),
            expected_interval_seconds: self.expected_interval.as_secs(),
            reachable_samples,
            expected_samples: self.expected_samples(),
            ratio: self.ratio_from_count(reachable_samples),
        })
    }
}
