//! ステータスモニター（スケジューラ）
//!
//! 1サイクル = 全エンドポイントのプローブ → 履歴への追記 → アップタイム再計算 → 配信。
//! サイクルは厳密に逐次実行され、前のサイクルが終わるまで次のtickを待たない。
//! 遅れたtickはまとめて実行せず後ろへずらす。

use crate::common::error::SentinelError;
use crate::config::MonitorSettings;
use crate::db::HistoryStore;
use crate::events::{BroadcastHub, HubEvent, PublishReport};
use crate::registry::EndpointRegistry;
use crate::shutdown::ShutdownController;
use crate::types::{Endpoint, SiteStatus, Snapshot};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::prober::Prober;
use super::uptime::UptimeCalculator;

/// 1サイクル分の実行結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// サイクル番号（1始まり）
    pub cycle: u64,
    /// プローブ対象数
    pub probed: usize,
    /// 履歴へ追記できた数
    pub recorded: usize,
    /// URL不正でプローブしなかった数
    pub skipped: usize,
    /// 追記に失敗した数
    pub persistence_failures: usize,
    /// 追記後の集計読み取りに失敗した数
    pub read_failures: usize,
    /// 配信結果（配信しなかった場合は `None`）
    pub delivery: Option<PublishReport>,
}

/// ステータスモニター
#[derive(Clone)]
pub struct StatusMonitor {
    registry: EndpointRegistry,
    store: Arc<dyn HistoryStore>,
    prober: Prober,
    hub: BroadcastHub,
    uptime: UptimeCalculator,
    check_interval: Duration,
    history_limit: u32,
    retention: Duration,
    shutdown: ShutdownController,
}

impl StatusMonitor {
    /// 新しいモニターを作成
    ///
    /// アップタイム計算にはスケジューラの実際のチェック間隔を渡す。
    pub fn new(
        registry: EndpointRegistry,
        store: Arc<dyn HistoryStore>,
        hub: BroadcastHub,
        settings: &MonitorSettings,
        shutdown: ShutdownController,
    ) -> Result<Self, SentinelError> {
        let prober = Prober::new(settings.probe_timeout)?;
        let uptime = UptimeCalculator::new(settings.uptime_window, settings.check_interval)?;

        Ok(Self {
            registry,
            store,
            prober,
            hub,
            uptime,
            check_interval: settings.check_interval,
            history_limit: settings.history_limit,
            retention: settings.retention,
            shutdown,
        })
    }

    /// バックグラウンドで監視を開始
    ///
    /// 最初のサイクルは即時に実行される。シャットダウン要求で停止する。
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.monitor_loop().await })
    }

    async fn monitor_loop(&self) {
        let mut timer = interval(self.check_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.check_interval.as_secs(),
            "Status monitor started"
        );

        let mut cycle: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.wait() => break,
                _ = timer.tick() => {}
            }

            cycle += 1;
            let report = self.run_cycle(cycle).await;
            if report.persistence_failures > 0 || report.read_failures > 0 {
                warn!(
                    cycle,
                    probed = report.probed,
                    recorded = report.recorded,
                    persistence_failures = report.persistence_failures,
                    read_failures = report.read_failures,
                    "Probe cycle completed with failures"
                );
            } else {
                debug!(
                    cycle,
                    probed = report.probed,
                    recorded = report.recorded,
                    skipped = report.skipped,
                    "Probe cycle completed"
                );
            }

            if let Err(e) = self.prune_expired(Utc::now()).await {
                error!("Failed to prune expired status records: {}", e);
            }
        }

        info!("Status monitor stopped");
    }

    /// 1サイクルを実行
    ///
    /// エンドポイントごとの失敗はそのエンドポイントの項目を省くだけで、
    /// サイクル自体は中断しない。
    pub async fn run_cycle(&self, cycle: u64) -> CycleReport {
        let endpoints = self.registry.list().await;
        let mut report = CycleReport {
            cycle,
            probed: endpoints.len(),
            ..Default::default()
        };

        let results = join_all(endpoints.iter().map(|endpoint| async move {
            (endpoint, self.prober.probe(endpoint).await)
        }))
        .await;

        let now = Utc::now();
        let mut snapshot = Snapshot::new(cycle);

        for (endpoint, result) in results {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!(endpoint_id = %endpoint.id, error = %e, "Skipping endpoint");
                    report.skipped += 1;
                    continue;
                }
            };

            if let Err(e) = self.store.append(&record).await {
                error!(endpoint_id = %endpoint.id, error = %e, "Failed to persist status record");
                report.persistence_failures += 1;
                continue;
            }
            report.recorded += 1;

            match self.site_status(endpoint, now).await {
                Ok(status) => snapshot.insert(status),
                Err(e) => {
                    error!(endpoint_id = %endpoint.id, error = %e, "Failed to read status history");
                    report.read_failures += 1;
                }
            }
        }

        // 全エンドポイントで書き込みか読み取りに失敗した場合は、空のスナップショットで
        // 直前の状態を上書きせずにサイクル失敗として通知する
        let failures = report.persistence_failures + report.read_failures;
        if snapshot.is_empty() && failures > 0 {
            let message = format!(
                "failed to persist status for all {} endpoints ({} writes, {} reads failed)",
                failures, report.persistence_failures, report.read_failures
            );
            report.delivery = Some(self.hub.publish(HubEvent::CycleFailed { cycle, message }));
            return report;
        }

        match serde_json::to_string(&snapshot) {
            Ok(json) => {
                let delivery = self.hub.publish(HubEvent::Snapshot {
                    cycle,
                    payload: Arc::from(json),
                });
                if delivery.dropped > 0 || delivery.closed > 0 {
                    debug!(
                        cycle,
                        delivered = delivery.delivered,
                        dropped = delivery.dropped,
                        closed = delivery.closed,
                        "Snapshot delivery incomplete"
                    );
                }
                report.delivery = Some(delivery);
            }
            Err(e) => error!(cycle, error = %e, "Failed to encode snapshot; skipping publish"),
        }

        report
    }

    async fn site_status(
        &self,
        endpoint: &Endpoint,
        now: DateTime<Utc>,
    ) -> Result<SiteStatus, sqlx::Error> {
        let recent_records = self.store.recent(&endpoint.id, self.history_limit).await?;
        let uptime = self
            .uptime
            .uptime(self.store.as_ref(), &endpoint.id, now)
            .await?;

        Ok(SiteStatus {
            endpoint: endpoint.clone(),
            recent_records,
            uptime: uptime.percentage(),
        })
    }

    /// 保持期間を過ぎた履歴を削除
    pub async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let cutoff = match chrono::Duration::from_std(self.retention)
            .ok()
            .and_then(|retention| now.checked_sub_signed(retention))
        {
            Some(cutoff) => cutoff,
            None => {
                debug!(
                    retention_secs = self.retention.as_secs(),
                    "Retention reaches beyond the representable time range; nothing to prune"
                );
                return Ok(0);
            }
        };
        let removed = self.store.prune_before(cutoff).await?;
        if removed > 0 {
            info!(removed, cutoff = %cutoff, "Pruned expired status records");
        }
        Ok(removed)
    }

    /// アップタイム計算機
    pub fn uptime_calculator(&self) -> &UptimeCalculator {
        &self.uptime
    }
}
