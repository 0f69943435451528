//! sentinel uptime monitor
//!
//! 監視対象サイトを定期的にプローブし、到達可否と応答時間の履歴を保存して、
//! 接続中の購読者へライブでステータスを配信するサーバー。

#![warn(missing_docs)]

/// 共通定義（エラー型）
pub mod common;

/// REST / SSE APIハンドラー
pub mod api;

/// ヘルスチェック監視（プローバー・アップタイム・スケジューラ）
pub mod health;

/// 監視対象サイトの登録管理
pub mod registry;

/// データベースアクセス
pub mod db;

/// ロギング初期化ユーティリティ
pub mod logging;

/// 設定管理（環境変数ヘルパー・サイト設定ファイル）
pub mod config;

/// CLIインターフェース
pub mod cli;

/// ブロードキャストハブ
pub mod events;

/// 型定義
pub mod types;

/// Cooperative shutdown controller
pub mod shutdown;

/// axumサーバー起動・シャットダウン
pub mod server;

use std::sync::Arc;

/// アプリケーション状態
///
/// ハンドラーからは読み取り専用。書き込みはスケジューラのみが行う。
#[derive(Clone)]
pub struct AppState {
    /// エンドポイントレジストリ
    pub registry: registry::EndpointRegistry,
    /// ステータス履歴ストア
    pub store: Arc<dyn db::HistoryStore>,
    /// スナップショット配信ハブ
    pub hub: events::BroadcastHub,
    /// アップタイム計算機（スケジューラと同じ間隔）
    pub uptime: health::UptimeCalculator,
    /// 監視設定
    pub settings: config::MonitorSettings,
    /// Cooperative shutdown controller
    pub shutdown: shutdown::ShutdownController,
}

impl AppState {
    /// 監視設定からアプリケーション状態を組み立てる
    pub fn new(
        registry: registry::EndpointRegistry,
        store: Arc<dyn db::HistoryStore>,
        settings: config::MonitorSettings,
        shutdown: shutdown::ShutdownController,
    ) -> Result<Self, common::SentinelError> {
        let uptime =
            health::UptimeCalculator::new(settings.uptime_window, settings.check_interval)?;
        let hub =
            events::BroadcastHub::with_config(settings.subscriber_buffer, settings.backpressure);

        Ok(Self {
            registry,
            store,
            hub,
            uptime,
            settings,
            shutdown,
        })
    }

    /// 同じ状態を共有するスケジューラを作成
    pub fn monitor(&self) -> Result<health::StatusMonitor, common::SentinelError> {
        health::StatusMonitor::new(
            self.registry.clone(),
            self.store.clone(),
            self.hub.clone(),
            &self.settings,
            self.shutdown.clone(),
        )
    }
}
