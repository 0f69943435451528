//! 型定義モジュール
//!
//! 監視エンジンが扱うドメイン型（監視対象・ステータス記録・スナップショット）

/// 監視対象エンドポイントの型定義
pub mod endpoint;

/// ステータス記録（1回のプローブ結果）
pub mod status;

/// 購読者へ配信するスナップショット
pub mod snapshot;

pub use endpoint::Endpoint;
pub use snapshot::{SiteStatus, Snapshot};
pub use status::{StatusRecord, UptimeWindow};
