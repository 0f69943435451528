//! ヘルスチェックモニター
//!
//! 定期的にエンドポイントの稼働状況をプローブし、履歴とアップタイムを
//! まとめたスナップショットを購読者へ配信する。

pub mod monitor;
pub mod prober;
pub mod uptime;

pub use monitor::{CycleReport, StatusMonitor};
pub use prober::Prober;
pub use uptime::UptimeCalculator;
