//! データベースアクセス層
//!
//! SQLiteベースのデータ永続化

/// データベースマイグレーション
pub mod migrations;

/// 監視対象エンドポイント
pub mod endpoints;

/// ステータス履歴
pub mod status_records;

/// Repository traitパターン（テスタビリティ向上）
pub mod traits;

pub use traits::HistoryStore;

use chrono::{DateTime, SecondsFormat, Utc};

/// DB保存用の時刻表現
///
/// 固定幅（マイクロ秒・`Z` 表記）のため、文字列比較がそのまま時刻順になる。
pub(crate) fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// DB保存値から時刻を復元
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
