//! 監視対象サイトの登録管理
//!
//! サイト一覧をメモリ内で管理し、SQLiteと同期する。
//! 設定ファイルの変更は `watcher` が検知して差し替える。

pub mod endpoints;
pub mod watcher;

pub use endpoints::{EndpointRegistry, RegistryDiff};
pub use watcher::ConfigWatcher;
