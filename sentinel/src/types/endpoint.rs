//! 監視対象エンドポイント型定義

use serde::{Deserialize, Serialize};

/// 監視対象エンドポイント
///
/// `id` が同一性を表す。`name` と `url` は設定の再読み込みで変わり得るが、
/// `id` が変わることはない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// 安定ID
    pub id: String,
    /// 表示名
    pub name: String,
    /// プローブ先URL
    pub url: String,
}

impl Endpoint {
    /// 新しいエンドポイントを作成
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
        }
    }

    /// 表示名からIDを導出する
    ///
    /// 英数字以外は `-` にまとめ、小文字化する。
    /// 例: `"Main API (prod)"` → `"main-api-prod"`
    pub fn derive_id(name: &str) -> String {
        let mut id = String::with_capacity(name.len());
        let mut pending_dash = false;
        for ch in name.chars() {
            if ch.is_ascii_alphanumeric() {
                if pending_dash && !id.is_empty() {
                    id.push('-');
                }
                pending_dash = false;
                id.push(ch.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
        id
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}
