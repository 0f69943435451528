//! sentinel state and SSE client helpers

use std::sync::Arc;
use std::time::Duration;

use sentinel::config::MonitorSettings;
use sentinel::db::migrations::initialize_database;
use sentinel::registry::EndpointRegistry;
use sentinel::shutdown::ShutdownController;
use sentinel::types::Endpoint;
use sentinel::AppState;

/// インメモリDBで AppState を組み立てる
#[allow(dead_code)]
pub async fn app_state(endpoints: Vec<Endpoint>, settings: MonitorSettings) -> AppState {
    let pool = initialize_database("sqlite::memory:")
        .await
        .expect("Failed to initialize database");
    let registry = EndpointRegistry::load(pool.clone(), endpoints)
        .await
        .expect("Failed to load registry");
    AppState::new(registry, Arc::new(pool), settings, ShutdownController::default())
        .expect("Failed to build app state")
}

/// テスト向けの短いタイムアウト設定
#[allow(dead_code)]
pub fn fast_settings() -> MonitorSettings {
    MonitorSettings {
        probe_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

/// 誰もlistenしていないURL
#[allow(dead_code)]
pub fn refused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/", port)
}

/// 1つのSSEイベント
#[derive(Debug, Clone, PartialEq)]
pub struct SseFrame {
    /// `event:` 行（省略時は `None`）
    pub event: Option<String>,
    /// `data:` 行を連結したもの
    pub data: String,
}

/// SSEレスポンスを1イベントずつ読み出すクライアント
#[allow(dead_code)]
pub struct SseClient {
    response: reqwest::Response,
    buffer: String,
}

#[allow(dead_code)]
impl SseClient {
    /// 接続する（レスポンスヘッダー受信時点で購読は登録済み）
    pub async fn connect(url: &str) -> Self {
        let response = reqwest::get(url).await.expect("Failed to connect");
        assert!(response.status().is_success());
        Self {
            response,
            buffer: String::new(),
        }
    }

    /// レスポンスヘッダー
    pub fn headers(&self) -> &reqwest::header::HeaderMap {
        self.response.headers()
    }

    /// 次のイベントを待つ（コメント行のみのフレームは読み飛ばす）
    pub async fn next_frame(&mut self, timeout: Duration) -> Option<SseFrame> {
        tokio::time::timeout(timeout, async {
            loop {
                if let Some(pos) = self.buffer.find("\n\n") {
                    let raw: String = self.buffer.drain(..pos + 2).collect();
                    if let Some(frame) = parse_frame(&raw) {
                        return Some(frame);
                    }
                    continue;
                }
                match self.response.chunk().await {
                    Ok(Some(bytes)) => self.buffer.push_str(&String::from_utf8_lossy(&bytes)),
                    _ => return None,
                }
            }
        })
        .await
        .ok()
        .flatten()
    }
}

fn parse_frame(raw: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data = Vec::new();
    for line in raw.lines() {
        if let Some(value) = line.strip_prefix("event:") {
            event = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("data:") {
            data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
    }
    if event.is_none() && data.is_empty() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data.join("\n"),
    })
}
