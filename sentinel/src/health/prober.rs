//! プローバー
//!
//! エンドポイント1件に対して1回のGETを行い、観測結果を1件作る。
//! 通信失敗（DNS・接続拒否・タイムアウト）はエラーではなく到達不能の観測として返す。

use crate::common::error::{ProbeError, SentinelError};
use crate::types::{Endpoint, StatusRecord};
use reqwest::{Client, Url};
use std::time::{Duration, Instant};
use tracing::debug;

/// デフォルトのプローブタイムアウト（秒）
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// HTTPプローバー
///
/// 内部の `reqwest::Client` はコネクションプールを共有するため、クローンは安価。
#[derive(Clone, Debug)]
pub struct Prober {
    client: Client,
    timeout: Duration,
}

impl Prober {
    /// タイムアウトを指定してプローバーを作成
    pub fn new(timeout: Duration) -> Result<Self, SentinelError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sentinel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SentinelError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// エンドポイントをプローブする
    ///
    /// 応答を受け取れた場合は2xxなら到達可能とし、`"<code> <reason>"` を記録する。
    /// `Err` を返すのはURLがプローブ不能な場合のみ。
    pub async fn probe(&self, endpoint: &Endpoint) -> Result<StatusRecord, ProbeError> {
        let url = parse_probe_url(&endpoint.url)?;

        let start = Instant::now();
        let record = match self.client.get(url).send().await {
            Ok(response) => {
                let latency_ms = start.elapsed().as_millis() as u64;
                let status = response.status();
                StatusRecord::responded(
                    &endpoint.id,
                    status.is_success(),
                    status_line(status),
                    latency_ms,
                )
            }
            Err(e) => StatusRecord::unreachable(&endpoint.id, describe_failure(&e, self.timeout)),
        };

        debug!(
            endpoint_id = %endpoint.id,
            reachable = record.reachable,
            latency_ms = record.latency_ms,
            message = %record.message,
            "Probe completed"
        );

        Ok(record)
    }
}

/// プローブ可能なURLか検証する
pub fn parse_probe_url(raw: &str) -> Result<Url, ProbeError> {
    let url = Url::parse(raw).map_err(|e| ProbeError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ProbeError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

fn status_line(status: reqwest::StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

fn describe_failure(err: &reqwest::Error, timeout: Duration) -> String {
    if err.is_timeout() {
        format!("request timed out after {}ms", timeout.as_millis())
    } else if err.is_connect() {
        format!("connection failed: {}", root_cause(err))
    } else {
        root_cause(err)
    }
}

// reqwest のトップレベルメッセージはURLしか含まないため、最も内側の原因を使う
fn root_cause(err: &(dyn std::error::Error + 'static)) -> String {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}
