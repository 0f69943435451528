//! Configuration management
//!
//! Environment variable helpers (with fallback to legacy unprefixed names),
//! monitor settings, and the sites config file loader.

use crate::common::error::ConfigError;
use crate::events::BackpressurePolicy;
use crate::types::Endpoint;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// アップタイムウィンドウの上限（1年）
pub const MAX_UPTIME_WINDOW: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// 履歴保持期間の上限（10年）
pub const MAX_RETENTION: Duration = Duration::from_secs(3660 * 24 * 60 * 60);

/// Get an environment variable with fallback to a deprecated name
///
/// If the new variable name is set, returns its value.
/// If only the old (deprecated) variable name is set, returns its value
/// and logs a deprecation warning.
///
/// # Example
/// ```
/// use sentinel::config::get_env_with_fallback;
///
/// let port = get_env_with_fallback("SENTINEL_PORT", "PORT");
/// ```
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    if let Ok(val) = std::env::var(old_name) {
        tracing::warn!(
            "Environment variable '{}' is deprecated, use '{}' instead",
            old_name,
            new_name
        );
        return Some(val);
    }
    None
}

/// Get an environment variable with fallback, parsing to a specific type
///
/// Falls back to `default` when neither variable is set or parsing fails.
pub fn get_env_with_fallback_parse<T: std::str::FromStr>(
    new_name: &str,
    old_name: &str,
    default: T,
) -> T {
    get_env_with_fallback(new_name, old_name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// 監視エンジン設定
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    /// プローブサイクルの周期
    pub check_interval: Duration,
    /// 1リクエストあたりのタイムアウト
    pub probe_timeout: Duration,
    /// スナップショットに含める直近履歴の上限
    pub history_limit: u32,
    /// アップタイム評価ウィンドウ
    pub uptime_window: Duration,
    /// 履歴の保持期間
    pub retention: Duration,
    /// 購読者ごとの配信バッファ
    pub subscriber_buffer: usize,
    /// バッファが満杯の購読者の扱い
    pub backpressure: BackpressurePolicy,
    /// 設定ファイル変更イベントのまとめ待ち時間（`None` で監視しない）
    pub config_reload_debounce: Option<Duration>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(10),
            history_limit: 60,
            uptime_window: Duration::from_secs(24 * 60 * 60),
            retention: Duration::from_secs(30 * 24 * 60 * 60),
            subscriber_buffer: 16,
            backpressure: BackpressurePolicy::DropLatest,
            config_reload_debounce: Some(Duration::from_millis(250)),
        }
    }
}

impl MonitorSettings {
    /// 環境変数から読み込む
    ///
    /// 不正な値は `ConfigError::InvalidSetting` として返す（起動時に致命的）。
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let interval_secs = get_env_with_fallback_parse(
            "SENTINEL_CHECK_INTERVAL_SECS",
            "CHECK_INTERVAL",
            defaults.check_interval.as_secs(),
        );
        let timeout_secs = get_env_with_fallback_parse(
            "SENTINEL_PROBE_TIMEOUT_SECS",
            "PROBE_TIMEOUT",
            defaults.probe_timeout.as_secs(),
        );
        let history_limit = get_env_with_fallback_parse(
            "SENTINEL_HISTORY_LIMIT",
            "HISTORY_LIMIT",
            defaults.history_limit,
        );
        let window_hours = get_env_with_fallback_parse(
            "SENTINEL_UPTIME_WINDOW_HOURS",
            "UPTIME_WINDOW_HOURS",
            24u64,
        );
        let retention_days =
            get_env_with_fallback_parse("SENTINEL_RETENTION_DAYS", "RETENTION_DAYS", 30u64);
        let subscriber_buffer = get_env_with_fallback_parse(
            "SENTINEL_SUBSCRIBER_BUFFER",
            "SUBSCRIBER_BUFFER",
            defaults.subscriber_buffer,
        );
        let backpressure = match get_env_with_fallback(
            "SENTINEL_SLOW_SUBSCRIBER_POLICY",
            "SLOW_SUBSCRIBER_POLICY",
        ) {
            Some(value) => value.parse().map_err(ConfigError::InvalidSetting)?,
            None => defaults.backpressure,
        };
        let watch_config =
            get_env_with_fallback_parse("SENTINEL_CONFIG_WATCH", "CONFIG_WATCH", true);
        let debounce_ms = get_env_with_fallback_parse(
            "SENTINEL_CONFIG_DEBOUNCE_MS",
            "CONFIG_DEBOUNCE_MS",
            defaults
                .config_reload_debounce
                .map_or(250, |d| d.as_millis() as u64),
        );

        Self {
            check_interval: Duration::from_secs(interval_secs),
            probe_timeout: Duration::from_secs(timeout_secs),
            history_limit,
            uptime_window: scaled_duration("uptime window", window_hours, 60 * 60)?,
            retention: scaled_duration("retention", retention_days, 24 * 60 * 60)?,
            subscriber_buffer,
            backpressure,
            config_reload_debounce: watch_config.then(|| Duration::from_millis(debounce_ms)),
        }
        .validated()
    }

    /// 値の整合性を検証する
    ///
    /// 保持期間がアップタイムウィンドウより短い場合はウィンドウに合わせる。
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.check_interval.is_zero() {
            return Err(ConfigError::InvalidSetting(
                "check interval must be greater than zero".to_string(),
            ));
        }
        if self.probe_timeout.is_zero() {
            return Err(ConfigError::InvalidSetting(
                "probe timeout must be greater than zero".to_string(),
            ));
        }
        if self.history_limit == 0 {
            return Err(ConfigError::InvalidSetting(
                "history limit must be greater than zero".to_string(),
            ));
        }
        if self.subscriber_buffer == 0 {
            return Err(ConfigError::InvalidSetting(
                "subscriber buffer must be greater than zero".to_string(),
            ));
        }
        if self.uptime_window < self.check_interval {
            return Err(ConfigError::InvalidSetting(format!(
                "uptime window ({}s) is shorter than the check interval ({}s)",
                self.uptime_window.as_secs(),
                self.check_interval.as_secs()
            )));
        }
        if self.uptime_window > MAX_UPTIME_WINDOW {
            return Err(ConfigError::InvalidSetting(format!(
                "uptime window ({}s) exceeds the maximum of {}s",
                self.uptime_window.as_secs(),
                MAX_UPTIME_WINDOW.as_secs()
            )));
        }
        if self.retention > MAX_RETENTION {
            return Err(ConfigError::InvalidSetting(format!(
                "retention ({}s) exceeds the maximum of {}s",
                self.retention.as_secs(),
                MAX_RETENTION.as_secs()
            )));
        }
        if self.retention < self.uptime_window {
            tracing::warn!(
                retention_secs = self.retention.as_secs(),
                window_secs = self.uptime_window.as_secs(),
                "Retention is shorter than the uptime window; extending retention"
            );
            self.retention = self.uptime_window;
        }
        Ok(self)
    }
}

// 時間・日単位の設定値を秒に換算する（桁あふれは設定エラー）
fn scaled_duration(name: &str, value: u64, unit_secs: u64) -> Result<Duration, ConfigError> {
    value
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .ok_or_else(|| {
            ConfigError::InvalidSetting(format!("{} value {} is too large", name, value))
        })
}

/// 設定ファイル内のサイトエントリ
#[derive(Debug, Deserialize)]
struct SiteEntry {
    #[serde(default)]
    id: Option<String>,
    name: String,
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SitesFile {
    Wrapped { sites: Vec<SiteEntry> },
    Bare(Vec<SiteEntry>),
}

/// サイト設定JSONを解釈して監視対象一覧を返す
///
/// `{"sites": [...]}` 形式と配列のみの形式の両方を受け付ける。
/// `id` が省略されたエントリは `name` から導出する。
pub fn parse_sites(json: &str) -> Result<Vec<Endpoint>, ConfigError> {
    let entries = match serde_json::from_str::<SitesFile>(json)? {
        SitesFile::Wrapped { sites } => sites,
        SitesFile::Bare(sites) => sites,
    };

    if entries.is_empty() {
        return Err(ConfigError::Empty);
    }

    let mut seen = HashSet::with_capacity(entries.len());
    let mut endpoints = Vec::with_capacity(entries.len());

    for entry in entries {
        let id = match entry.id {
            Some(id) => id.trim().to_string(),
            None => Endpoint::derive_id(&entry.name),
        };
        if id.is_empty() {
            return Err(ConfigError::InvalidEndpoint {
                id: entry.name,
                reason: "id is empty and cannot be derived from the name".to_string(),
            });
        }
        let url = entry.url.trim().to_string();
        if url.is_empty() {
            return Err(ConfigError::InvalidEndpoint {
                id,
                reason: "url is empty".to_string(),
            });
        }
        if !seen.insert(id.clone()) {
            return Err(ConfigError::DuplicateId(id));
        }
        endpoints.push(Endpoint::new(id, entry.name.trim(), url));
    }

    Ok(endpoints)
}

/// サイト設定ファイルを読み込む
pub fn load_sites(path: &Path) -> Result<Vec<Endpoint>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_sites(&content)
}
