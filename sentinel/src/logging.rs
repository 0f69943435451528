//! ロギング初期化
//!
//! 標準出力へのfmtレイヤーと、`SENTINEL_LOG_DIR` 指定時の日次ローテーションファイルを
//! `tracing-subscriber` のレジストリに重ねる。

use crate::config::get_env_with_fallback;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// ログファイル名の接頭辞
const LOG_FILE_PREFIX: &str = "sentinel.log";

/// ログ出力設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// フィルタ指定（`EnvFilter` 構文）
    pub filter: String,
    /// ファイル出力先ディレクトリ
    pub directory: Option<PathBuf>,
}

impl LogConfig {
    /// 環境変数から読み込む
    ///
    /// `SENTINEL_LOG_LEVEL` がなければ `RUST_LOG`、どちらもなければ `info`。
    pub fn from_env() -> Self {
        Self {
            filter: std::env::var("SENTINEL_LOG_LEVEL")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),
            directory: get_env_with_fallback("SENTINEL_LOG_DIR", "LOG_DIR").map(PathBuf::from),
        }
    }
}

/// グローバルsubscriberを初期化
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_with(LogConfig::from_env())
}

/// 設定を指定してグローバルsubscriberを初期化
pub fn init_with(config: LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_new(&config.filter).or_else(|_| EnvFilter::try_new("info"))?;

    let stdout_layer = fmt::layer().with_target(true).boxed();

    let file_layer = match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            Some(fmt::layer().with_ansi(false).with_writer(appender).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}
