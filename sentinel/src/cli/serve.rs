//! serve サブコマンド
//!
//! 監視エンジンとステータスサーバーを起動します。

use crate::config::{load_sites, MonitorSettings};
use crate::db::migrations::initialize_database;
use crate::registry::{ConfigWatcher, EndpointRegistry};
use crate::shutdown::ShutdownController;
use crate::AppState;
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// serve サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Listen port
    #[arg(short, long, default_value = "8080", env = "SENTINEL_PORT")]
    pub port: u16,

    /// Bind address
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "SENTINEL_HOST")]
    pub host: String,

    /// Sites config file
    #[arg(short, long, default_value = "config.json", env = "SENTINEL_CONFIG")]
    pub config: PathBuf,

    /// Database URL
    #[arg(
        long,
        default_value = "sqlite:data/sentinel.db",
        env = "SENTINEL_DATABASE_URL"
    )]
    pub database_url: String,
}

impl ServeArgs {
    /// `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Execute the serve command
///
/// 設定の読み込みに失敗した場合はサーバーを起動せずにエラーを返す。
pub async fn execute(args: &ServeArgs) -> Result<(), anyhow::Error> {
    let settings = MonitorSettings::from_env().context("Invalid monitor settings")?;
    let endpoints = load_sites(&args.config)
        .with_context(|| format!("Failed to load sites from {}", args.config.display()))?;

    info!(
        sites = endpoints.len(),
        interval_secs = settings.check_interval.as_secs(),
        policy = %settings.backpressure,
        "Starting sentinel"
    );

    let pool = initialize_database(&args.database_url).await?;
    let registry = EndpointRegistry::load(pool.clone(), endpoints).await?;

    let shutdown = ShutdownController::default();
    let state = AppState::new(
        registry.clone(),
        Arc::new(pool),
        settings.clone(),
        shutdown.clone(),
    )?;

    let monitor = state.monitor()?.start();
    let watcher = match settings.config_reload_debounce {
        Some(debounce) => {
            match ConfigWatcher::new(args.config.clone(), registry, debounce, shutdown.clone())
                .start()
            {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!("Config reload disabled: {}", e);
                    None
                }
            }
        }
        None => None,
    };

    let result = crate::server::run(state, &args.bind_addr()).await;

    // サーバーがどの経路で終わってもバックグラウンドタスクを止める
    shutdown.request_shutdown();
    if let Err(e) = monitor.await {
        error!("Status monitor task failed: {}", e);
    }
    if let Some(watcher) = watcher {
        if let Err(e) = watcher.await {
            error!("Config watcher task failed: {}", e);
        }
    }

    result?;
    Ok(())
}
