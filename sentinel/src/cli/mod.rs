//! CLI module for sentinel
//!
//! `serve` runs the monitor and HTTP server, `check` probes every site once.

pub mod check;
pub mod serve;

use clap::{Parser, Subcommand};

/// sentinel - lightweight uptime monitor with live status streaming
#[derive(Parser, Debug)]
#[command(name = "sentinel")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    SENTINEL_HOST                    Bind address (default: 0.0.0.0)
    SENTINEL_PORT                    Listen port (default: 8080)
    SENTINEL_CONFIG                  Sites config file (default: config.json)
    SENTINEL_DATABASE_URL            Database URL (default: sqlite:data/sentinel.db)
    SENTINEL_CHECK_INTERVAL_SECS     Probe cycle period (default: 30)
    SENTINEL_PROBE_TIMEOUT_SECS      Per-request timeout (default: 10)
    SENTINEL_HISTORY_LIMIT           Records per site in snapshots (default: 60)
    SENTINEL_UPTIME_WINDOW_HOURS     Uptime window (default: 24)
    SENTINEL_RETENTION_DAYS          History retention (default: 30)
    SENTINEL_SUBSCRIBER_BUFFER       Per-subscriber buffer (default: 16)
    SENTINEL_SLOW_SUBSCRIBER_POLICY  drop | disconnect (default: drop)
    SENTINEL_CONFIG_WATCH            Reload sites on config change (default: true)
    SENTINEL_CONFIG_DEBOUNCE_MS      Quiet time before reloading (default: 250)
    SENTINEL_LOG_LEVEL               Log filter (default: info)
    SENTINEL_LOG_DIR                 Daily rolling log directory (optional)
"#)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the monitor and the status server
    Serve(serve::ServeArgs),
    /// Probe every configured site once and print the result
    Check(check::CheckArgs),
}
