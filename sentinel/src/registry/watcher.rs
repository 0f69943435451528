//! サイト設定ファイルの監視
//!
//! `notify` でファイルシステムイベントを受け取り、イベントが一定時間途切れてから
//! 設定を読み直してレジストリを差し替える。
//! 再読み込みに失敗した場合は警告を出して現在の一覧を維持する。

use super::endpoints::{EndpointRegistry, RegistryDiff};
use crate::common::error::{ConfigError, SentinelError};
use crate::config::load_sites;
use crate::shutdown::ShutdownController;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 設定ファイルウォッチャー
pub struct ConfigWatcher {
    path: PathBuf,
    registry: EndpointRegistry,
    debounce: Duration,
    shutdown: ShutdownController,
}

impl ConfigWatcher {
    /// ウォッチャーを作成
    ///
    /// `debounce` の間イベントが来なくなってから読み込む（保存途中の内容を読まないため）。
    pub fn new(
        path: impl Into<PathBuf>,
        registry: EndpointRegistry,
        debounce: Duration,
        shutdown: ShutdownController,
    ) -> Self {
        Self {
            path: path.into(),
            registry,
            debounce,
            shutdown,
        }
    }

    /// 監視を開始
    ///
    /// エディタの置き換え保存（別名で書いてrename）も拾えるよう、親ディレクトリを
    /// 監視して対象ファイル名のイベントだけを通す。
    pub fn start(self) -> Result<JoinHandle<()>, SentinelError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = watch_file(&self.path, tx)?;

        info!(
            path = %self.path.display(),
            debounce_ms = self.debounce.as_millis() as u64,
            "Config watcher started"
        );

        Ok(tokio::spawn(async move {
            // OSのウォッチはタスクが終わるまで保持する
            let _watcher = watcher;
            self.run(rx).await;
            debug!("Config watcher stopped");
        }))
    }

    async fn run(&self, mut events: mpsc::UnboundedReceiver<()>) {
        let shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => return,
                event = events.recv() => {
                    if event.is_none() {
                        return;
                    }
                }
            }

            if !settle(&mut events, self.debounce).await {
                return;
            }
            self.reload().await;
        }
    }

    /// 設定ファイルを読み直してレジストリを差し替える
    ///
    /// 失敗した場合は警告を出して `None` を返し、現在の一覧はそのまま残る。
    pub async fn reload(&self) -> Option<RegistryDiff> {
        match self.try_reload().await {
            Ok(diff) => {
                info!(
                    path = %self.path.display(),
                    added = diff.added.len(),
                    updated = diff.updated.len(),
                    removed = diff.removed.len(),
                    "Config reloaded"
                );
                Some(diff)
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to reload config; keeping current sites"
                );
                None
            }
        }
    }

    async fn try_reload(&self) -> Result<RegistryDiff, SentinelError> {
        let endpoints = load_sites(&self.path)?;
        self.registry.replace(endpoints).await
    }
}

// イベントが `quiet` の間途切れるまで読み捨てる。チャネルが閉じたら false。
async fn settle(events: &mut mpsc::UnboundedReceiver<()>, quiet: Duration) -> bool {
    loop {
        match tokio::time::timeout(quiet, events.recv()).await {
            Ok(Some(())) => continue,
            Ok(None) => return false,
            Err(_) => return true,
        }
    }
}

fn watch_file(
    path: &Path,
    tx: mpsc::UnboundedSender<()>,
) -> Result<RecommendedWatcher, SentinelError> {
    let watch_error = |reason: String| {
        SentinelError::Config(ConfigError::Watch {
            path: path.to_path_buf(),
            reason,
        })
    };

    let file_name: OsString = path
        .file_name()
        .map(OsStr::to_os_string)
        .ok_or_else(|| watch_error("path has no file name".to_string()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if touches_file(&event, &file_name) {
                    // 受信側が閉じていればタスクは終了済み
                    let _ = tx.send(());
                }
            }
            Err(e) => warn!(error = %e, "Config watch error"),
        },
        Config::default(),
    )
    .map_err(|e| watch_error(e.to_string()))?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| watch_error(e.to_string()))?;

    Ok(watcher)
}

fn touches_file(event: &Event, file_name: &OsStr) -> bool {
    !matches!(event.kind, EventKind::Access(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name))
}
