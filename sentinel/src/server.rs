//! axumサーバー起動・シャットダウンハンドリング

use crate::common::error::SentinelError;
use crate::shutdown::ShutdownController;
use crate::AppState;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// アドレスにバインドしてサーバーを起動し、シャットダウンまで待機する
pub async fn run(state: AppState, bind_addr: &str) -> Result<(), SentinelError> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| SentinelError::Server(format!("Failed to bind to {}: {}", bind_addr, e)))?;

    info!("sentinel listening on {}", bind_addr);

    serve(state, listener).await
}

/// バインド済みリスナーでサーバーを起動する
///
/// シグナル受信時はシャットダウンコントローラーを発火させてからハブを閉じる。
/// ハブを閉じるとSSEセッションが終了するため、接続の排出が完了する。
pub async fn serve(state: AppState, listener: TcpListener) -> Result<(), SentinelError> {
    let shutdown = state.shutdown.clone();
    let hub = state.hub.clone();

    let app = crate::api::create_app(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal(shutdown.clone()).await;
            shutdown.request_shutdown();
            hub.close();
        })
        .await
        .map_err(|e| SentinelError::Server(e.to_string()))?;

    info!("Server shutdown complete");
    Ok(())
}

/// シャットダウンシグナルを待機
async fn shutdown_signal(shutdown: ShutdownController) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = shutdown.wait() => {
            info!("Shutdown requested, shutting down...");
        }
    }
}
