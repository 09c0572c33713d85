use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::analytics::SummaryRefresher;

/// 等待 Ctrl+C，然后在超时内排空摘要刷新队列
pub async fn listen_for_shutdown(refresher: Arc<SummaryRefresher>, shutdown_timeout_secs: u64) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, draining summary refresh queue...");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }

    drain(&refresher, shutdown_timeout_secs).await;
}

/// 停止刷新池；超时后放弃剩余任务
pub async fn drain(refresher: &SummaryRefresher, shutdown_timeout_secs: u64) {
    let shutdown_result = timeout(
        Duration::from_secs(shutdown_timeout_secs),
        refresher.shutdown(),
    )
    .await;

    match shutdown_result {
        Ok(()) => {
            info!("All shutdown tasks completed successfully");
        }
        Err(_) => {
            error!(
                "Shutdown tasks timed out after {} seconds, pending summary refreshes dropped",
                shutdown_timeout_secs
            );
        }
    }
}
