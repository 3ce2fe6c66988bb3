//! ReconcileLoop - 結果照合の定期実行
//!
//! - 一定間隔で `QueueCoordinator::process_results()` を呼ぶ
//! - 1 回分のエラーはログに残してループは続行する
//! - `shutdown_tx` に true を送ると次の待機で抜ける

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::coordinator::QueueCoordinator;

/// Handle of a running reconcile loop.
pub struct ReconcileLoop {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ReconcileLoop {
    /// Spawn the loop. The first pass runs immediately.
    pub fn spawn(coordinator: Arc<QueueCoordinator>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(async move {
            run(coordinator, interval, &mut shutdown_rx).await;
        });
        Self { shutdown_tx, join }
    }

    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(e) = self.join.await {
            warn!(error = %e, "reconcile loop ended abnormally");
        }
    }
}

async fn run(
    coordinator: Arc<QueueCoordinator>,
    interval: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval_secs = interval.as_secs(), "reconcile loop started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                // sender dropped: nobody can stop us any more, so stop now
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        match coordinator.process_results().await {
            Ok(applied) => debug!(applied, "reconcile tick"),
            Err(e) => warn!(error = %e, "reconcile tick failed"),
        }
    }

    info!("reconcile loop stopped");
}
