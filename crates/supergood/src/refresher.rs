//! Background policy refresher: periodic `/v2/config` fetch and replace.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::SupergoodError;
use crate::service::ServiceCore;

/// Handle to the refresher task.
pub(crate) struct RefresherHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl RefresherHandle {
    /// Signals the refresher to stop and waits for it to finish.
    pub async fn close(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.task.await;
    }
}

/// Spawns the refresh loop. A failed fetch keeps the prior snapshot and is
/// retried on the next tick.
pub(crate) fn spawn(core: Arc<ServiceCore>) -> RefresherHandle {
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
    let interval = core.options.remote_config_fetch_interval;
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::debug!("config refresher stopping");
                    return;
                }
                _ = tokio::time::sleep(interval) => {
                    if let Err(error) = refresh(&core).await {
                        core.handle_error(error);
                    }
                }
            }
        }
    });
    RefresherHandle { shutdown_tx, task }
}

/// One fetch-and-replace pass.
pub(crate) async fn refresh(core: &Arc<ServiceCore>) -> Result<(), SupergoodError> {
    let response = core.api.fetch_config().await?;
    core.cache.replace(&response)?;
    tracing::debug!("policy cache refreshed");
    Ok(())
}
