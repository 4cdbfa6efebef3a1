//! Background flusher: drains completed events, redacts them, uploads.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use supergood_core::redact::redact_events;

use crate::api::Telemetry;
use crate::error::SupergoodError;
use crate::service::ServiceCore;

/// Acknowledgment channel for a shutdown drain.
type CloseAck = oneshot::Sender<Result<(), SupergoodError>>;

/// Handle to the flusher task.
pub(crate) struct FlusherHandle {
    close_tx: mpsc::Sender<CloseAck>,
    task: JoinHandle<()>,
}

impl FlusherHandle {
    /// Asks the flusher to force-flush and stop, returning the final flush
    /// result.
    pub async fn close(self) -> Result<(), SupergoodError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.close_tx.send(ack_tx).await.is_err() {
            return Ok(());
        }
        let result = ack_rx.await.unwrap_or(Ok(()));
        let _ = self.task.await;
        result
    }
}

/// Spawns the flusher loop.
pub(crate) fn spawn(core: Arc<ServiceCore>) -> FlusherHandle {
    let (close_tx, mut close_rx) = mpsc::channel::<CloseAck>(1);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(core.options.flush_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of an interval fires immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                ack = close_rx.recv() => {
                    let result = flush(&core, true).await;
                    if let Err(error) = &result {
                        tracing::error!(error = %error, "final flush failed");
                    }
                    if let Some(ack) = ack {
                        let _ = ack.send(result);
                    }
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(error) = flush(&core, false).await {
                        core.handle_error(error);
                    }
                }
            }
        }
    });
    FlusherHandle { close_tx, task }
}

/// One flush pass: drain, redact, report telemetry, upload.
///
/// The queue lock is released before redaction and upload; an empty batch
/// makes no network call. Failed batches are dropped, not requeued.
pub(crate) async fn flush(core: &Arc<ServiceCore>, force: bool) -> Result<(), SupergoodError> {
    let queued = core.queue.len();
    let mut batch = core.queue.drain(force);
    if batch.is_empty() {
        return Ok(());
    }

    for error in redact_events(&mut batch, &core.cache) {
        core.handle_error(SupergoodError::Redaction(error));
    }

    let telemetry = Telemetry {
        cache_key_count: queued,
        service_name: core.options.service_name.clone(),
    };
    if let Err(error) = core.api.post_telemetry(&telemetry).await {
        core.handle_error(error);
    }

    tracing::debug!(events = batch.len(), force, "flushing events");
    core.api.post_events(&batch).await
}
