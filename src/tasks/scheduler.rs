use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

use crate::core::state::AppState;
use crate::repositories;
use crate::services::notifier::Notifier;
use crate::tasks::outbox;

pub(crate) async fn run(state: AppState) -> Result<()> {
    let notifier = Notifier::from_settings(state.settings())?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(outbox_worker(state.clone(), notifier, shutdown_rx));

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    if let Err(err) = handle.await {
        tracing::error!(error = %err, "Background task join failed");
    }

    Ok(())
}

async fn outbox_worker(state: AppState, notifier: Notifier, mut shutdown: watch::Receiver<bool>) {
    let poll_interval = Duration::from_secs(state.settings().notify().outbox_poll_interval_seconds);

    loop {
        if *shutdown.borrow() {
            break;
        }

        match outbox::deliver_once(&state, &notifier).await {
            // A claimed message means more may be due; keep draining.
            Ok(true) => continue,
            Ok(false) => match repositories::outbox::count_pending(state.db()).await {
                Ok(pending) => metrics::gauge!("outbox_pending").set(pending as f64),
                Err(err) => {
                    tracing::warn!(error = %err, "Failed to count pending outbox messages");
                }
            },
            Err(err) => tracing::error!(error = %err, "Outbox delivery pass failed"),
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep(poll_interval) => {}
        }
    }
}
