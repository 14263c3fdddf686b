use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::services::user_sessions;

pub(crate) async fn run(state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handles = vec![tokio::spawn(session_cleanup_loop(state.clone(), shutdown_rx))];

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }

    Ok(())
}

async fn session_cleanup_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let session = state.settings().session();
    let days = session.cleanup_days;
    let mut tick = interval(Duration::from_secs(session.cleanup_interval_seconds.max(1)));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(days, every_seconds = session.cleanup_interval_seconds, "Session cleanup scheduled");

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) =
                    user_sessions::cleanup_expired(state.db(), days, primitive_now_utc()).await
                {
                    tracing::error!(error = %err, "cleanup_expired failed");
                }
            }
        }
    }
}
