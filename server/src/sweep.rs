//! Background sweep task.

use reclaim_core::{TrashError, TrashService};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Ticks every `interval` and sweeps when the ledger says one is due, so a
/// restart does not sweep twice in a row.
pub fn spawn_sweeper(trash: Arc<TrashService>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let trash = trash.clone();
            let result = tokio::task::spawn_blocking(move || {
                if trash.should_sweep()? {
                    trash.sweep().map(Some)
                } else {
                    Ok::<_, TrashError>(None)
                }
            })
            .await;

            match result {
                Ok(Ok(Some(outcome))) if outcome.failed > 0 => {
                    tracing::warn!(
                        rolled_forward = outcome.rolled_forward,
                        failed = outcome.failed,
                        "sweep left operations unsettled"
                    );
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "sweep failed"),
                Err(e) => tracing::error!(error = %e, "sweep task panicked"),
            }
        }
    })
}
