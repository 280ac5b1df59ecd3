use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;

/// Spawn a background task that purges expired rooms on a fixed interval
pub fn spawn_room_sweeper(state: Arc<AppState>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            // First tick fires immediately, so startup gets a purge too
            ticker.tick().await;

            let purged = state.purge_expired().await;
            if purged > 0 {
                tracing::debug!("Sweeper removed {} rooms", purged);
            }
        }
    })
}
