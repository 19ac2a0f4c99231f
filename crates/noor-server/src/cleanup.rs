use std::time::Duration;

use tracing::{debug, info, warn};

use noor_api::AppState;

/// Background task that closes sessions and tokens past their expiry.
pub async fn run_cleanup_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let db_state = state.clone();
        let result = tokio::task::spawn_blocking(move || -> anyhow::Result<(usize, usize)> {
            let sessions = db_state.db.expire_sessions()?;
            let tokens = db_state.db.deactivate_expired_tokens()?;
            Ok((sessions, tokens))
        })
        .await;

        match result {
            Ok(Ok((0, 0))) => debug!("Cleanup: nothing expired"),
            Ok(Ok((sessions, tokens))) => {
                info!("Cleanup: expired {} sessions, deactivated {} tokens", sessions, tokens);
            }
            Ok(Err(e)) => warn!("Cleanup error: {:#}", e),
            Err(e) => warn!("Cleanup task panicked: {}", e),
        }
    }
}
