//! Periodic deletion of stale session rows.
//!
//! Runs on its own wall-clock schedule, independent of the request path. A
//! failed cycle is logged and absorbed; the next tick retries from scratch.
//! Concurrent session churn is fine: a row deleted mid-flight surfaces later
//! as the already-modeled not-found condition, never as a crash.

use chrono::Duration;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, error, info};

use super::clock::Clock;
use super::error::AuthError;
use super::tokens::TokenService;

/// Spawn the background sweep task.
pub fn spawn_session_sweeper(
    tokens: Arc<TokenService>,
    clock: Arc<dyn Clock>,
    interval_seconds: u64,
    retention_days: i64,
) -> tokio::task::JoinHandle<()> {
    let interval = std::time::Duration::from_secs(interval_seconds.max(1));
    tokio::spawn(async move {
        loop {
            match sweep_once(&tokens, clock.as_ref(), retention_days).await {
                Ok(0) => debug!("Session sweep found nothing to delete"),
                Ok(deleted) => info!(deleted, "Session sweep removed stale sessions"),
                Err(err) => error!("Session sweep failed: {err}"),
            }
            sleep(interval).await;
        }
    })
}

/// One sweep cycle: delete every session with
/// `last_login <= now - retention`.
pub async fn sweep_once(
    tokens: &TokenService,
    clock: &dyn Clock,
    retention_days: i64,
) -> Result<u64, AuthError> {
    let cutoff = clock.now() - Duration::days(retention_days);
    tokens.remove_expired_sessions(cutoff).await
}
