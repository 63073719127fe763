//! Per-IP login gate, applied before the orchestrator on the login path.
//!
//! Throttling is independent of the account-level lockout: only requests for
//! usernames that do not resolve to an account feed the per-IP counter, while
//! an active IP lock also rejects requests for known usernames. Attacks that
//! use existing usernames are otherwise left to the account lockout (a
//! deliberate trade-off, recorded in DESIGN.md).
//!
//! Locked entries are evicted by a deferred task after the window elapses,
//! but that is an optimization only: every decision compares the persisted
//! `lock_time` against the clock, so losing the timer (e.g. across a restart)
//! never extends or shortens a lock.

use chrono::Duration;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::error;

use super::clock::Clock;
use super::config::AuthConfig;
use super::error::AuthError;
use super::store::{CredentialStore, LedgerStore};

const IP_LOCKED: &str = "Account is locked. Try again later.";

pub struct LoginRateLimiter {
    credentials: Arc<dyn CredentialStore>,
    ledger: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    max_requests: i64,
    window_seconds: i64,
}

impl LoginRateLimiter {
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        ledger: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            credentials,
            ledger,
            clock,
            max_requests: config.rate_limit_max_requests(),
            window_seconds: config.rate_limit_window_seconds(),
        }
    }

    /// Gate a login request from `ip` targeting `username`.
    ///
    /// # Errors
    /// Returns the too-many-requests condition when the IP is locked or just
    /// crossed the threshold; internal faults propagate from the stores.
    pub async fn check(&self, ip: IpAddr, username: &str) -> Result<(), AuthError> {
        let known_username = self
            .credentials
            .find_by_username(username)
            .await?
            .is_some();
        let entry = self.ledger.find(ip).await?;
        let now = self.clock.now();

        // Known usernames skip the counter but not an already-active lock.
        if known_username {
            if let Some(lock_time) = entry.and_then(|entry| entry.lock_time) {
                if now < lock_time {
                    return Err(AuthError::too_many_requests(IP_LOCKED));
                }
            }
            return Ok(());
        }

        let entry = self.ledger.increment(ip).await?;
        if entry.counter >= self.max_requests {
            let lock_time = now + Duration::seconds(self.window_seconds);
            self.ledger.set_lock_time(ip, lock_time).await?;
            self.spawn_auto_clear(ip);
            return Err(AuthError::too_many_requests(IP_LOCKED));
        }

        Ok(())
    }

    /// Best-effort eviction of the ledger entry once the window has passed.
    fn spawn_auto_clear(&self, ip: IpAddr) {
        let ledger = Arc::clone(&self.ledger);
        let window = u64::try_from(self.window_seconds).unwrap_or(0);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(window)).await;
            if let Err(err) = ledger.remove(ip).await {
                error!("Failed to clear rate-limit ledger entry for {ip}: {err}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::manual::ManualClock;
    use crate::auth::models::{NewCredential, Role};
    use crate::auth::store::memory::{InMemoryCredentialStore, InMemoryLedgerStore};
    use secrecy::SecretString;

    struct Harness {
        limiter: LoginRateLimiter,
        ledger: Arc<InMemoryLedgerStore>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let config = AuthConfig::new(
            SecretString::from("access-secret".to_string()),
            SecretString::from("refresh-secret".to_string()),
        )
        .with_rate_limit_max_requests(5)
        .with_rate_limit_window_seconds(60);
        let limiter = LoginRateLimiter::new(
            Arc::clone(&credentials) as Arc<dyn CredentialStore>,
            Arc::clone(&ledger) as Arc<dyn LedgerStore>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            &config,
        );
        Harness {
            limiter,
            ledger,
            clock,
        }
    }

    fn ip() -> IpAddr {
        "203.0.113.9".parse().expect("ip")
    }

    #[tokio::test]
    async fn unknown_usernames_lock_the_ip_at_the_threshold() {
        let harness = harness();

        for _ in 0..4 {
            harness
                .limiter
                .check(ip(), "ghost1")
                .await
                .expect("below threshold");
        }

        // Fifth request crosses the threshold: counter reaches 5 and the
        // entry gets a future lock time.
        let err = harness
            .limiter
            .check(ip(), "ghost1")
            .await
            .expect_err("threshold crossed");
        assert!(matches!(err, AuthError::TooManyRequests(_)));

        let entry = harness
            .ledger
            .find(ip())
            .await
            .expect("find")
            .expect("entry exists");
        assert_eq!(entry.counter, 5);
        let lock_time = entry.lock_time.expect("lock time set");
        assert!(lock_time > harness.clock.now());
    }

    #[tokio::test]
    async fn locked_ip_rejects_even_known_usernames() {
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let config = AuthConfig::new(
            SecretString::from("access-secret".to_string()),
            SecretString::from("refresh-secret".to_string()),
        )
        .with_rate_limit_max_requests(5)
        .with_rate_limit_window_seconds(60);
        let limiter = LoginRateLimiter::new(
            Arc::clone(&credentials) as Arc<dyn CredentialStore>,
            Arc::clone(&ledger) as Arc<dyn LedgerStore>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            &config,
        );
        credentials
            .insert(NewCredential {
                username: "alice1".to_string(),
                password_hash: "$argon2id$stub".to_string(),
                role: Role::Employee,
            })
            .await
            .expect("seed user");

        // Five unknown-username requests from one IP set the lock.
        for _ in 0..4 {
            limiter.check(ip(), "ghost1").await.expect("below threshold");
        }
        let _ = limiter.check(ip(), "ghost1").await.expect_err("locked");

        // The lock check runs before the known-username bypass.
        let err = limiter
            .check(ip(), "alice1")
            .await
            .expect_err("known username still rejected while locked");
        assert!(matches!(err, AuthError::TooManyRequests(_)));

        // Once the window elapses the known username passes again, with no
        // timer involved.
        clock.advance(chrono::Duration::seconds(61));
        limiter
            .check(ip(), "alice1")
            .await
            .expect("lock elapsed");
    }

    #[tokio::test]
    async fn known_usernames_do_not_feed_the_counter() {
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let config = AuthConfig::new(
            SecretString::from("access-secret".to_string()),
            SecretString::from("refresh-secret".to_string()),
        );
        let limiter = LoginRateLimiter::new(
            Arc::clone(&credentials) as Arc<dyn CredentialStore>,
            Arc::clone(&ledger) as Arc<dyn LedgerStore>,
            clock as Arc<dyn Clock>,
            &config,
        );
        credentials
            .insert(NewCredential {
                username: "alice1".to_string(),
                password_hash: "$argon2id$stub".to_string(),
                role: Role::Employee,
            })
            .await
            .expect("seed user");

        for _ in 0..20 {
            limiter.check(ip(), "alice1").await.expect("never throttled");
        }
        assert!(ledger.find(ip()).await.expect("find").is_none());
    }

    #[tokio::test]
    async fn distinct_ips_are_tracked_independently() {
        let harness = harness();
        let other: IpAddr = "198.51.100.2".parse().expect("ip");

        for _ in 0..4 {
            harness
                .limiter
                .check(ip(), "ghost1")
                .await
                .expect("below threshold");
        }
        let _ = harness.limiter.check(ip(), "ghost1").await.expect_err("locked");

        harness
            .limiter
            .check(other, "ghost1")
            .await
            .expect("other ip unaffected");
    }
}
