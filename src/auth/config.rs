//! Authentication configuration: token secrets and TTLs, lockout and
//! rate-limit windows, and the session sweep schedule.

use anyhow::{bail, Result};
use secrecy::{ExposeSecret, SecretString};

const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 60;
const DEFAULT_REFRESH_TOKEN_TTL_SECONDS: i64 = 5 * 60;
const DEFAULT_HASH_TIME_COST: u32 = 2;
const DEFAULT_LOCK_DURATION_SECONDS: i64 = 60;
const DEFAULT_MAX_LOGIN_ATTEMPTS: i32 = 5;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: i64 = 5;
const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: i64 = 60;
const DEFAULT_SESSION_RETENTION_DAYS: i64 = 7;
const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    access_token_secret: SecretString,
    refresh_token_secret: SecretString,
    access_token_ttl_seconds: i64,
    refresh_token_ttl_seconds: i64,
    hash_time_cost: u32,
    lock_duration_seconds: i64,
    max_login_attempts: i32,
    rate_limit_max_requests: i64,
    rate_limit_window_seconds: i64,
    session_retention_days: i64,
    sweep_interval_seconds: u64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(access_token_secret: SecretString, refresh_token_secret: SecretString) -> Self {
        Self {
            access_token_secret,
            refresh_token_secret,
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            refresh_token_ttl_seconds: DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
            hash_time_cost: DEFAULT_HASH_TIME_COST,
            lock_duration_seconds: DEFAULT_LOCK_DURATION_SECONDS,
            max_login_attempts: DEFAULT_MAX_LOGIN_ATTEMPTS,
            rate_limit_max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            rate_limit_window_seconds: DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
            session_retention_days: DEFAULT_SESSION_RETENTION_DAYS,
            sweep_interval_seconds: DEFAULT_SWEEP_INTERVAL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_hash_time_cost(mut self, time_cost: u32) -> Self {
        self.hash_time_cost = time_cost;
        self
    }

    #[must_use]
    pub fn with_lock_duration_seconds(mut self, seconds: i64) -> Self {
        self.lock_duration_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_max_login_attempts(mut self, attempts: i32) -> Self {
        self.max_login_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_rate_limit_max_requests(mut self, requests: i64) -> Self {
        self.rate_limit_max_requests = requests;
        self
    }

    #[must_use]
    pub fn with_rate_limit_window_seconds(mut self, seconds: i64) -> Self {
        self.rate_limit_window_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_retention_days(mut self, days: i64) -> Self {
        self.session_retention_days = days;
        self
    }

    #[must_use]
    pub fn with_sweep_interval_seconds(mut self, seconds: u64) -> Self {
        self.sweep_interval_seconds = seconds;
        self
    }

    /// Reject configurations that would undermine the token scheme.
    ///
    /// # Errors
    /// Returns an error if the two signing secrets are equal or if the
    /// refresh TTL does not exceed the access TTL.
    pub fn validate(&self) -> Result<()> {
        if self.access_token_secret.expose_secret() == self.refresh_token_secret.expose_secret() {
            bail!("access and refresh token secrets must differ");
        }
        if self.refresh_token_ttl_seconds <= self.access_token_ttl_seconds {
            bail!(
                "refresh token TTL ({}s) must exceed access token TTL ({}s)",
                self.refresh_token_ttl_seconds,
                self.access_token_ttl_seconds
            );
        }
        Ok(())
    }

    #[must_use]
    pub fn access_token_secret(&self) -> &SecretString {
        &self.access_token_secret
    }

    #[must_use]
    pub fn refresh_token_secret(&self) -> &SecretString {
        &self.refresh_token_secret
    }

    #[must_use]
    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    #[must_use]
    pub fn refresh_token_ttl_seconds(&self) -> i64 {
        self.refresh_token_ttl_seconds
    }

    #[must_use]
    pub fn hash_time_cost(&self) -> u32 {
        self.hash_time_cost
    }

    #[must_use]
    pub fn lock_duration_seconds(&self) -> i64 {
        self.lock_duration_seconds
    }

    #[must_use]
    pub fn max_login_attempts(&self) -> i32 {
        self.max_login_attempts
    }

    #[must_use]
    pub fn rate_limit_max_requests(&self) -> i64 {
        self.rate_limit_max_requests
    }

    #[must_use]
    pub fn rate_limit_window_seconds(&self) -> i64 {
        self.rate_limit_window_seconds
    }

    #[must_use]
    pub fn session_retention_days(&self) -> i64 {
        self.session_retention_days
    }

    #[must_use]
    pub fn sweep_interval_seconds(&self) -> u64 {
        self.sweep_interval_seconds
    }
}
