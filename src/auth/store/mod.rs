//! Storage interfaces consumed by the authentication core.
//!
//! The services only see these traits; the Postgres implementations live in
//! [`postgres`] and an in-memory pair used by the test suite in [`memory`].
//!
//! Counter updates (`failed_login_attempts`, the ledger `counter`) are
//! read-modify-write without a compare-and-swap guarantee; concurrent
//! requests against the same account or IP may under-count. That window is
//! accepted by design, so implementations must not add serialization the
//! interface does not promise.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::net::IpAddr;
use uuid::Uuid;

use super::error::AuthError;
use super::models::{Credential, LedgerEntry, NewCredential, Session};

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create a credential; raises the conflict condition on a duplicate
    /// username. This is the surface the registration side uses.
    async fn insert(&self, credential: NewCredential) -> Result<Credential, AuthError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, AuthError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Credential>, AuthError>;

    /// Persist the lockout fields after a login attempt.
    async fn update_login_state(
        &self,
        id: Uuid,
        failed_login_attempts: i32,
        account_locked: bool,
        last_failed_login_date: Option<DateTime<Utc>>,
    ) -> Result<(), AuthError>;

    /// Replace the password hash and flag the credential as reset.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AuthError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or overwrite the single session row for `user_id`.
    async fn upsert(
        &self,
        user_id: Uuid,
        refresh_token_hash: &[u8],
        last_login: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    async fn find_by_token_hash(&self, hash: &[u8]) -> Result<Option<Session>, AuthError>;

    /// Delete the row holding this token; `false` when nothing matched.
    async fn delete_by_token_hash(&self, hash: &[u8]) -> Result<bool, AuthError>;

    /// Delete every row with `last_login <= cutoff`, returning the count.
    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, AuthError>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find(&self, ip: IpAddr) -> Result<Option<LedgerEntry>, AuthError>;

    /// Increment the counter for `ip`, creating the entry at 1 if absent,
    /// and return the updated entry.
    async fn increment(&self, ip: IpAddr) -> Result<LedgerEntry, AuthError>;

    async fn set_lock_time(&self, ip: IpAddr, lock_time: DateTime<Utc>) -> Result<(), AuthError>;

    async fn remove(&self, ip: IpAddr) -> Result<(), AuthError>;
}
