//! In-memory store implementations.
//!
//! These back the unit tests for the login state machine, the token service,
//! and the rate limiter, and double as a reference for the semantics each
//! trait promises. They mirror the Postgres behavior, including upsert
//! overwrites and the `<= cutoff` expiry comparison.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CredentialStore, LedgerStore, SessionStore};
use crate::auth::error::AuthError;
use crate::auth::models::{Credential, LedgerEntry, NewCredential, Session};

#[derive(Default)]
pub struct InMemoryCredentialStore {
    rows: Mutex<HashMap<Uuid, Credential>>,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn insert(&self, credential: NewCredential) -> Result<Credential, AuthError> {
        let mut rows = self.rows.lock().await;
        if rows
            .values()
            .any(|existing| existing.username == credential.username)
        {
            return Err(AuthError::conflict(
                "A user with this username already exists.",
            ));
        }
        let row = Credential {
            id: Uuid::new_v4(),
            username: credential.username,
            password_hash: credential.password_hash,
            role: credential.role,
            reset_password: false,
            failed_login_attempts: 0,
            account_locked: false,
            last_failed_login_date: None,
            created_at: Utc::now(),
        };
        rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, AuthError> {
        let rows = self.rows.lock().await;
        Ok(rows.values().find(|row| row.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Credential>, AuthError> {
        let rows = self.rows.lock().await;
        Ok(rows.get(&id).cloned())
    }

    async fn update_login_state(
        &self,
        id: Uuid,
        failed_login_attempts: i32,
        account_locked: bool,
        last_failed_login_date: Option<DateTime<Utc>>,
    ) -> Result<(), AuthError> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("credential {id} disappeared during update"))?;
        row.failed_login_attempts = failed_login_attempts;
        row.account_locked = account_locked;
        row.last_failed_login_date = last_failed_login_date;
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AuthError> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("credential {id} disappeared during update"))?;
        row.password_hash = password_hash.to_string();
        row.reset_password = true;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySessionStore {
    rows: Mutex<HashMap<Uuid, Session>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn upsert(
        &self,
        user_id: Uuid,
        refresh_token_hash: &[u8],
        last_login: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut rows = self.rows.lock().await;
        rows.insert(
            user_id,
            Session {
                user_id,
                refresh_token_hash: refresh_token_hash.to_vec(),
                last_login,
            },
        );
        Ok(())
    }

    async fn find_by_token_hash(&self, hash: &[u8]) -> Result<Option<Session>, AuthError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .values()
            .find(|session| session.refresh_token_hash == hash)
            .cloned())
    }

    async fn delete_by_token_hash(&self, hash: &[u8]) -> Result<bool, AuthError> {
        let mut rows = self.rows.lock().await;
        let user_id = rows
            .values()
            .find(|session| session.refresh_token_hash == hash)
            .map(|session| session.user_id);
        match user_id {
            Some(user_id) => {
                rows.remove(&user_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, AuthError> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|_, session| session.last_login > cutoff);
        Ok((before - rows.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryLedgerStore {
    rows: Mutex<HashMap<IpAddr, LedgerEntry>>,
}

impl InMemoryLedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn find(&self, ip: IpAddr) -> Result<Option<LedgerEntry>, AuthError> {
        let rows = self.rows.lock().await;
        Ok(rows.get(&ip).copied())
    }

    async fn increment(&self, ip: IpAddr) -> Result<LedgerEntry, AuthError> {
        let mut rows = self.rows.lock().await;
        let entry = rows.entry(ip).or_insert(LedgerEntry {
            counter: 0,
            lock_time: None,
        });
        entry.counter += 1;
        Ok(*entry)
    }

    async fn set_lock_time(&self, ip: IpAddr, lock_time: DateTime<Utc>) -> Result<(), AuthError> {
        let mut rows = self.rows.lock().await;
        let entry = rows.entry(ip).or_insert(LedgerEntry {
            counter: 0,
            lock_time: None,
        });
        entry.lock_time = Some(lock_time);
        Ok(())
    }

    async fn remove(&self, ip: IpAddr) -> Result<(), AuthError> {
        let mut rows = self.rows.lock().await;
        rows.remove(&ip);
        Ok(())
    }
}
