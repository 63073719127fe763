//! Postgres-backed stores (schema in `sql/schema.sql`).

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::net::IpAddr;
use tracing::Instrument;
use uuid::Uuid;

use super::{CredentialStore, LedgerStore, SessionStore};
use crate::auth::error::AuthError;
use crate::auth::models::{Credential, LedgerEntry, NewCredential, Role, Session};

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn credential_from_row(row: &sqlx::postgres::PgRow) -> Result<Credential, AuthError> {
    let role: String = row.get("role");
    let role = Role::parse(&role).ok_or_else(|| anyhow!("unknown role in database: {role}"))?;
    Ok(Credential {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        role,
        reset_password: row.get("reset_password"),
        failed_login_attempts: row.get("failed_login_attempts"),
        account_locked: row.get("account_locked"),
        last_failed_login_date: row.get("last_failed_login_date"),
        created_at: row.get("created_at"),
    })
}

const CREDENTIAL_COLUMNS: &str = "id, username, password_hash, role, reset_password, \
     failed_login_attempts, account_locked, last_failed_login_date, created_at";

pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn insert(&self, credential: NewCredential) -> Result<Credential, AuthError> {
        let query = format!(
            "INSERT INTO users (username, password_hash, role) \
             VALUES ($1, $2, $3) RETURNING {CREDENTIAL_COLUMNS}"
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT"
        );
        let row = sqlx::query(&query)
            .bind(&credential.username)
            .bind(&credential.password_hash)
            .bind(credential.role.as_str())
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => credential_from_row(&row),
            Err(err) if is_unique_violation(&err) => Err(AuthError::conflict(
                "A user with this username already exists.",
            )),
            Err(err) => Err(anyhow::Error::new(err)
                .context("failed to insert credential")
                .into()),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, AuthError> {
        let query = format!("SELECT {CREDENTIAL_COLUMNS} FROM users WHERE username = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT"
        );
        let row = sqlx::query(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup credential by username")?;
        row.map(|row| credential_from_row(&row)).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Credential>, AuthError> {
        let query = format!("SELECT {CREDENTIAL_COLUMNS} FROM users WHERE id = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT"
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup credential by id")?;
        row.map(|row| credential_from_row(&row)).transpose()
    }

    async fn update_login_state(
        &self,
        id: Uuid,
        failed_login_attempts: i32,
        account_locked: bool,
        last_failed_login_date: Option<DateTime<Utc>>,
    ) -> Result<(), AuthError> {
        let query = r"
            UPDATE users
            SET failed_login_attempts = $2,
                account_locked = $3,
                last_failed_login_date = $4
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE"
        );
        let result = sqlx::query(query)
            .bind(id)
            .bind(failed_login_attempts)
            .bind(account_locked)
            .bind(last_failed_login_date)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to persist login state")?;
        if result.rows_affected() == 0 {
            return Err(anyhow!("credential {id} disappeared during update").into());
        }
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AuthError> {
        let query = r"
            UPDATE users
            SET password_hash = $2,
                reset_password = TRUE
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE"
        );
        let result = sqlx::query(query)
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update password")?;
        if result.rows_affected() == 0 {
            return Err(anyhow!("credential {id} disappeared during update").into());
        }
        Ok(())
    }
}

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn upsert(
        &self,
        user_id: Uuid,
        refresh_token_hash: &[u8],
        last_login: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        // Overwriting the row is what invalidates the previous refresh token.
        let query = r"
            INSERT INTO sessions (user_id, refresh_token_hash, last_login)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET refresh_token_hash = EXCLUDED.refresh_token_hash,
                last_login = EXCLUDED.last_login
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT"
        );
        sqlx::query(query)
            .bind(user_id)
            .bind(refresh_token_hash)
            .bind(last_login)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to upsert session")?;
        Ok(())
    }

    async fn find_by_token_hash(&self, hash: &[u8]) -> Result<Option<Session>, AuthError> {
        let query = r"
            SELECT user_id, refresh_token_hash, last_login
            FROM sessions
            WHERE refresh_token_hash = $1
            LIMIT 1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT"
        );
        let row = sqlx::query(query)
            .bind(hash)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup session")?;
        Ok(row.map(|row| Session {
            user_id: row.get("user_id"),
            refresh_token_hash: row.get("refresh_token_hash"),
            last_login: row.get("last_login"),
        }))
    }

    async fn delete_by_token_hash(&self, hash: &[u8]) -> Result<bool, AuthError> {
        let query = "DELETE FROM sessions WHERE refresh_token_hash = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE"
        );
        let result = sqlx::query(query)
            .bind(hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete session")?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, AuthError> {
        let query = "DELETE FROM sessions WHERE last_login <= $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE"
        );
        let result = sqlx::query(query)
            .bind(cutoff)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete expired sessions")?;
        Ok(result.rows_affected())
    }
}

pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn find(&self, ip: IpAddr) -> Result<Option<LedgerEntry>, AuthError> {
        let query = "SELECT counter, lock_time FROM failed_login_attempts WHERE ip = $1::inet";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT"
        );
        let row = sqlx::query(query)
            .bind(ip.to_string())
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup ledger entry")?;
        Ok(row.map(|row| LedgerEntry {
            counter: row.get("counter"),
            lock_time: row.get("lock_time"),
        }))
    }

    async fn increment(&self, ip: IpAddr) -> Result<LedgerEntry, AuthError> {
        let query = r"
            INSERT INTO failed_login_attempts (ip, counter)
            VALUES ($1::inet, 1)
            ON CONFLICT (ip) DO UPDATE
            SET counter = failed_login_attempts.counter + 1
            RETURNING counter, lock_time
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT"
        );
        let row = sqlx::query(query)
            .bind(ip.to_string())
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to increment ledger counter")?;
        Ok(LedgerEntry {
            counter: row.get("counter"),
            lock_time: row.get("lock_time"),
        })
    }

    async fn set_lock_time(&self, ip: IpAddr, lock_time: DateTime<Utc>) -> Result<(), AuthError> {
        let query = r"
            INSERT INTO failed_login_attempts (ip, counter, lock_time)
            VALUES ($1::inet, 0, $2)
            ON CONFLICT (ip) DO UPDATE
            SET lock_time = EXCLUDED.lock_time
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE"
        );
        sqlx::query(query)
            .bind(ip.to_string())
            .bind(lock_time)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to set ledger lock time")?;
        Ok(())
    }

    async fn remove(&self, ip: IpAddr) -> Result<(), AuthError> {
        let query = "DELETE FROM failed_login_attempts WHERE ip = $1::inet";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE"
        );
        sqlx::query(query)
            .bind(ip.to_string())
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to remove ledger entry")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::is_unique_violation;

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
