//! Domain records for credentials, sessions, and the failed-attempt ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of account roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Employee,
    Admin,
    SuperAdmin,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Admin => "admin",
            Self::SuperAdmin => "superAdmin",
        }
    }

    /// Parse the database representation of a role.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "employee" => Some(Self::Employee),
            "admin" => Some(Self::Admin),
            "superAdmin" => Some(Self::SuperAdmin),
            _ => None,
        }
    }
}

/// Identity record owned by the authentication flow.
///
/// Invariant: `account_locked` implies `last_failed_login_date` is set; the
/// lockout branch of the login state machine relies on it.
#[derive(Debug, Clone)]
pub struct Credential {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub reset_password: bool,
    pub failed_login_attempts: i32,
    pub account_locked: bool,
    pub last_failed_login_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating a credential (registration side).
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

/// One session row per user; a new login overwrites the previous row.
///
/// Only the SHA-256 digest of the refresh token is stored; lookups compare
/// digests, never raw tokens.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub refresh_token_hash: Vec<u8>,
    pub last_login: DateTime<Utc>,
}

/// Per-IP failed-attempt counter. `lock_time` of `None` means not locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEntry {
    pub counter: i64,
    pub lock_time: Option<DateTime<Utc>>,
}

/// Payload carried by both access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub id: Uuid,
    pub username: String,
    pub reset_password: bool,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}
