//! # Gardi (Credential & Session Lifecycle Service)
//!
//! `gardi` authenticates users and manages the lifecycle of their sessions:
//! signed access/refresh token issuance, server-side session state for
//! revocation, brute-force defense, and scheduled cleanup of stale sessions.
//!
//! ## Sessions
//!
//! Exactly one session is recognized per user. Logging in overwrites the
//! stored refresh token, which invalidates the previous session even while
//! its signature is still valid. Refreshing issues a new access token only;
//! the refresh token is never rotated and stays valid until its own expiry,
//! logout, password reset, or the next login.
//!
//! ## Brute-force defense
//!
//! Two independent layers: per-account lockout after too many failed
//! passwords (unlocked by elapsed time, never by a correct password), and a
//! per-IP ledger that throttles login attempts for usernames that do not
//! resolve to an account. Lockout responses are deliberately generic and
//! reveal neither counters nor remaining time.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
