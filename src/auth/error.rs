//! Typed failures raised by the credential and session core.
//!
//! Each variant is a failure kind; the HTTP boundary switches on the variant
//! to pick a status code. `Internal` wraps infrastructure faults and is never
//! silently swallowed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Bad credentials, missing session cookie, or password mismatch on reset.
    #[error("{0}")]
    Unauthorized(String),

    /// A token was presented but its signature is invalid or it has expired.
    #[error("{0}")]
    Forbidden(String),

    /// Account lockout or IP lockout.
    #[error("{0}")]
    TooManyRequests(String),

    /// A session row was expected and is gone (overwritten, swept, or logged
    /// out). Distinct from `Forbidden` so callers can tell a vanished session
    /// from a bad signature.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate identity.
    #[error("{0}")]
    Conflict(String),

    /// Store unavailable, corrupt payload, or similar unclassified fault.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::TooManyRequests(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::AuthError;
    use anyhow::anyhow;

    #[test]
    fn messages_surface_through_display() {
        let err = AuthError::unauthorized("Invalid username or password.");
        assert_eq!(err.to_string(), "Invalid username or password.");

        let err = AuthError::Internal(anyhow!("connection refused"));
        assert_eq!(err.to_string(), "connection refused");
    }
}
