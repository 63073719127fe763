//! Authentication endpoints: login, refresh, reset, logout.
//!
//! This module is the boundary that maps the core's failure kinds onto
//! transport status codes and owns the `jwt` refresh-token cookie contract.

pub mod login;
pub mod reset;
pub mod session;
pub mod types;

pub use login::login;
pub use reset::reset_password;
pub use session::{logout, refresh_token};

use axum::http::header::{InvalidHeaderValue, COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::net::IpAddr;
use tracing::error;

use crate::auth::AuthError;

const REFRESH_COOKIE_NAME: &str = "jwt";
// Transport upper bound only; the refresh token's own expiry and the
// single-session overwrite are what actually bound its lifetime.
const REFRESH_COOKIE_MAX_AGE_SECONDS: i64 = 7 * 24 * 60 * 60;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message).into_response(),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, message).into_response(),
            Self::TooManyRequests(message) => {
                (StatusCode::TOO_MANY_REQUESTS, message).into_response()
            }
            // A vanished session means the client must re-authenticate.
            Self::NotFound(message) => (StatusCode::UNAUTHORIZED, message).into_response(),
            Self::Conflict(message) => (StatusCode::CONFLICT, message).into_response(),
            Self::Internal(err) => {
                error!("Internal error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
                    .into_response()
            }
        }
    }
}

/// Build the `jwt` cookie carrying the refresh token.
pub(super) fn refresh_cookie(token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{REFRESH_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=None; Secure; \
         Max-Age={REFRESH_COOKIE_MAX_AGE_SECONDS}"
    ))
}

pub(super) fn clear_refresh_cookie() -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{REFRESH_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=None; Secure; Max-Age=0"
    ))
}

/// Pull the refresh token out of the `jwt` cookie, if present.
pub(super) fn extract_refresh_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == REFRESH_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

/// Client IP for rate limiting: first entry of a trusted proxy chain.
pub(super) fn forwarded_client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded = headers.get("x-forwarded-for")?.to_str().ok()?;
    forwarded.split(',').next()?.trim().parse().ok()
}
