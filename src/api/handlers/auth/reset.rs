//! Password reset endpoint.
//!
//! Requires both an authenticated access-token identity and proof of an
//! active session (the `jwt` cookie); completing the reset revokes that
//! session so the user has to log in again.

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use super::types::{MessageResponse, ResetPasswordRequest};
use super::{clear_refresh_cookie, extract_refresh_token};
use crate::api::handlers::valid_password;
use crate::auth::AuthService;

#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 201, description = "Password replaced; jwt cookie cleared", body = MessageResponse),
        (status = 400, description = "Malformed request body", body = String),
        (status = 401, description = "Not authenticated or confirmation mismatch", body = String),
        (status = 403, description = "Access token signature invalid or expired", body = String)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    headers: HeaderMap,
    auth: Extension<Arc<AuthService>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let claims = match auth.tokens().verify_access_token(authorization) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    let request: ResetPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    if !valid_password(&request.password) || !valid_password(&request.confirm_password) {
        return (
            StatusCode::BAD_REQUEST,
            "Password must be between 6 and 255 characters".to_string(),
        )
            .into_response();
    }

    let cookie = extract_refresh_token(&headers);
    match auth
        .reset_password(
            claims.id,
            cookie.as_deref(),
            &request.password,
            &request.confirm_password,
        )
        .await
    {
        Ok(()) => {
            let mut response_headers = HeaderMap::new();
            if let Ok(cookie) = clear_refresh_cookie() {
                response_headers.insert(SET_COOKIE, cookie);
            }
            (
                StatusCode::CREATED,
                response_headers,
                Json(MessageResponse {
                    message: "Reset password process is complete.".to_string(),
                }),
            )
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}
