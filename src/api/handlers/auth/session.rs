//! Refresh and logout endpoints, both keyed on the `jwt` cookie.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use super::extract_refresh_token;
use super::types::{MessageResponse, RefreshResponse};
use crate::auth::AuthService;

#[utoipa::path(
    get,
    path = "/auth/refresh-token",
    responses(
        (status = 200, description = "New access token issued", body = RefreshResponse),
        (status = 401, description = "Missing cookie or unknown session", body = String),
        (status = 403, description = "Refresh token signature invalid or expired", body = String)
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    headers: HeaderMap,
    auth: Extension<Arc<AuthService>>,
) -> impl IntoResponse {
    let cookie = extract_refresh_token(&headers);
    match auth.refresh_access_token(cookie.as_deref()).await {
        Ok(access_token) => (
            StatusCode::OK,
            Json(RefreshResponse {
                success: true,
                access_token,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Session removed", body = MessageResponse),
        (status = 401, description = "Missing cookie or unknown session", body = String)
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, auth: Extension<Arc<AuthService>>) -> impl IntoResponse {
    let cookie = extract_refresh_token(&headers);
    match auth.logout(cookie.as_deref()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Cookie cleared.".to_string(),
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
