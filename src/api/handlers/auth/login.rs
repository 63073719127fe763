//! Login endpoint: rate-limit gate, then the orchestrator.

use axum::{
    extract::{ConnectInfo, Extension},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::net::SocketAddr;
use std::sync::Arc;

use super::types::{LoginRequest, LoginResponse};
use super::{forwarded_client_ip, refresh_cookie};
use crate::api::handlers::{valid_password, valid_username};
use crate::auth::{AuthService, LoginRateLimiter};

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated; refresh token set as jwt cookie", body = LoginResponse),
        (status = 400, description = "Malformed request body", body = String),
        (status = 401, description = "Invalid username or password", body = String),
        (status = 429, description = "Account or IP locked", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    limiter: Extension<Arc<LoginRateLimiter>>,
    auth: Extension<Arc<AuthService>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    // The gate runs before validation: every attempt from a throttled
    // source is rejected, well-formed or not.
    let client_ip = forwarded_client_ip(&headers).unwrap_or_else(|| peer.ip());
    if let Err(err) = limiter.check(client_ip, &request.username).await {
        return err.into_response();
    }

    if !valid_username(&request.username) || !valid_password(&request.password) {
        return (
            StatusCode::BAD_REQUEST,
            "Invalid username or password format".to_string(),
        )
            .into_response();
    }

    match auth.login(&request.username, &request.password).await {
        Ok(tokens) => {
            let mut response_headers = HeaderMap::new();
            if let Ok(cookie) = refresh_cookie(&tokens.refresh_token) {
                response_headers.insert(SET_COOKIE, cookie);
            }
            (
                StatusCode::OK,
                response_headers,
                Json(LoginResponse {
                    access_token: tokens.access_token,
                }),
            )
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}
