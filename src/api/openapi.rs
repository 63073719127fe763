//! OpenAPI document for the service, served through Swagger UI at `/docs`.

use utoipa::OpenApi;

use super::handlers::auth::types::{
    LoginRequest, LoginResponse, MessageResponse, RefreshResponse, ResetPasswordRequest,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::health::health,
        super::handlers::auth::login::login,
        super::handlers::auth::session::refresh_token,
        super::handlers::auth::session::logout,
        super::handlers::auth::reset::reset_password,
    ),
    components(schemas(
        LoginRequest,
        LoginResponse,
        RefreshResponse,
        ResetPasswordRequest,
        MessageResponse
    )),
    tags(
        (name = "auth", description = "Credential and session lifecycle"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
