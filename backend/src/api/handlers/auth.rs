//! Authentication API handlers.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::api::middleware::auth::AuthUser;
use crate::api::SharedState;
use crate::error::Result;
use crate::models::user::UserProfile;
use crate::services::auth_service::AuthService;

#[derive(OpenApi)]
#[openapi(
    paths(register, login, me, forgot_password, reset_password),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        AuthResponse,
        ForgotPasswordRequest,
        ResetPasswordRequest,
        UserProfile
    ))
)]
pub struct AuthApiDoc;

/// Routes that do not require a bearer token.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Session issued after registration or login.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

/// POST /api/v1/auth/register
#[utoipa::path(
    post,
    path = "/register",
    context_path = "/api/v1/auth",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 409, description = "Email already registered"),
    ),
)]
pub async fn register(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let service = AuthService::new(state.db.clone(), &state.config);
    let user = service.register(&payload.email, &payload.password).await?;
    let token = service.issue_token(&user)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

/// POST /api/v1/auth/login
#[utoipa::path(
    post,
    path = "/login",
    context_path = "/api/v1/auth",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    ),
)]
pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let service = AuthService::new(state.db.clone(), &state.config);
    let (token, user) = service.login(&payload.email, &payload.password).await?;
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// GET /api/v1/auth/me
#[utoipa::path(
    get,
    path = "/me",
    context_path = "/api/v1/auth",
    tag = "auth",
    responses((status = 200, description = "Caller profile", body = UserProfile)),
    security(("bearer_auth" = [])),
)]
pub async fn me(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    let service = AuthService::new(state.db.clone(), &state.config);
    let user = service.get_user(auth.user_id).await?;
    Ok(Json(user.into()))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// POST /api/v1/auth/forgot-password
///
/// Always answers 202 so the response does not reveal whether an account
/// exists for the address.
#[utoipa::path(
    post,
    path = "/forgot-password",
    context_path = "/api/v1/auth",
    tag = "auth",
    request_body = ForgotPasswordRequest,
    responses((status = 202, description = "Reset email queued if the account exists")),
)]
pub async fn forgot_password(
    State(state): State<SharedState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<StatusCode> {
    let service = AuthService::new(state.db.clone(), &state.config);

    if let Some((user, raw_token)) = service.create_reset_token(&payload.email).await? {
        // Delivery failures are logged but never surfaced, for the same reason
        if let Err(e) = state.mailer.send_password_reset(&user.email, &raw_token).await {
            tracing::warn!(user_id = %user.id, "Password reset email failed: {}", e);
        }
    }

    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// POST /api/v1/auth/reset-password
#[utoipa::path(
    post,
    path = "/reset-password",
    context_path = "/api/v1/auth",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 204, description = "Password updated"),
        (status = 401, description = "Invalid or expired token"),
    ),
)]
pub async fn reset_password(
    State(state): State<SharedState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<StatusCode> {
    let service = AuthService::new(state.db.clone(), &state.config);
    service
        .reset_password(payload.token.trim(), &payload.password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
