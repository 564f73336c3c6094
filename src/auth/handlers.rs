use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::auth::dto::{
    ApiMessage, ForgotPasswordRequest, LoginRequest, LoginResponse, ResetPasswordRequest,
    SignupRequest,
};
use crate::error::ApiError;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

#[instrument(skip(state, payload))]
async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<ApiMessage>), ApiError> {
    state.auth.signup(&payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiMessage::ok("Account created successfully")),
    ))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (token, user) = state.auth.login(&payload).await?;
    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".into(),
        token,
        user,
    }))
}

/// Sessions are stateless signed tokens, so there is nothing to invalidate
/// server-side. Always succeeds.
#[instrument]
async fn logout() -> Json<ApiMessage> {
    Json(ApiMessage::ok("Logged out successfully"))
}

#[instrument(skip(state, payload))]
async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiMessage>, ApiError> {
    state.auth.forgot_password(&payload).await?;
    Ok(Json(ApiMessage::ok(
        "If the email exists, a password reset link has been sent",
    )))
}

#[instrument(skip(state, payload))]
async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<ApiMessage>, ApiError> {
    state.auth.reset_password(&payload).await?;
    Ok(Json(ApiMessage::ok("Password reset successfully")))
}
