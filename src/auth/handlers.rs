use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Router,
};
use tracing::instrument;

use super::{
    dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
    extractors::AuthUser,
    jwt::JwtKeys,
    services,
};
use crate::{error::AppError, extract::ValidJson, response::ApiResponse, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> Result<ApiResponse<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let res = services::register(state.users.as_ref(), &keys, payload).await?;
    Ok(ApiResponse::created("User registered successfully", res))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<ApiResponse<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let res = services::login(state.users.as_ref(), &keys, payload).await?;
    Ok(ApiResponse::ok("Login successful", res))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RefreshRequest>,
) -> Result<ApiResponse<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let res = services::refresh(state.users.as_ref(), &keys, &payload.refresh_token).await?;
    Ok(ApiResponse::ok("Token refreshed", res))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<ApiResponse<PublicUser>, AppError> {
    let user = services::me(state.users.as_ref(), &principal).await?;
    Ok(ApiResponse::ok("Profile retrieved successfully", user))
}
