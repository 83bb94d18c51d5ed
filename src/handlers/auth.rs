// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    error::AppError,
    extract::ValidatedJson,
    models::user::{LoginRequest, LoginResponse, RegisterRequest, UserResponse},
    services::auth::AuthService,
    state::AppState,
};

/// Registers a new user.
///
/// Returns 201 Created and the user object (excluding password hash).
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = AuthService::new(&state.pool, &state.config, state.clock.as_ref())
        .register(payload)
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Authenticates a user by email and password and returns a JWT.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let access_token = AuthService::new(&state.pool, &state.config, state.clock.as_ref())
        .login(payload)
        .await?;

    Ok(Json(LoginResponse { access_token }))
}
