use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use shared_database::AppState;
use shared_models::auth::{TokenResponse, User};
use shared_models::error::{AppError, FieldErrors};
use shared_utils::jwt::validate_token;

use crate::services::{AccountService, LoginResponse, UserProfile};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let mut errors = FieldErrors::new();
    if request.email.trim().is_empty() {
        errors.add("email", "The email field is required.");
    }
    if request.password.is_empty() {
        errors.add("password", "The password field is required.");
    }
    errors.into_result()?;

    let db = state.db.lock().await;
    let response = AccountService::new(&state.config).login(
        db.conn(),
        request.email.trim(),
        &request.password,
    )?;

    Ok(Json(response))
}

pub async fn validate(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let user = validate_token(auth.token(), &state.config.jwt_secret).map_err(AppError::Auth)?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        user_type: user.user_type,
    }))
}

pub async fn verify(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let valid = validate_token(auth.token(), &state.config.jwt_secret).is_ok();
    Ok(Json(json!({ "valid": valid })))
}

#[axum::debug_handler]
pub async fn profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<UserProfile>, AppError> {
    debug!("Getting profile for user: {}", user.id);

    let db = state.db.lock().await;
    let profile = AccountService::new(&state.config).profile(db.conn(), user.id)?;

    Ok(Json(profile))
}
