//! # Authentication Route Handlers
//!
//! Registration, login, and the account endpoints. Login issues a JWT whose
//! subject is the user's database ID; the [`CurrentActor`] extractor resolves
//! it back on every request.

use crate::{
    auth::middleware::{issue_token, CurrentActor},
    errors::AppError,
    handlers::respond,
    state::AppState,
    types::ApiResponse,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use onboard::ValidationErrors;
use onboard_access::{
    delete_user, list_users, register_user, verify_credentials, NewUser, User, UserRole,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default = "default_role")]
    pub role: UserRole,
}

fn default_role() -> UserRole {
    UserRole::Other
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Registers a new account. The password must be confirmed; mismatches are
/// reported in the same shape as every other validation failure.
pub async fn register_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), AppError> {
    if payload.password != payload.confirm_password {
        let mut errors = ValidationErrors::new();
        errors.add("password", "Passwords do not match.");
        return Err(AppError::Store(onboard::StoreError::Validation(errors)));
    }

    let user = register_user(
        &app_state.sqlite_provider.db,
        NewUser {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
            phone_number: payload.phone_number,
            company_name: payload.company_name,
            role: payload.role,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        respond("User registered successfully.", user),
    ))
}

/// Verifies credentials and issues a login token.
pub async fn login_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    let user =
        verify_credentials(&app_state.sqlite_provider.db, &payload.username, &payload.password)
            .await?;
    let token = issue_token(&user.id, app_state.config.token_ttl_secs)?;
    info!(username = %user.username, "user logged in");

    Ok(respond("Login successful.", LoginResponse { token, user }))
}

/// Returns the details of the currently authenticated user.
pub async fn get_me_handler(actor: CurrentActor) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = actor.require_user()?;
    Ok(respond("OK", user))
}

/// Lists every account. Admin only.
pub async fn list_users_handler(
    State(app_state): State<AppState>,
    actor: CurrentActor,
) -> Result<Json<ApiResponse<Vec<User>>>, AppError> {
    actor.require_admin()?;
    let users = list_users(&app_state.sqlite_provider.db).await?;
    Ok(respond("OK", users))
}

/// Deletes an account. Admin only. The user's forms and submissions survive
/// with the reference cleared.
pub async fn delete_user_handler(
    State(app_state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    actor.require_admin()?;
    delete_user(&app_state.sqlite_provider.db, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
