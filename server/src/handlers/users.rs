use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::issue_session;
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::models::{Role, User};
use crate::services::validation::{is_valid_email, present};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// What a client keeps after signing in.
#[derive(Debug, Serialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub token: String,
}

impl AuthenticatedUser {
    fn new(user: User, token: String) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            token,
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;

    let (Some(name), Some(email), Some(password)) = (
        present(payload.name),
        present(payload.email),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::ValidationError(
            "Please provide all required fields".to_string(),
        ));
    };

    let email = normalize_email(&email);
    if !is_valid_email(&email) {
        return Err(AppError::ValidationError(
            "Please provide a valid email address".to_string(),
        ));
    }

    let role = match present(payload.role) {
        Some(raw) => raw.parse::<Role>().map_err(AppError::ValidationError)?,
        None => Role::default(),
    };

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_password_blocking(password).await?;
    let user = User::new(name, email, password_hash, role);
    state.store.create_user(&user).await?;

    let token =
        issue_session(state.store.as_ref(), user.id, state.config.session_ttl_days).await?;

    info!(user_id = %user.id, role = %user.role, "User registered");

    Ok(created(
        AuthenticatedUser::new(user, token),
        "User registered successfully",
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    let invalid = || AppError::AuthError("Invalid credentials".to_string());

    let email = present(payload.email)
        .map(|e| normalize_email(&e))
        .ok_or_else(invalid)?;
    let password = payload.password.ok_or_else(invalid)?;

    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password_blocking(password, user.password_hash.clone()).await {
        return Err(invalid());
    }

    let token =
        issue_session(state.store.as_ref(), user.id, state.config.session_ttl_days).await?;

    info!(user_id = %user.id, "User logged in");

    Ok(success(AuthenticatedUser::new(user, token), "Login successful"))
}
