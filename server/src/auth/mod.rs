//! Credentials, bearer sessions and the request guards built on them.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;

use crate::models::{Role, User};
use crate::state::AppState;
use crate::utils::error::AppError;

pub mod password;
pub mod token;

pub use token::{generate_token, issue_session, spawn_session_sweeper, token_digest};

/// Any caller holding a live bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// An authenticated caller with the organizer role.
#[derive(Debug, Clone)]
pub struct Organizer(pub User);

/// An authenticated caller with the attendee role.
#[derive(Debug, Clone)]
pub struct Attendee(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::AuthError("Not authorized, no token".to_string()))?;
        let token_failed = || AppError::AuthError("Not authorized, token failed".to_string());

        let session = state
            .store
            .find_session(&token_digest(token))
            .await?
            .filter(|session| !session.is_expired(Utc::now()))
            .ok_or_else(token_failed)?;

        let user = state
            .store
            .find_user_by_id(session.user_id)
            .await?
            .ok_or_else(token_failed)?;

        Ok(AuthUser(user))
    }
}

fn require_role(user: User, role: Role) -> Result<User, AppError> {
    if user.role == role {
        Ok(user)
    } else {
        Err(AppError::Forbidden(format!("Not authorized as an {}", role)))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Organizer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        require_role(user, Role::Organizer).map(Organizer)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Attendee {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        require_role(user, Role::Attendee).map(Attendee)
    }
}
