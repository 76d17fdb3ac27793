use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::models::auth::{Principal, Role};
use crate::state::AppState;
use crate::utils::jwt;

/// Authenticated user extracted from the `Authorization: Bearer <token>` header.
///
/// Add this as a handler parameter to require authentication.
pub struct AuthUser {
    pub user_id: i32,
    pub role: Role,
}

impl AuthUser {
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.user_id,
            role: self.role,
        }
    }

    /// Returns `Ok(())` for administrators, `Err(PermissionDenied)` otherwise.
    pub fn require_admin(&self) -> Result<(), AppError> {
        self.principal().require_admin()
    }
}

/// Like [`AuthUser`], but a missing header yields `None` instead of an error.
/// A present but invalid token is still rejected.
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn principal(&self) -> Option<Principal> {
        self.0.as_ref().map(AuthUser::principal)
    }
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<AuthUser>, AppError> {
    let Some(auth_header) = parts.headers.get("Authorization") else {
        return Ok(None);
    };
    let auth_header = auth_header.to_str().map_err(|_| AppError::TokenInvalid)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::TokenInvalid)?;

    let claims =
        jwt::verify(&state.config.auth.jwt_secret, token).map_err(|_| AppError::TokenInvalid)?;
    let role = claims
        .role
        .parse::<Role>()
        .map_err(|_| AppError::TokenInvalid)?;

    Ok(Some(AuthUser {
        user_id: claims.uid,
        role,
    }))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)?.ok_or(AppError::TokenMissing)
    }
}

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).map(MaybeAuthUser)
    }
}
