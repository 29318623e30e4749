use std::sync::Arc;

use aide::OperationIo;
use axum::{
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
    Extension,
};
use uuid::Uuid;

use crate::{
    jwt::{error::JwtError, JwtManager},
    types::{AppError, Environment},
};

/// Authenticated user information extracted from the access token
#[derive(Debug, Clone, Copy, PartialEq, Eq, OperationIo)]
pub struct AuthenticatedUser {
    /// The user ID from the token subject
    pub user_id: Uuid,
}

/// Axum extractor for authenticated user
///
/// Only available on routes wrapped by [`auth_middleware`].
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Self>().copied().ok_or_else(|| {
            AppError::unauthenticated(
                "missing_auth",
                "Authentication required but user not found in request extensions",
            )
        })
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// JWT Authentication middleware
///
/// This middleware:
/// 1. Extracts Bearer token from Authorization header
/// 2. Validates the token using `JwtManager`
/// 3. Adds `AuthenticatedUser` to request extensions
/// 4. Returns 401 for invalid/missing tokens
///
/// In development, set `DISABLE_AUTH=true` to take the bearer value as the user ID.
///
/// # Errors
///
/// - `AppError` - Invalid/missing token with 401 status code
pub async fn auth_middleware(
    Extension(jwt_manager): Extension<Arc<JwtManager>>,
    Extension(environment): Extension<Environment>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| {
            AppError::unauthenticated(
                "missing_token",
                "Authorization header must contain a valid Bearer token",
            )
        })?;

    let user_id = if environment.disable_auth() {
        Uuid::parse_str(token).map_err(|_| {
            AppError::unauthenticated("invalid_token", "Bearer value must be a user ID")
        })?
    } else {
        jwt_manager.validate(token).map_err(|err| {
            tracing::debug!("Token rejected: {err}");
            match err {
                JwtError::Expired => {
                    AppError::unauthenticated("expired_token", "Token has expired")
                }
                _ => AppError::unauthenticated("invalid_token", "Couldn't validate JWT"),
            }
        })?
    };

    tracing::debug!(%user_id, "Authenticated request");
    request
        .extensions_mut()
        .insert(AuthenticatedUser { user_id });

    Ok(next.run(request).await)
}
