//! Authentication extractors
//!
//! JWT verification and user extraction. The token is read from the
//! `Authorization: Bearer` header, falling back to the `access_token` cookie.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization, Cookie},
    TypedHeader,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{verify_token_of_type, AuthService, JwtError, TokenType};
use crate::error::ApiError;
use crate::models::{Action, UserRole};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Authenticated user extracted from the access token.
///
/// Services take this as an explicit argument whenever the acting user's
/// identity or role matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    pub fn can(&self, action: Action) -> bool {
        self.role.can(action)
    }

    /// Fail with 403 unless the role grants `action`
    pub fn require(&self, action: Action) -> Result<(), ApiError> {
        if self.can(action) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "Role '{}' may not {}",
                self.role.as_str(),
                action.description().to_lowercase()
            )))
        }
    }
}

/// Pull a raw token from the bearer header or the named cookie
pub async fn token_from_parts<S>(parts: &mut Parts, state: &S, cookie_name: &str) -> Option<String>
where
    S: Send + Sync,
{
    if let Ok(TypedHeader(Authorization(bearer))) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await
    {
        return Some(bearer.token().to_string());
    }

    TypedHeader::<Cookie>::from_request_parts(parts, state)
        .await
        .ok()
        .and_then(|TypedHeader(cookie)| cookie.get(cookie_name).map(str::to_string))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts, state, ACCESS_TOKEN_COOKIE)
            .await
            .ok_or_else(|| {
                ApiError::Unauthorized("Bearer token or access_token cookie required".to_string())
            })?;

        let auth_service = Arc::<AuthService>::from_ref(state);

        let claims = verify_token_of_type(&token, auth_service.jwt_secret(), TokenType::Access)
            .map_err(|e| match e {
                JwtError::TokenExpired => ApiError::Unauthorized("Token has expired".to_string()),
                _ => ApiError::Unauthorized("Invalid token".to_string()),
            })?;

        let user_id = claims
            .user_id()
            .map_err(|_| ApiError::Unauthorized("Invalid user ID in token".to_string()))?;

        Ok(AuthenticatedUser {
            user_id,
            role: claims.role,
        })
    }
}

/// Extractor that only admits admins
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if user.role != UserRole::Admin {
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }

        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_maps_to_forbidden() {
        let lead = AuthenticatedUser::new(Uuid::new_v4(), UserRole::GroupLead);
        assert!(lead.require(Action::CreateLoan).is_ok());

        let err = lead.require(Action::CreateLargeLoan).unwrap_err();
        assert_eq!(err.error_code(), "FORBIDDEN");
        assert!(err.to_string().contains("group_lead"));
    }
}
