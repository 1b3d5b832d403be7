//! Authentication service
//!
//! Password login and JWT issuance for staff users.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{AuthTokensResponse, LoginRequest, User, UserRole};

use super::jwt::{generate_access_token, generate_refresh_token, verify_token_of_type, TokenType};
use super::password::{hash_password, verify_password};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db_pool: PgPool,
    jwt_secret: String,
    access_token_ttl_seconds: i64,
    refresh_token_ttl_days: i64,
}

impl AuthService {
    pub fn new(
        db_pool: PgPool,
        jwt_secret: String,
        access_token_ttl_seconds: i64,
        refresh_token_ttl_days: i64,
    ) -> Self {
        Self {
            db_pool,
            jwt_secret,
            access_token_ttl_seconds,
            refresh_token_ttl_days,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_seconds
    }

    pub fn refresh_token_ttl_seconds(&self) -> i64 {
        self.refresh_token_ttl_days * 24 * 60 * 60
    }

    /// Check credentials and issue a token pair
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthTokensResponse, ApiError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
            .bind(&request.email)
            .fetch_optional(&self.db_pool)
            .await?;

        let user = match user {
            Some(user) if verify_password(&request.password, &user.password_hash) => user,
            _ => {
                tracing::warn!(email = %request.email, "Rejected login attempt");
                return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
            }
        };

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "User logged in");
        self.issue_tokens(user)
    }

    /// Exchange a refresh token for a new pair; the role is re-read from storage
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthTokensResponse, ApiError> {
        let claims = verify_token_of_type(refresh_token, &self.jwt_secret, TokenType::Refresh)?;
        let user = self.get_user_by_id(claims.user_id()?).await.map_err(|e| match e {
            ApiError::NotFound(_) => ApiError::Unauthorized("User no longer exists".to_string()),
            other => other,
        })?;

        self.issue_tokens(user)
    }

    pub async fn get_user_by_id(&self, user_id: Uuid) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("User", user_id))
    }

    /// Create the first admin account when no users exist yet
    pub async fn ensure_bootstrap_admin(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db_pool)
            .await?;
        if existing > 0 {
            return Ok(());
        }

        let password_hash =
            hash_password(password).map_err(|e| ApiError::InternalError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO users (first_name, last_name, email, password_hash, role)
            VALUES ('Admin', 'Bootstrap', $1, $2, $3)
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(UserRole::Admin)
        .execute(&self.db_pool)
        .await?;

        tracing::info!(email = %email, "Bootstrap admin account created");
        Ok(())
    }

    fn issue_tokens(&self, user: User) -> Result<AuthTokensResponse, ApiError> {
        let access_token = generate_access_token(
            user.id,
            user.role,
            &self.jwt_secret,
            self.access_token_ttl_seconds,
        )?;
        let refresh_token = generate_refresh_token(
            user.id,
            user.role,
            &self.jwt_secret,
            self.refresh_token_ttl_days,
        )?;

        Ok(AuthTokensResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_ttl_seconds,
            user: user.into(),
        })
    }
}
