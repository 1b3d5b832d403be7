//! Staff accounts

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::hash_password;
use crate::error::{ApiError, ApiResult};
use crate::models::{CreateUserRequest, PaginatedResponse, PaginationParams, UpdateUserRequest, User};

#[derive(Clone)]
pub struct UserService {
    db_pool: PgPool,
}

impl UserService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> ApiResult<User> {
        request.validate()?;

        let password_hash =
            hash_password(&request.password).map_err(|e| ApiError::InternalError(e.to_string()))?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (first_name, last_name, second_last_name, email, password_hash, role, superior_id)
            VALUES ($1, $2, $3, lower($4), $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.second_last_name)
        .bind(&request.email)
        .bind(password_hash)
        .bind(request.role)
        .bind(request.superior_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => {
                ApiError::Conflict(format!("Email {} is already registered", request.email))
            }
            other => other,
        })?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "User created");
        Ok(user)
    }

    pub async fn get_user(&self, id: Uuid) -> ApiResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("User", id))
    }

    pub async fn list_users(&self, pagination: PaginationParams) -> ApiResult<PaginatedResponse<User>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db_pool)
            .await?;

        let items = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY last_name, first_name, id LIMIT $1 OFFSET $2",
        )
        .bind(pagination.per_page())
        .bind(pagination.offset())
        .fetch_all(&self.db_pool)
        .await?;

        Ok(PaginatedResponse::new(items, pagination, total))
    }

    pub async fn update_user(&self, id: Uuid, request: UpdateUserRequest) -> ApiResult<User> {
        request.validate()?;

        if request.superior_id == Some(id) {
            return Err(ApiError::ValidationError(
                "superior_id: a user cannot report to themselves".to_string(),
            ));
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                second_last_name = COALESCE($4, second_last_name),
                email = COALESCE(lower($5), email),
                role = COALESCE($6, role),
                superior_id = COALESCE($7, superior_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.second_last_name)
        .bind(&request.email)
        .bind(request.role)
        .bind(request.superior_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

        tracing::info!(user_id = %id, "User updated");
        Ok(user)
    }

    pub async fn delete_user(&self, actor_id: Uuid, id: Uuid) -> ApiResult<()> {
        if actor_id == id {
            return Err(ApiError::BadRequest("Users cannot delete their own account".to_string()));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("User", id));
        }

        tracing::warn!(user_id = %id, deleted_by = %actor_id, "User deleted");
        Ok(())
    }
}
