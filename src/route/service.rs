use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ensure_valid, ApiError, ApiResult};
use crate::models::UserRole;

use super::model::{validate_staffing, CreateRouteRequest, Route, UpdateRouteRequest};

#[derive(Clone)]
pub struct RouteService {
    db_pool: PgPool,
}

impl RouteService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn create_route(&self, request: CreateRouteRequest) -> ApiResult<Route> {
        request.validate()?;
        ensure_valid(validate_staffing(request.manager_id, request.supervisor_id))?;
        self.check_role(request.manager_id, UserRole::Manager).await?;
        self.check_role(request.supervisor_id, UserRole::Supervisor).await?;

        let route = sqlx::query_as::<_, Route>(
            r#"
            INSERT INTO routes (name, manager_id, supervisor_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(request.manager_id)
        .bind(request.supervisor_id)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!(route_id = %route.id, name = %route.name, "Route created");
        Ok(route)
    }

    pub async fn get_route(&self, id: Uuid) -> ApiResult<Route> {
        sqlx::query_as::<_, Route>("SELECT * FROM routes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Route", id))
    }

    pub async fn list_routes(&self) -> ApiResult<Vec<Route>> {
        Ok(sqlx::query_as::<_, Route>("SELECT * FROM routes ORDER BY name")
            .fetch_all(&self.db_pool)
            .await?)
    }

    pub async fn update_route(&self, id: Uuid, request: UpdateRouteRequest) -> ApiResult<Route> {
        request.validate()?;

        let current = self.get_route(id).await?;
        let manager_id = request.manager_id.or(current.manager_id);
        let supervisor_id = request.supervisor_id.or(current.supervisor_id);
        ensure_valid(validate_staffing(manager_id, supervisor_id))?;
        self.check_role(request.manager_id, UserRole::Manager).await?;
        self.check_role(request.supervisor_id, UserRole::Supervisor).await?;

        let route = sqlx::query_as::<_, Route>(
            r#"
            UPDATE routes
            SET name = COALESCE($2, name), manager_id = $3, supervisor_id = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(manager_id)
        .bind(supervisor_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Route", id))?;

        tracing::info!(route_id = %id, "Route updated");
        Ok(route)
    }

    /// Fails with 400 while groups are still assigned to the route
    pub async fn delete_route(&self, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Route", id));
        }

        tracing::info!(route_id = %id, "Route deleted");
        Ok(())
    }

    async fn check_role(&self, user_id: Option<Uuid>, expected: UserRole) -> ApiResult<()> {
        let Some(user_id) = user_id else {
            return Ok(());
        };

        let role: UserRole = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("User", user_id))?;

        if role != expected {
            return Err(ApiError::ValidationError(format!(
                "User {} has role '{}', expected '{}'",
                user_id,
                role.as_str(),
                expected.as_str()
            )));
        }
        Ok(())
    }
}
