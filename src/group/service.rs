use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthenticatedUser;
use crate::models::Action;

use super::model::{CreateGroupRequest, Group, GroupFilter, UpdateGroupRequest};

#[derive(Clone)]
pub struct GroupService {
    db_pool: PgPool,
}

impl GroupService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn create_group(
        &self,
        actor: &AuthenticatedUser,
        request: CreateGroupRequest,
    ) -> ApiResult<Group> {
        request.validate()?;
        actor.require(Action::AssignGroupToRoute)?;
        if request.lead_user_id.is_some() {
            actor.require(Action::AssignGroupLead)?;
        }

        let group = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (name, route_id, lead_user_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(request.route_id)
        .bind(request.lead_user_id)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!(group_id = %group.id, route_id = %group.route_id, "Group created");
        Ok(group)
    }

    pub async fn get_group(&self, id: Uuid) -> ApiResult<Group> {
        sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Group", id))
    }

    pub async fn list_groups(&self, filter: GroupFilter) -> ApiResult<Vec<Group>> {
        Ok(sqlx::query_as::<_, Group>(
            r#"
            SELECT * FROM groups
            WHERE ($1::uuid IS NULL OR route_id = $1)
              AND ($2::uuid IS NULL OR lead_user_id = $2)
            ORDER BY name
            "#,
        )
        .bind(filter.route_id)
        .bind(filter.lead_user_id)
        .fetch_all(&self.db_pool)
        .await?)
    }

    /// Moving a group needs the route permission, changing its lead the lead one
    pub async fn update_group(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        request: UpdateGroupRequest,
    ) -> ApiResult<Group> {
        request.validate()?;
        if request.route_id.is_some() {
            actor.require(Action::AssignGroupToRoute)?;
        }
        if request.lead_user_id.is_some() {
            actor.require(Action::AssignGroupLead)?;
        }
        if request.name.is_some() {
            actor.require(Action::EditRecords)?;
        }

        let group = sqlx::query_as::<_, Group>(
            r#"
            UPDATE groups SET
                name = COALESCE($2, name),
                route_id = COALESCE($3, route_id),
                lead_user_id = COALESCE($4, lead_user_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(request.route_id)
        .bind(request.lead_user_id)
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Group", id))?;

        tracing::info!(group_id = %id, "Group updated");
        Ok(group)
    }

    /// Fails with 400 while borrowers still belong to the group
    pub async fn delete_group(&self, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Group", id));
        }

        tracing::info!(group_id = %id, "Group deleted");
        Ok(())
    }
}
