use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::bonus::{BonusService, GroupBonus, GroupBonusQuery};
use crate::error::ApiError;
use crate::extract::Json;
use crate::group::{CreateGroupRequest, Group, GroupFilter, GroupService, UpdateGroupRequest};
use crate::models::{Action, ApiResponse};

pub async fn create_group(
    State(service): State<Arc<GroupService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Group>>), ApiError> {
    let group = service.create_group(&user, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(group))))
}

pub async fn list_groups(
    State(service): State<Arc<GroupService>>,
    _user: AuthenticatedUser,
    Query(filter): Query<GroupFilter>,
) -> Result<Json<ApiResponse<Vec<Group>>>, ApiError> {
    Ok(Json(ApiResponse::new(service.list_groups(filter).await?)))
}

pub async fn get_group(
    State(service): State<Arc<GroupService>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Group>>, ApiError> {
    Ok(Json(ApiResponse::new(service.get_group(id).await?)))
}

/// PUT /api/groups/:id - Permissions depend on which fields change
pub async fn update_group(
    State(service): State<Arc<GroupService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateGroupRequest>,
) -> Result<Json<ApiResponse<Group>>, ApiError> {
    Ok(Json(ApiResponse::new(
        service.update_group(&user, id, request).await?,
    )))
}

pub async fn delete_group(
    State(service): State<Arc<GroupService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Action::EditRecords)?;
    service.delete_group(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/groups/:id/bonus?date=YYYY-MM-DD
pub async fn group_bonus(
    State(service): State<Arc<BonusService>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(query): Query<GroupBonusQuery>,
) -> Result<Json<ApiResponse<GroupBonus>>, ApiError> {
    Ok(Json(ApiResponse::new(
        service.compute_group_bonus(id, query.date).await?,
    )))
}
