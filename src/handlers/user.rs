//! User and role handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::extract::Json;
use crate::models::{
    Action, ApiResponse, CreateUserRequest, PaginatedResponse, PaginationParams, RoleInfo,
    UpdateUserRequest, UserResponse, UserRole,
};
use crate::user::UserService;

pub async fn create_user(
    State(service): State<Arc<UserService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    user.require(Action::CreateUser)?;
    let created = service.create_user(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(created.into()))))
}

pub async fn list_users(
    State(service): State<Arc<UserService>>,
    user: AuthenticatedUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<UserResponse>>>, ApiError> {
    user.require(Action::CreateUser)?;
    let page = service.list_users(pagination).await?;
    Ok(Json(ApiResponse::new(PaginatedResponse {
        items: page.items.into_iter().map(UserResponse::from).collect(),
        page: page.page,
        per_page: page.per_page,
        total_items: page.total_items,
        total_pages: page.total_pages,
    })))
}

/// Anyone may read their own account; other accounts need user management rights
pub async fn get_user(
    State(service): State<Arc<UserService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    if id != user.user_id {
        user.require(Action::CreateUser)?;
    }
    let found = service.get_user(id).await?;
    Ok(Json(ApiResponse::new(found.into())))
}

pub async fn update_user(
    State(service): State<Arc<UserService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    user.require(Action::EditRecords)?;
    let updated = service.update_user(id, request).await?;
    Ok(Json(ApiResponse::new(updated.into())))
}

pub async fn delete_user(
    State(service): State<Arc<UserService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Action::DeactivateUser)?;
    service.delete_user(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/roles - Role catalog with granted actions
pub async fn list_roles(_user: AuthenticatedUser) -> Json<ApiResponse<Vec<RoleInfo>>> {
    Json(ApiResponse::new(
        UserRole::ALL.into_iter().map(RoleInfo::from).collect(),
    ))
}
