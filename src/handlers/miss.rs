use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{AdminUser, AuthenticatedUser};
use crate::error::ApiError;
use crate::extract::Json;
use crate::miss::{
    CreateMissRequest, Miss, MissFilter, MissService, MissSweeper, SweepReport, SweepRequest,
    UpdateMissRequest,
};
use crate::models::{Action, ApiResponse, PaginatedResponse};
use crate::week::Week;

pub async fn create_miss(
    State(service): State<Arc<MissService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateMissRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Miss>>), ApiError> {
    user.require(Action::EditRecords)?;
    let miss = service.create_miss(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(miss))))
}

pub async fn list_misses(
    State(service): State<Arc<MissService>>,
    _user: AuthenticatedUser,
    Query(filter): Query<MissFilter>,
) -> Result<Json<ApiResponse<PaginatedResponse<Miss>>>, ApiError> {
    Ok(Json(ApiResponse::new(service.list_misses(filter).await?)))
}

pub async fn get_miss(
    State(service): State<Arc<MissService>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Miss>>, ApiError> {
    Ok(Json(ApiResponse::new(service.get_miss(id).await?)))
}

pub async fn update_miss(
    State(service): State<Arc<MissService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMissRequest>,
) -> Result<Json<ApiResponse<Miss>>, ApiError> {
    user.require(Action::EditRecords)?;
    Ok(Json(ApiResponse::new(service.update_miss(id, request).await?)))
}

pub async fn delete_miss(
    State(service): State<Arc<MissService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Action::EditRecords)?;
    service.delete_miss(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/misses/sweep - Run the weekly sweep now (admin only)
pub async fn run_sweep(
    State(sweeper): State<Arc<MissSweeper>>,
    AdminUser(admin): AdminUser,
    body: Option<Json<SweepRequest>>,
) -> Result<Json<ApiResponse<SweepReport>>, ApiError> {
    let week_of = body.and_then(|Json(request)| request.week_of);
    tracing::info!(user_id = %admin.user_id, week_of = ?week_of, "Manual miss sweep requested");

    let report = match week_of {
        Some(date) => sweeper.run_for_week(Week::try_containing(date)?).await?,
        None => sweeper.run_previous_week().await?,
    };
    Ok(Json(ApiResponse::new(report)))
}
