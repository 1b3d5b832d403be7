use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::cut::{
    CreateCutRequest, Cut, CutFilter, CutService, CutSummary, CutSummaryQuery, UpdateCutRequest,
};
use crate::error::ApiError;
use crate::extract::Json;
use crate::models::{Action, ApiResponse, PaginatedResponse};

/// POST /api/cuts - Close the acting user's cash for a day
pub async fn create_cut(
    State(service): State<Arc<CutService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateCutRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Cut>>), ApiError> {
    user.require(Action::PerformCut)?;
    let cut = service.create_cut(&user, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(cut))))
}

/// GET /api/cuts - Users without route reports only see their own cuts
pub async fn list_cuts(
    State(service): State<Arc<CutService>>,
    user: AuthenticatedUser,
    Query(filter): Query<CutFilter>,
) -> Result<Json<ApiResponse<PaginatedResponse<Cut>>>, ApiError> {
    Ok(Json(ApiResponse::new(service.list_cuts(&user, filter).await?)))
}

pub async fn get_cut(
    State(service): State<Arc<CutService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Cut>>, ApiError> {
    Ok(Json(ApiResponse::new(service.get_cut(&user, id).await?)))
}

pub async fn update_cut(
    State(service): State<Arc<CutService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCutRequest>,
) -> Result<Json<ApiResponse<Cut>>, ApiError> {
    user.require(Action::EditRecords)?;
    Ok(Json(ApiResponse::new(service.update_cut(id, request).await?)))
}

pub async fn delete_cut(
    State(service): State<Arc<CutService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Action::EditRecords)?;
    service.delete_cut(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/cuts/summary?date=YYYY-MM-DD - Weekly surplus and lead bonus
pub async fn cut_summary(
    State(service): State<Arc<CutService>>,
    user: AuthenticatedUser,
    Query(query): Query<CutSummaryQuery>,
) -> Result<Json<ApiResponse<CutSummary>>, ApiError> {
    Ok(Json(ApiResponse::new(service.summary(&user, query.date).await?)))
}
