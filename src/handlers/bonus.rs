use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::bonus::{BonusRule, BonusService, CreateBonusRuleRequest, UpdateBonusRuleRequest};
use crate::error::ApiError;
use crate::extract::Json;
use crate::models::{Action, ApiResponse};

/// GET /api/bonuses - Rules in evaluation order
pub async fn list_bonus_rules(
    State(service): State<Arc<BonusService>>,
    _user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<BonusRule>>>, ApiError> {
    Ok(Json(ApiResponse::new(service.list_rules().await?)))
}

pub async fn get_bonus_rule(
    State(service): State<Arc<BonusService>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BonusRule>>, ApiError> {
    Ok(Json(ApiResponse::new(service.get_rule(id).await?)))
}

pub async fn create_bonus_rule(
    State(service): State<Arc<BonusService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateBonusRuleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BonusRule>>), ApiError> {
    user.require(Action::EditRecords)?;
    let rule = service.create_rule(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(rule))))
}

pub async fn update_bonus_rule(
    State(service): State<Arc<BonusService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateBonusRuleRequest>,
) -> Result<Json<ApiResponse<BonusRule>>, ApiError> {
    user.require(Action::EditRecords)?;
    Ok(Json(ApiResponse::new(service.update_rule(id, request).await?)))
}

pub async fn delete_bonus_rule(
    State(service): State<Arc<BonusService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Action::EditRecords)?;
    service.delete_rule(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
