use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::borrower::{
    Borrower, BorrowerBalance, BorrowerCatalogs, BorrowerFilter, BorrowerService,
    CreateBorrowerRequest, UpdateBorrowerRequest,
};
use crate::error::ApiError;
use crate::extract::Json;
use crate::models::{Action, ApiResponse, PaginatedResponse};

pub async fn create_borrower(
    State(service): State<Arc<BorrowerService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateBorrowerRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Borrower>>), ApiError> {
    user.require(Action::RegisterBorrower)?;
    let borrower = service.create_borrower(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(borrower))))
}

pub async fn list_borrowers(
    State(service): State<Arc<BorrowerService>>,
    _user: AuthenticatedUser,
    Query(filter): Query<BorrowerFilter>,
) -> Result<Json<ApiResponse<PaginatedResponse<Borrower>>>, ApiError> {
    Ok(Json(ApiResponse::new(service.list_borrowers(filter).await?)))
}

pub async fn get_borrower(
    State(service): State<Arc<BorrowerService>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Borrower>>, ApiError> {
    Ok(Json(ApiResponse::new(service.get_borrower(id).await?)))
}

pub async fn update_borrower(
    State(service): State<Arc<BorrowerService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateBorrowerRequest>,
) -> Result<Json<ApiResponse<Borrower>>, ApiError> {
    user.require(Action::RegisterBorrower)?;
    Ok(Json(ApiResponse::new(
        service.update_borrower(id, request).await?,
    )))
}

pub async fn delete_borrower(
    State(service): State<Arc<BorrowerService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Action::EditRecords)?;
    service.delete_borrower(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct GuarantorQuery {
    pub group_id: Option<Uuid>,
}

pub async fn list_guarantors(
    State(service): State<Arc<BorrowerService>>,
    _user: AuthenticatedUser,
    Query(query): Query<GuarantorQuery>,
) -> Result<Json<ApiResponse<Vec<Borrower>>>, ApiError> {
    Ok(Json(ApiResponse::new(
        service.list_guarantors(query.group_id).await?,
    )))
}

pub async fn borrower_balance(
    State(service): State<Arc<BorrowerService>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BorrowerBalance>>, ApiError> {
    Ok(Json(ApiResponse::new(service.borrower_balance(id).await?)))
}

/// Enumerations accepted by the borrower form
pub async fn borrower_catalogs(_user: AuthenticatedUser) -> Json<ApiResponse<BorrowerCatalogs>> {
    Json(ApiResponse::new(BorrowerCatalogs::new()))
}
