use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::extract::Json;
use crate::loan::{
    CreateLoanRequest, CreateLoanTypeRequest, Loan, LoanFilter, LoanService, LoanSummary,
    LoanType, UpdateLoanRequest,
};
use crate::models::{Action, ApiResponse, PaginatedResponse};

/// POST /api/loans - Issue a loan; large principals need the override permission
pub async fn create_loan(
    State(service): State<Arc<LoanService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateLoanRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Loan>>), ApiError> {
    user.require(Action::CreateLoan)?;
    let loan = service.create_loan(&user, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(loan))))
}

pub async fn list_loans(
    State(service): State<Arc<LoanService>>,
    _user: AuthenticatedUser,
    Query(filter): Query<LoanFilter>,
) -> Result<Json<ApiResponse<PaginatedResponse<Loan>>>, ApiError> {
    Ok(Json(ApiResponse::new(service.list_loans(filter).await?)))
}

pub async fn get_loan(
    State(service): State<Arc<LoanService>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Loan>>, ApiError> {
    Ok(Json(ApiResponse::new(service.get_loan(id).await?)))
}

pub async fn loan_summary(
    State(service): State<Arc<LoanService>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LoanSummary>>, ApiError> {
    Ok(Json(ApiResponse::new(service.loan_summary(id).await?)))
}

pub async fn update_loan(
    State(service): State<Arc<LoanService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateLoanRequest>,
) -> Result<Json<ApiResponse<Loan>>, ApiError> {
    user.require(Action::EditRecords)?;
    Ok(Json(ApiResponse::new(service.update_loan(id, request).await?)))
}

pub async fn delete_loan(
    State(service): State<Arc<LoanService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Action::DeleteLoan)?;
    service.delete_loan(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_loan_types(
    State(service): State<Arc<LoanService>>,
    _user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<LoanType>>>, ApiError> {
    Ok(Json(ApiResponse::new(service.list_loan_types().await?)))
}

pub async fn get_loan_type(
    State(service): State<Arc<LoanService>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LoanType>>, ApiError> {
    Ok(Json(ApiResponse::new(service.get_loan_type(id).await?)))
}

pub async fn create_loan_type(
    State(service): State<Arc<LoanService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateLoanTypeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LoanType>>), ApiError> {
    user.require(Action::EditRecords)?;
    let loan_type = service.create_loan_type(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(loan_type))))
}
