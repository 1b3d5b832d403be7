use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::extract::Json;
use crate::loan::{LoanService, RecordedPayment};
use crate::models::{Action, ApiResponse, PaginatedResponse};
use crate::payment::{CreatePaymentRequest, Payment, PaymentFilter, PaymentService, UpdatePaymentRequest};

/// POST /api/payments - Record a collection against a loan
pub async fn record_payment(
    State(loans): State<Arc<LoanService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RecordedPayment>>), ApiError> {
    user.require(Action::RecordGroupCollections)?;
    let recorded = loans
        .record_payment(&user, request.loan_id, request.amount, request.paid_at)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(recorded))))
}

pub async fn list_payments(
    State(service): State<Arc<PaymentService>>,
    _user: AuthenticatedUser,
    Query(filter): Query<PaymentFilter>,
) -> Result<Json<ApiResponse<PaginatedResponse<Payment>>>, ApiError> {
    Ok(Json(ApiResponse::new(service.list_payments(filter).await?)))
}

pub async fn get_payment(
    State(service): State<Arc<PaymentService>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Payment>>, ApiError> {
    Ok(Json(ApiResponse::new(service.get_payment(id).await?)))
}

/// GET /api/loans/:id/payments
pub async fn loan_payments(
    State(service): State<Arc<PaymentService>>,
    _user: AuthenticatedUser,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Payment>>>, ApiError> {
    Ok(Json(ApiResponse::new(
        service.payments_for_loan(loan_id).await?,
    )))
}

pub async fn update_payment(
    State(service): State<Arc<PaymentService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePaymentRequest>,
) -> Result<Json<ApiResponse<Payment>>, ApiError> {
    user.require(Action::EditRecords)?;
    Ok(Json(ApiResponse::new(
        service.update_payment(id, request).await?,
    )))
}

pub async fn delete_payment(
    State(service): State<Arc<PaymentService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Action::EditRecords)?;
    service.delete_payment(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
