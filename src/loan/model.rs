use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::PaginationParams;

/// Loan lifecycle status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "loan_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Completed,
    Cancelled,
}

/// Catalog entry fixing the term and weekly rate of a loan
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LoanType {
    pub id: Uuid,
    pub name: String,
    pub term_weeks: i32,
    pub weekly_rate: Decimal,
    pub tolerated_misses: i32,
    pub miss_penalty: Decimal,
    pub penalty_limit: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Loan {
    pub id: Uuid,
    pub borrower_id: Uuid,
    pub guarantor_id: Option<Uuid>,
    pub loan_type_id: Uuid,
    pub principal: Decimal,
    /// Cash actually handed over; lower than `principal` when a renewal
    /// absorbed the previous loan's shortfall
    pub disbursed: Decimal,
    pub expected_total: Decimal,
    pub started_at: DateTime<Utc>,
    pub status: LoanStatus,
    pub completed: bool,
    pub is_renewal: bool,
    pub renewed_from: Option<Uuid>,
    pub serviced_weeks: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLoanRequest {
    pub borrower_id: Uuid,
    pub loan_type_id: Uuid,
    pub principal: Decimal,
    pub guarantor_id: Option<Uuid>,
    /// Defaults to now
    pub started_at: Option<DateTime<Utc>>,
}

/// Administrative correction; nothing is re-evaluated after the write
#[derive(Debug, Default, Deserialize)]
pub struct UpdateLoanRequest {
    pub guarantor_id: Option<Uuid>,
    pub loan_type_id: Option<Uuid>,
    pub principal: Option<Decimal>,
    pub disbursed: Option<Decimal>,
    pub expected_total: Option<Decimal>,
    pub started_at: Option<DateTime<Utc>>,
    pub status: Option<LoanStatus>,
    pub completed: Option<bool>,
    pub serviced_weeks: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoanFilter {
    pub borrower_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub status: Option<LoanStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl LoanFilter {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Repayment position of a single loan
#[derive(Debug, Serialize)]
pub struct LoanSummary {
    pub loan: Loan,
    pub loan_type: LoanType,
    pub ideal_weekly: Decimal,
    pub paid_total: Decimal,
    pub remaining: Decimal,
    pub payments: i64,
    pub misses: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLoanTypeRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(range(min = 1))]
    pub term_weeks: i32,
    pub weekly_rate: Decimal,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub tolerated_misses: i32,
    #[serde(default)]
    pub miss_penalty: Decimal,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub penalty_limit: i32,
}
