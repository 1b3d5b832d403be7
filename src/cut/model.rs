use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Violation;
use crate::models::PaginationParams;

/// Cash reconciliation ("corte") handed over by a user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Cut {
    pub id: Uuid,
    pub user_id: Uuid,
    pub cut_date: NaiveDate,
    pub total_collected: Decimal,
    pub total_expenses: Decimal,
    /// Float left with the user
    pub seed: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCutRequest {
    pub total_collected: Decimal,
    pub total_expenses: Decimal,
    pub seed: Decimal,
    /// Defaults to today
    pub cut_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCutRequest {
    pub total_collected: Option<Decimal>,
    pub total_expenses: Option<Decimal>,
    pub seed: Option<Decimal>,
    pub cut_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CutFilter {
    pub user_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl CutFilter {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CutSummaryQuery {
    pub date: Option<NaiveDate>,
}

/// What the acting user should hand over for a week
#[derive(Debug, Serialize)]
pub struct CutSummary {
    pub user_id: Uuid,
    pub week_start: NaiveDate,
    /// Surplus over every group the user can see
    pub surplus: Decimal,
    /// Bonus earned by the groups the user leads
    pub lead_bonus: Decimal,
    pub groups_led: usize,
    /// Report rows left out of `surplus` because they failed
    pub failed_rows: usize,
    /// Cuts already handed over during the week
    pub cuts_in_week: i64,
    pub collected_in_week: Decimal,
}

pub fn validate_amounts(
    total_collected: Option<Decimal>,
    total_expenses: Option<Decimal>,
    seed: Option<Decimal>,
) -> Vec<Violation> {
    [
        ("total_collected", total_collected),
        ("total_expenses", total_expenses),
        ("seed", seed),
    ]
    .into_iter()
    .filter(|(_, value)| matches!(value, Some(v) if *v < Decimal::ZERO))
    .map(|(field, _)| Violation::new(field, "must not be negative"))
    .collect()
}
