use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::PaginationParams;

/// A week in which a loan fell short of its ideal collection
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Miss {
    pub id: Uuid,
    pub loan_id: Uuid,
    /// Monday of the missed week
    pub week_start: NaiveDate,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMissRequest {
    pub loan_id: Uuid,
    /// Any date inside the missed week; defaults to today
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMissRequest {
    /// Any date inside the week the miss should belong to
    pub date: NaiveDate,
}

#[derive(Debug, Default, Deserialize)]
pub struct MissFilter {
    pub loan_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    /// Any date inside the week of interest
    pub week_of: Option<NaiveDate>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl MissFilter {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SweepRequest {
    /// Any date inside the week to evaluate; defaults to the previous week
    pub week_of: Option<NaiveDate>,
}
