use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Payout granted to a group whose weekly collection falls in
/// `[collection_min, collection_max]` with at most `max_misses` misses
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BonusRule {
    pub id: Uuid,
    pub amount: Decimal,
    pub collection_min: Decimal,
    pub collection_max: Decimal,
    pub max_misses: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBonusRuleRequest {
    pub amount: Decimal,
    pub collection_min: Decimal,
    pub collection_max: Decimal,
    #[validate(range(min = 0))]
    pub max_misses: i32,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBonusRuleRequest {
    pub amount: Option<Decimal>,
    pub collection_min: Option<Decimal>,
    pub collection_max: Option<Decimal>,
    #[validate(range(min = 0))]
    pub max_misses: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupBonusQuery {
    /// Any date inside the week; defaults to today
    pub date: Option<NaiveDate>,
}

/// A group's weekly performance and the bonus it earned
#[derive(Debug, Clone, Serialize)]
pub struct GroupBonus {
    pub group_id: Uuid,
    pub week_start: NaiveDate,
    pub collected: Decimal,
    pub misses: i64,
    /// Zero when no rule matched
    pub amount: Decimal,
    pub rule_id: Option<Uuid>,
}
