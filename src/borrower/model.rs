use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::PaginationParams;

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "marital_status")]
pub enum MaritalStatus {
    #[sqlx(rename = "casado")]
    #[serde(rename = "casado")]
    Married,
    #[sqlx(rename = "divorciado")]
    #[serde(rename = "divorciado")]
    Divorced,
    #[sqlx(rename = "viudo")]
    #[serde(rename = "viudo")]
    Widowed,
    #[sqlx(rename = "soltero")]
    #[serde(rename = "soltero")]
    Single,
}

impl MaritalStatus {
    pub const ALL: [MaritalStatus; 4] = [
        MaritalStatus::Married,
        MaritalStatus::Divorced,
        MaritalStatus::Widowed,
        MaritalStatus::Single,
    ];
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "housing_type")]
pub enum HousingType {
    #[sqlx(rename = "casa_propia")]
    #[serde(rename = "casa_propia")]
    Owned,
    #[sqlx(rename = "rentada")]
    #[serde(rename = "rentada")]
    Rented,
    #[sqlx(rename = "prestada")]
    #[serde(rename = "prestada")]
    Lent,
}

impl HousingType {
    pub const ALL: [HousingType; 3] = [HousingType::Owned, HousingType::Rented, HousingType::Lent];
}

/// A borrower, or a guarantor ("aval") when `is_guarantor` is set
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Borrower {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub second_last_name: Option<String>,
    pub neighborhood: Option<String>,
    pub postal_code: Option<String>,
    pub voter_id_code: Option<String>,
    pub marital_status: Option<MaritalStatus>,
    pub children: i32,
    pub housing: Option<HousingType>,
    pub is_guarantor: bool,
    pub group_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate_postal_code(value: &str) -> Result<(), ValidationError> {
    if value.len() == 5 && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("postal_code_must_be_5_digits"))
    }
}

fn validate_voter_id_code(value: &str) -> Result<(), ValidationError> {
    if value.len() == 18 && value.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(ValidationError::new("voter_id_code_must_be_18_alphanumerics"))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBorrowerRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(length(max = 100))]
    pub second_last_name: Option<String>,
    #[validate(length(max = 100))]
    pub neighborhood: Option<String>,
    #[validate(custom = "validate_postal_code")]
    pub postal_code: Option<String>,
    #[validate(custom = "validate_voter_id_code")]
    pub voter_id_code: Option<String>,
    pub marital_status: Option<MaritalStatus>,
    #[validate(range(min = 0, max = 30))]
    #[serde(default)]
    pub children: i32,
    pub housing: Option<HousingType>,
    #[serde(default)]
    pub is_guarantor: bool,
    pub group_id: Uuid,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBorrowerRequest {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 100))]
    pub second_last_name: Option<String>,
    #[validate(length(max = 100))]
    pub neighborhood: Option<String>,
    #[validate(custom = "validate_postal_code")]
    pub postal_code: Option<String>,
    #[validate(custom = "validate_voter_id_code")]
    pub voter_id_code: Option<String>,
    pub marital_status: Option<MaritalStatus>,
    #[validate(range(min = 0, max = 30))]
    pub children: Option<i32>,
    pub housing: Option<HousingType>,
    pub is_guarantor: Option<bool>,
    pub group_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BorrowerFilter {
    pub group_id: Option<Uuid>,
    pub is_guarantor: Option<bool>,
    /// Case-insensitive match on any name part
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl BorrowerFilter {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Money position of a borrower across all their loans
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct BorrowerBalance {
    pub borrower_id: Uuid,
    /// Cash disbursed over every loan
    pub lent: Decimal,
    pub paid: Decimal,
    /// Expected total over every loan minus everything paid, floored at 0
    pub remaining: Decimal,
    /// Expected total still owed on active loans
    pub paper: Decimal,
    /// Cash out on active loans
    pub real: Decimal,
    pub active_loans: i64,
}

#[derive(Debug, Serialize)]
pub struct BorrowerCatalogs {
    pub marital_statuses: Vec<MaritalStatus>,
    pub housing_types: Vec<HousingType>,
}

impl BorrowerCatalogs {
    pub fn new() -> Self {
        Self {
            marital_statuses: MaritalStatus::ALL.to_vec(),
            housing_types: HousingType::ALL.to_vec(),
        }
    }
}

impl Default for BorrowerCatalogs {
    fn default() -> Self {
        Self::new()
    }
}
