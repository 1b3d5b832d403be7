use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Borrowers collected together on a route, led by a titular
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub route_id: Uuid,
    pub lead_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub route_id: Uuid,
    pub lead_user_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateGroupRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub route_id: Option<Uuid>,
    pub lead_user_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupFilter {
    pub route_id: Option<Uuid>,
    pub lead_user_id: Option<Uuid>,
}
