use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::Violation;

/// A collection route, overseen by a manager and a supervisor
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Route {
    pub id: Uuid,
    pub name: String,
    pub manager_id: Option<Uuid>,
    pub supervisor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRouteRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub manager_id: Option<Uuid>,
    pub supervisor_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateRouteRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub manager_id: Option<Uuid>,
    pub supervisor_id: Option<Uuid>,
}

pub fn validate_staffing(manager_id: Option<Uuid>, supervisor_id: Option<Uuid>) -> Vec<Violation> {
    match (manager_id, supervisor_id) {
        (Some(manager), Some(supervisor)) if manager == supervisor => vec![Violation::new(
            "supervisor_id",
            "must be a different user than the manager",
        )],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_and_supervisor_differ() {
        let user = Uuid::new_v4();
        assert_eq!(validate_staffing(Some(user), Some(user)).len(), 1);
        assert!(validate_staffing(Some(user), Some(Uuid::new_v4())).is_empty());
        assert!(validate_staffing(Some(user), None).is_empty());
        assert!(validate_staffing(None, None).is_empty());
    }
}
