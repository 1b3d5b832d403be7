//! Identity models: users, roles and the permission catalog

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Organizational roles, lowest to highest
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Collector,
    GroupLead,
    Supervisor,
    Manager,
    Director,
    Admin,
}

/// Actions a role may be granted
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    RegisterBorrower,
    CreateLoan,
    RecordGroupCollections,
    PerformCut,
    RecordGroupLoanPayments,
    ViewRouteReports,
    ViewGeneralReports,
    EditRecords,
    CreateUser,
    DeactivateUser,
    CreateLargeLoan,
    DeleteLoan,
    AssignGroupLead,
    AssignGroupToRoute,
}

impl Action {
    pub const ALL: [Action; 14] = [
        Action::RegisterBorrower,
        Action::CreateLoan,
        Action::RecordGroupCollections,
        Action::PerformCut,
        Action::RecordGroupLoanPayments,
        Action::ViewRouteReports,
        Action::ViewGeneralReports,
        Action::EditRecords,
        Action::CreateUser,
        Action::DeactivateUser,
        Action::CreateLargeLoan,
        Action::DeleteLoan,
        Action::AssignGroupLead,
        Action::AssignGroupToRoute,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            Action::RegisterBorrower => "Register borrower or guarantor",
            Action::CreateLoan => "Create loan",
            Action::RecordGroupCollections => "Record group collections",
            Action::PerformCut => "Perform cut with superior",
            Action::RecordGroupLoanPayments => "Record group loan payments",
            Action::ViewRouteReports => "View route reports",
            Action::ViewGeneralReports => "View general reports",
            Action::EditRecords => "Edit records",
            Action::CreateUser => "Create user",
            Action::DeactivateUser => "Deactivate user",
            Action::CreateLargeLoan => "Create loan above the large-loan threshold",
            Action::DeleteLoan => "Delete loan",
            Action::AssignGroupLead => "Assign group lead",
            Action::AssignGroupToRoute => "Assign group to route",
        }
    }
}

impl UserRole {
    pub const ALL: [UserRole; 6] = [
        UserRole::Collector,
        UserRole::GroupLead,
        UserRole::Supervisor,
        UserRole::Manager,
        UserRole::Director,
        UserRole::Admin,
    ];

    /// Actions granted to this role
    pub fn permissions(&self) -> &'static [Action] {
        use Action::*;
        match self {
            UserRole::Collector => &[RecordGroupCollections, PerformCut],
            UserRole::GroupLead => &[
                RegisterBorrower,
                CreateLoan,
                RecordGroupCollections,
                PerformCut,
            ],
            UserRole::Supervisor | UserRole::Manager => &[
                RegisterBorrower,
                CreateLoan,
                RecordGroupCollections,
                PerformCut,
                RecordGroupLoanPayments,
                ViewRouteReports,
            ],
            UserRole::Director => &[
                RegisterBorrower,
                CreateLoan,
                RecordGroupCollections,
                PerformCut,
                RecordGroupLoanPayments,
                ViewRouteReports,
                ViewGeneralReports,
            ],
            UserRole::Admin => &Action::ALL,
        }
    }

    pub fn can(&self, action: Action) -> bool {
        self.permissions().contains(&action)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Collector => "collector",
            UserRole::GroupLead => "group_lead",
            UserRole::Supervisor => "supervisor",
            UserRole::Manager => "manager",
            UserRole::Director => "director",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        UserRole::ALL.into_iter().find(|role| role.as_str() == s)
    }
}

/// User model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub second_last_name: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub superior_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Credentials for password login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Auth tokens response
#[derive(Debug, Serialize)]
pub struct AuthTokensResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

/// User response (sanitized for API)
#[derive(Debug, Serialize, Clone)]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub second_last_name: Option<String>,
    pub email: String,
    pub role: UserRole,
    pub superior_id: Option<Uuid>,
    pub permissions: Vec<Action>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            second_last_name: user.second_last_name,
            email: user.email,
            role: user.role,
            superior_id: user.superior_id,
            permissions: user.role.permissions().to_vec(),
            created_at: user.created_at,
        }
    }
}

/// Refresh token request; the token may also arrive as a cookie
#[derive(Debug, Default, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255))]
    pub first_name: String,
    #[validate(length(min = 1, max = 255))]
    pub last_name: String,
    #[validate(length(max = 255))]
    pub second_last_name: Option<String>,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 72))]
    pub password: String,
    pub role: UserRole,
    pub superior_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub last_name: Option<String>,
    #[validate(length(max = 255))]
    pub second_last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub superior_id: Option<Uuid>,
}

/// Role with its granted actions, as listed by `GET /api/roles`
#[derive(Debug, Serialize)]
pub struct RoleInfo {
    pub role: UserRole,
    pub actions: Vec<ActionInfo>,
}

#[derive(Debug, Serialize)]
pub struct ActionInfo {
    pub action: Action,
    pub description: &'static str,
}

impl From<UserRole> for RoleInfo {
    fn from(role: UserRole) -> Self {
        Self {
            role,
            actions: role
                .permissions()
                .iter()
                .map(|action| ActionInfo {
                    action: *action,
                    description: action.description(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_admin_can_create_large_loans() {
        for role in UserRole::ALL {
            assert_eq!(role.can(Action::CreateLargeLoan), role == UserRole::Admin);
        }
    }

    #[test]
    fn test_collector_permissions() {
        assert!(UserRole::Collector.can(Action::RecordGroupCollections));
        assert!(UserRole::Collector.can(Action::PerformCut));
        assert!(!UserRole::Collector.can(Action::CreateLoan));
    }

    #[test]
    fn test_general_reports_are_director_and_up() {
        assert!(!UserRole::Manager.can(Action::ViewGeneralReports));
        assert!(UserRole::Director.can(Action::ViewGeneralReports));
        assert!(UserRole::Admin.can(Action::ViewGeneralReports));
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in UserRole::ALL {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("owner"), None);
    }
}
