//! Which groups a user may see in reports

use uuid::Uuid;

use crate::models::UserRole;

use super::model::ReportGroup;

/// Row filter derived from the requesting user's role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportScope {
    All,
    /// Groups on routes the user manages or supervises
    Routes(Uuid),
    /// Groups the user leads
    Led(Uuid),
    Nothing,
}

impl ReportScope {
    pub fn for_user(user_id: Uuid, role: UserRole) -> Self {
        match role {
            UserRole::Director | UserRole::Admin => ReportScope::All,
            UserRole::Manager | UserRole::Supervisor => ReportScope::Routes(user_id),
            UserRole::GroupLead => ReportScope::Led(user_id),
            UserRole::Collector => ReportScope::Nothing,
        }
    }

    pub fn includes(&self, group: &ReportGroup) -> bool {
        match *self {
            ReportScope::All => true,
            ReportScope::Routes(user) => {
                group.manager_id == Some(user) || group.supervisor_id == Some(user)
            }
            ReportScope::Led(user) => group.lead_user_id == Some(user),
            ReportScope::Nothing => false,
        }
    }

    pub fn filter(&self, groups: Vec<ReportGroup>) -> Vec<ReportGroup> {
        groups.into_iter().filter(|g| self.includes(g)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(lead: Option<Uuid>, manager: Option<Uuid>, supervisor: Option<Uuid>) -> ReportGroup {
        ReportGroup {
            group_id: Uuid::new_v4(),
            group_name: "Grupo".to_string(),
            route_id: Uuid::new_v4(),
            route_name: "Ruta".to_string(),
            lead_user_id: lead,
            lead_name: None,
            manager_id: manager,
            manager_name: None,
            supervisor_id: supervisor,
            supervisor_name: None,
        }
    }

    #[test]
    fn test_roles_map_to_scopes() {
        let user = Uuid::new_v4();
        assert_eq!(ReportScope::for_user(user, UserRole::Admin), ReportScope::All);
        assert_eq!(ReportScope::for_user(user, UserRole::Director), ReportScope::All);
        assert_eq!(ReportScope::for_user(user, UserRole::Manager), ReportScope::Routes(user));
        assert_eq!(ReportScope::for_user(user, UserRole::Supervisor), ReportScope::Routes(user));
        assert_eq!(ReportScope::for_user(user, UserRole::GroupLead), ReportScope::Led(user));
        assert_eq!(ReportScope::for_user(user, UserRole::Collector), ReportScope::Nothing);
    }

    #[test]
    fn test_route_staff_see_their_routes() {
        let manager = Uuid::new_v4();
        let supervisor = Uuid::new_v4();
        let groups = vec![
            group(None, Some(manager), Some(supervisor)),
            group(None, Some(Uuid::new_v4()), Some(supervisor)),
            group(None, Some(Uuid::new_v4()), None),
        ];

        assert_eq!(ReportScope::Routes(manager).filter(groups.clone()).len(), 1);
        assert_eq!(ReportScope::Routes(supervisor).filter(groups.clone()).len(), 2);
        assert_eq!(ReportScope::All.filter(groups.clone()).len(), 3);
        assert!(ReportScope::Nothing.filter(groups).is_empty());
    }
}
