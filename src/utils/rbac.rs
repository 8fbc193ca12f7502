// src/utils/rbac.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, utils::jwt::Claims};

/// Organisation role of a user inside their college.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "member_role", rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Owner,
    Admin,
    Recruiter,
    Member,
}

impl Role {
    /// Position in the role hierarchy; higher outranks lower.
    pub fn level(self) -> u8 {
        match self {
            Role::SuperAdmin => 100,
            Role::Owner => 90,
            Role::Admin => 80,
            Role::Recruiter => 50,
            Role::Member => 10,
        }
    }

    pub fn is_higher_than(self, other: Role) -> bool {
        self.level() > other.level()
    }

    /// Students only ever see the student view of questions and tests.
    pub fn is_student(self) -> bool {
        self == Role::Member
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Test,
    Question,
    Drive,
    Results,
    Settings,
    Members,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Publish,
    ManageRegistrations,
    Export,
    Invite,
    Remove,
    UpdateRole,
}

/// Capability table. Pure function over the closed role/resource/action sets.
pub fn has_permission(role: Role, resource: Resource, action: Action) -> bool {
    use Action::*;
    use Resource::*;

    match role {
        Role::SuperAdmin | Role::Owner => match resource {
            Test => matches!(action, Create | Read | Update | Delete | Publish),
            Question => matches!(action, Create | Read | Update | Delete),
            Drive => matches!(
                action,
                Create | Read | Update | Delete | ManageRegistrations
            ),
            Results => matches!(action, Read | Export),
            Settings => matches!(action, Read | Update),
            Members => matches!(action, Invite | Remove | UpdateRole),
        },
        Role::Admin => match resource {
            Test => matches!(action, Create | Read | Update | Delete | Publish),
            Question => matches!(action, Create | Read | Update | Delete),
            Drive => matches!(
                action,
                Create | Read | Update | Delete | ManageRegistrations
            ),
            Results => matches!(action, Read | Export),
            Settings => matches!(action, Read),
            Members => matches!(action, Invite),
        },
        Role::Recruiter => match resource {
            Drive => matches!(action, Read),
            Results => matches!(action, Read | Export),
            _ => false,
        },
        Role::Member => match resource {
            Test | Drive | Results => matches!(action, Read),
            _ => false,
        },
    }
}

/// Tenant check: the caller's active college must own the resource.
pub fn is_college_member(claims: &Claims, college_id: Uuid) -> bool {
    claims.college_id == college_id
}

/// Fails with `FORBIDDEN` unless the caller's role grants `action` on `resource`.
pub fn require_permission(
    claims: &Claims,
    resource: Resource,
    action: Action,
) -> Result<(), AppError> {
    if has_permission(claims.role, resource, action) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "You don't have permission to {:?} {:?}",
            action, resource
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn students_can_only_read() {
        assert!(has_permission(Role::Member, Resource::Test, Action::Read));
        assert!(!has_permission(Role::Member, Resource::Test, Action::Create));
        assert!(!has_permission(Role::Member, Resource::Question, Action::Read));
    }

    #[test]
    fn admins_manage_tests_but_not_roles() {
        assert!(has_permission(Role::Admin, Resource::Test, Action::Publish));
        assert!(has_permission(Role::Admin, Resource::Question, Action::Delete));
        assert!(!has_permission(Role::Admin, Resource::Members, Action::UpdateRole));
        assert!(!has_permission(Role::Admin, Resource::Settings, Action::Update));
    }

    #[test]
    fn recruiters_see_results_only() {
        assert!(has_permission(Role::Recruiter, Resource::Results, Action::Export));
        assert!(!has_permission(Role::Recruiter, Resource::Test, Action::Read));
    }

    #[test]
    fn hierarchy_orders_roles() {
        assert!(Role::Owner.is_higher_than(Role::Admin));
        assert!(!Role::Member.is_higher_than(Role::Recruiter));
    }
}
