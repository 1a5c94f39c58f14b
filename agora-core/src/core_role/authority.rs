//! Roles and the permission table

use crate::core_model::EnumParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Membership roles, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Signed up but not yet a full member
    Interested,
    /// Full member, owns the content they author
    Member,
    /// Staff role, manages events and publications
    Coordinator,
    /// Staff role, additionally administers accounts
    Mentor,
}

/// Actions a caller may attempt against engine resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read any resource regardless of ownership or visibility
    ViewAny,
    /// Read a resource the caller owns
    ViewOwned,
    /// Author new content such as publications
    Create,
    /// Mutate a resource the caller does not own
    Update,
    /// Delete a resource the caller does not own
    Delete,
    /// Open a private publication to specific accounts
    GrantAccess,
    /// Change another account's role
    ChangeRole,
    /// Record attendance for an event roster
    MarkAttendance,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Interested => "interested",
            Role::Member => "member",
            Role::Coordinator => "coordinator",
            Role::Mentor => "mentor",
        }
    }

    /// Staff roles see and manage every resource
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Coordinator | Role::Mentor)
    }

    /// The permission table. Ownership is not in scope here: a manager that
    /// accepts owner mutations checks `allows(Update) || actor == owner`.
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::ViewOwned => true,
            Action::Create => !matches!(self, Role::Interested),
            Action::ViewAny
            | Action::Update
            | Action::Delete
            | Action::GrantAccess
            | Action::MarkAttendance => self.is_staff(),
            Action::ChangeRole => matches!(self, Role::Mentor),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interested" => Ok(Role::Interested),
            "member" => Ok(Role::Member),
            "coordinator" => Ok(Role::Coordinator),
            "mentor" => Ok(Role::Mentor),
            other => Err(EnumParseError::new("role", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ROLES: [Role; 4] = [
        Role::Interested,
        Role::Member,
        Role::Coordinator,
        Role::Mentor,
    ];

    #[test]
    fn test_everyone_views_owned() {
        for role in ALL_ROLES {
            assert!(role.allows(Action::ViewOwned), "{role} should view owned");
        }
    }

    #[test]
    fn test_only_staff_view_any() {
        assert!(!Role::Interested.allows(Action::ViewAny));
        assert!(!Role::Member.allows(Action::ViewAny));
        assert!(Role::Coordinator.allows(Action::ViewAny));
        assert!(Role::Mentor.allows(Action::ViewAny));
    }

    #[test]
    fn test_interested_cannot_create() {
        assert!(!Role::Interested.allows(Action::Create));
        assert!(Role::Member.allows(Action::Create));
    }

    #[test]
    fn test_grant_access_is_staff_only() {
        for role in ALL_ROLES {
            assert_eq!(role.allows(Action::GrantAccess), role.is_staff());
        }
    }

    #[test]
    fn test_change_role_is_mentor_only() {
        assert!(Role::Mentor.allows(Action::ChangeRole));
        assert!(!Role::Coordinator.allows(Action::ChangeRole));
        assert!(!Role::Member.allows(Action::ChangeRole));
        assert!(!Role::Interested.allows(Action::ChangeRole));
    }

    #[test]
    fn test_mark_attendance_is_staff_only() {
        for role in ALL_ROLES {
            assert_eq!(role.allows(Action::MarkAttendance), role.is_staff());
        }
    }

    #[test]
    fn test_role_parse_round_trip() {
        for role in ALL_ROLES {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_privilege_ordering() {
        assert!(Role::Interested < Role::Member);
        assert!(Role::Member < Role::Coordinator);
        assert!(Role::Coordinator < Role::Mentor);
    }
}
