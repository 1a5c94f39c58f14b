//! Member account data

use crate::core_model::{Timestamp, UserId};
use crate::core_role::Role;
use serde::{Deserialize, Serialize};

/// A registered community account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: UserId,

    /// Name shown to other members
    pub display_name: String,

    /// Login email, unique across the community
    pub email: String,

    /// Current role
    pub role: Role,

    /// When the account was registered
    pub created_at: Timestamp,

    /// Soft-deletion marker; set once, the account is never hard-deleted
    pub deactivated_at: Option<Timestamp>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.deactivated_at.is_none()
    }
}
