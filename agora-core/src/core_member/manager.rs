//! Member management operations
//!
//! Every operation takes the acting user explicitly; nothing here reads an
//! ambient "current user".

use super::interest::{normalize_keyword, Interest};
use super::user::User;
use crate::core_model::{InterestId, UserId};
use crate::core_role::{Action, Role};
use crate::core_store::{CommunityStore, StorageError};
use tracing::info;

/// Member and interest operation errors
#[derive(Debug, thiserror::Error)]
pub enum MemberError {
    #[error("User not found")]
    UserNotFound,

    #[error("Email is already registered")]
    DuplicateEmail,

    #[error("Interest keyword already exists")]
    DuplicateInterest,

    #[error("Interest not found")]
    InterestNotFound,

    #[error("Operation not permitted for this role")]
    NotAuthorized,

    #[error("Accounts cannot change their own role")]
    CannotChangeOwnRole,

    #[error("Invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Manager for accounts and declared interests
pub trait MemberManager {
    /// Register a new account. Registration itself is driven by the
    /// out-of-scope auth layer, so there is no acting user here.
    fn register_user(&self, display_name: &str, email: &str, role: Role)
        -> Result<User, MemberError>;

    /// Fetch an account by id
    fn get_user(&self, id: UserId) -> Result<User, MemberError>;

    /// Soft-delete an account. Staff may deactivate anyone; everyone may
    /// deactivate themself. Idempotent.
    fn deactivate_user(&self, actor: &User, target: UserId) -> Result<(), MemberError>;

    /// Change another account's role. Mentor only, never the actor's own
    /// account.
    fn change_role(&self, actor: &User, target: UserId, new_role: Role)
        -> Result<(), MemberError>;

    /// All accounts currently holding `role`. Deactivated accounts are
    /// excluded unless asked for explicitly.
    fn list_users_by_role(
        &self,
        role: Role,
        include_deactivated: bool,
    ) -> Result<Vec<User>, MemberError>;

    /// Add a keyword to the community vocabulary (staff only)
    fn create_interest(&self, actor: &User, keyword: &str) -> Result<Interest, MemberError>;

    /// Remove a keyword from the vocabulary (staff only)
    fn delete_interest(&self, actor: &User, interest: InterestId) -> Result<(), MemberError>;

    /// Declare an interest on the actor's own profile. Returns `false` when
    /// the interest was already declared (a report, not an error).
    fn declare_interest(&self, actor: &User, interest: InterestId) -> Result<bool, MemberError>;

    /// Remove an interest from the actor's own profile. Returns `false`
    /// when nothing was declared.
    fn retract_interest(&self, actor: &User, interest: InterestId) -> Result<bool, MemberError>;

    /// Interests declared on a profile
    fn list_declared_interests(&self, user: UserId) -> Result<Vec<Interest>, MemberError>;
}

/// Store-backed `MemberManager`
#[derive(Clone)]
pub struct MemberManagerImpl {
    store: CommunityStore,
}

impl MemberManagerImpl {
    pub fn new(store: CommunityStore) -> Self {
        Self { store }
    }

    fn validate_display_name(name: &str) -> Result<(), MemberError> {
        if name.trim().is_empty() {
            return Err(MemberError::InvalidField {
                field: "display_name",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    fn validate_email(email: &str) -> Result<(), MemberError> {
        if email.trim().is_empty() || !email.contains('@') {
            return Err(MemberError::InvalidField {
                field: "email",
                reason: "must be a valid address".to_string(),
            });
        }
        Ok(())
    }
}

impl MemberManager for MemberManagerImpl {
    fn register_user(
        &self,
        display_name: &str,
        email: &str,
        role: Role,
    ) -> Result<User, MemberError> {
        Self::validate_display_name(display_name)?;
        Self::validate_email(email)?;

        let user = self.store.create_user(display_name.trim(), email.trim(), role)?;
        info!(user = %user.id, role = %user.role, "registered account");
        Ok(user)
    }

    fn get_user(&self, id: UserId) -> Result<User, MemberError> {
        self.store.get_user(id)?.ok_or(MemberError::UserNotFound)
    }

    fn deactivate_user(&self, actor: &User, target: UserId) -> Result<(), MemberError> {
        if !actor.role.allows(Action::Delete) && actor.id != target {
            return Err(MemberError::NotAuthorized);
        }

        self.store.deactivate_user(target)?;
        info!(actor = %actor.id, user = %target, "deactivated account");
        Ok(())
    }

    fn change_role(
        &self,
        actor: &User,
        target: UserId,
        new_role: Role,
    ) -> Result<(), MemberError> {
        if !actor.role.allows(Action::ChangeRole) {
            return Err(MemberError::NotAuthorized);
        }
        if actor.id == target {
            return Err(MemberError::CannotChangeOwnRole);
        }

        self.store.set_user_role(target, new_role)?;
        info!(actor = %actor.id, user = %target, role = %new_role, "changed role");
        Ok(())
    }

    fn list_users_by_role(
        &self,
        role: Role,
        include_deactivated: bool,
    ) -> Result<Vec<User>, MemberError> {
        Ok(self.store.list_users_by_role(role, include_deactivated)?)
    }

    fn create_interest(&self, actor: &User, keyword: &str) -> Result<Interest, MemberError> {
        // The interest vocabulary is staff-managed.
        if !actor.role.is_staff() {
            return Err(MemberError::NotAuthorized);
        }

        let keyword = normalize_keyword(keyword);
        if keyword.is_empty() {
            return Err(MemberError::InvalidField {
                field: "keyword",
                reason: "must not be empty".to_string(),
            });
        }

        let interest = self.store.create_interest(&keyword)?;
        info!(actor = %actor.id, interest = %interest.id, keyword, "created interest");
        Ok(interest)
    }

    fn delete_interest(&self, actor: &User, interest: InterestId) -> Result<(), MemberError> {
        if !actor.role.is_staff() {
            return Err(MemberError::NotAuthorized);
        }

        self.store.delete_interest(interest)?;
        info!(actor = %actor.id, interest = %interest, "deleted interest");
        Ok(())
    }

    fn declare_interest(&self, actor: &User, interest: InterestId) -> Result<bool, MemberError> {
        self.store.declare_interest(actor.id, interest)
    }

    fn retract_interest(&self, actor: &User, interest: InterestId) -> Result<bool, MemberError> {
        Ok(self.store.retract_interest(actor.id, interest)?)
    }

    fn list_declared_interests(&self, user: UserId) -> Result<Vec<Interest>, MemberError> {
        Ok(self.store.list_declared_interests(user)?)
    }
}
