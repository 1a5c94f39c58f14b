//! Publication operations: authoring, publishing, and the access list

use super::access::{can_view, GrantOutcome, RevokeOutcome};
use super::publication::{Publication, PublicationStatus, Visibility};
use crate::core_member::User;
use crate::core_model::{InterestId, PublicationId, UserId};
use crate::core_notify::{FanoutOutcome, NotificationFanout, NotifyError};
use crate::core_role::{Action, Role};
use crate::core_store::{CommunityStore, StorageError};
use crate::metrics::ACCESS_GRANTS;
use metrics::counter;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Publication operation errors
#[derive(Debug, thiserror::Error)]
pub enum PublicationError {
    #[error("Publication not found")]
    NotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Interest not found")]
    InterestNotFound,

    #[error("Operation not permitted for this role")]
    NotAuthorized,

    #[error("Access cannot be granted by role to {0} accounts")]
    InvalidGrantRole(Role),

    #[error("Archived publications cannot be published")]
    Archived,

    #[error("Invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Manager for publications and their access lists
pub trait PublicationManager {
    /// Author a new publication. It starts in `draft`.
    fn create_publication(
        &self,
        actor: &User,
        title: &str,
        content: &str,
        visibility: Visibility,
    ) -> Result<Publication, PublicationError>;

    /// Fetch without a visibility check (orchestration / staff tooling)
    fn get_publication(&self, id: PublicationId) -> Result<Publication, PublicationError>;

    /// Tag the publication with an interest keyword. Returns `false` when
    /// the tag was already present.
    fn tag_interest(
        &self,
        actor: &User,
        publication: PublicationId,
        interest: InterestId,
    ) -> Result<bool, PublicationError>;

    /// Move the publication into `active` and notify matched members.
    ///
    /// Publishing an already-active publication leaves the status alone and
    /// re-runs the fan-out; the uniqueness constraint keeps previously
    /// notified members from hearing about it twice.
    fn publish(
        &self,
        actor: &User,
        publication: PublicationId,
    ) -> Result<FanoutOutcome, PublicationError>;

    /// Move the publication into `archived`
    fn archive(&self, actor: &User, publication: PublicationId) -> Result<(), PublicationError>;

    /// Visibility decision for one reader, evaluated fresh from the store
    fn can_view(&self, user: &User, publication: PublicationId)
        -> Result<bool, PublicationError>;

    /// Fetch enforcing the visibility decision
    fn view_publication(
        &self,
        user: &User,
        publication: PublicationId,
    ) -> Result<Publication, PublicationError>;

    /// Grant explicit access to specific accounts and/or everyone currently
    /// holding the named roles (staff only).
    ///
    /// Role grants are a snapshot: accounts joining the role later gain
    /// nothing automatically. Only `interested` and `member` are valid role
    /// targets; staff already see everything.
    fn grant_access(
        &self,
        actor: &User,
        publication: PublicationId,
        user_ids: &[UserId],
        roles: &[Role],
    ) -> Result<GrantOutcome, PublicationError>;

    /// Mirror of [`PublicationManager::grant_access`]; removing an absent
    /// grant is a no-op.
    fn revoke_access(
        &self,
        actor: &User,
        publication: PublicationId,
        user_ids: &[UserId],
        roles: &[Role],
    ) -> Result<RevokeOutcome, PublicationError>;
}

/// Store-backed `PublicationManager`
#[derive(Clone)]
pub struct PublicationManagerImpl {
    store: CommunityStore,
    fanout: NotificationFanout,
}

impl PublicationManagerImpl {
    pub fn new(store: CommunityStore) -> Self {
        let fanout = NotificationFanout::new(store.clone());
        Self { store, fanout }
    }

    fn load(&self, id: PublicationId) -> Result<Publication, PublicationError> {
        self.store.get_publication(id)?.ok_or(PublicationError::NotFound)
    }

    /// Authors may touch their own work; staff may touch anything
    fn check_author_or_staff(
        actor: &User,
        publication: &Publication,
    ) -> Result<(), PublicationError> {
        if actor.role.allows(Action::Update) || actor.id == publication.author_id {
            Ok(())
        } else {
            Err(PublicationError::NotAuthorized)
        }
    }

    /// Resolve grant targets: explicit ids plus a snapshot of every active
    /// account currently holding one of the named roles.
    fn resolve_targets(
        &self,
        user_ids: &[UserId],
        roles: &[Role],
    ) -> Result<BTreeSet<UserId>, PublicationError> {
        for role in roles {
            if role.is_staff() {
                return Err(PublicationError::InvalidGrantRole(*role));
            }
        }

        let mut targets = BTreeSet::new();
        for &id in user_ids {
            if !self.store.user_exists(id)? {
                return Err(PublicationError::UserNotFound);
            }
            targets.insert(id);
        }
        for &role in roles {
            for user in self.store.list_users_by_role(role, false)? {
                targets.insert(user.id);
            }
        }
        Ok(targets)
    }
}

impl PublicationManager for PublicationManagerImpl {
    fn create_publication(
        &self,
        actor: &User,
        title: &str,
        content: &str,
        visibility: Visibility,
    ) -> Result<Publication, PublicationError> {
        if !actor.role.allows(Action::Create) {
            return Err(PublicationError::NotAuthorized);
        }
        if title.trim().is_empty() {
            return Err(PublicationError::InvalidField {
                field: "title",
                reason: "must not be empty".to_string(),
            });
        }

        let publication =
            self.store
                .create_publication(title.trim(), content, visibility, actor.id)?;
        info!(
            publication = %publication.id,
            author = %actor.id,
            visibility = %visibility,
            "created publication"
        );
        Ok(publication)
    }

    fn get_publication(&self, id: PublicationId) -> Result<Publication, PublicationError> {
        self.load(id)
    }

    fn tag_interest(
        &self,
        actor: &User,
        publication: PublicationId,
        interest: InterestId,
    ) -> Result<bool, PublicationError> {
        let item = self.load(publication)?;
        Self::check_author_or_staff(actor, &item)?;
        self.store.tag_publication_interest(publication, interest)
    }

    fn publish(
        &self,
        actor: &User,
        publication: PublicationId,
    ) -> Result<FanoutOutcome, PublicationError> {
        let mut item = self.load(publication)?;
        Self::check_author_or_staff(actor, &item)?;

        match item.status {
            PublicationStatus::Archived => return Err(PublicationError::Archived),
            PublicationStatus::Active => {
                debug!(publication = %item.id, "already active, re-running fan-out");
            }
            PublicationStatus::Draft | PublicationStatus::Pending => {
                self.store
                    .set_publication_status(publication, PublicationStatus::Active)?;
                item.status = PublicationStatus::Active;
                info!(publication = %item.id, "published");
            }
        }

        Ok(self.fanout.dispatch(&item)?)
    }

    fn archive(&self, actor: &User, publication: PublicationId) -> Result<(), PublicationError> {
        let item = self.load(publication)?;
        Self::check_author_or_staff(actor, &item)?;

        self.store
            .set_publication_status(publication, PublicationStatus::Archived)?;
        info!(publication = %publication, actor = %actor.id, "archived");
        Ok(())
    }

    fn can_view(
        &self,
        user: &User,
        publication: PublicationId,
    ) -> Result<bool, PublicationError> {
        let item = self.load(publication)?;
        let has_grant = self.store.has_access_grant(publication, user.id)?;
        Ok(can_view(user, &item, has_grant))
    }

    fn view_publication(
        &self,
        user: &User,
        publication: PublicationId,
    ) -> Result<Publication, PublicationError> {
        let item = self.load(publication)?;
        let has_grant = self.store.has_access_grant(publication, user.id)?;
        if can_view(user, &item, has_grant) {
            Ok(item)
        } else {
            Err(PublicationError::NotAuthorized)
        }
    }

    fn grant_access(
        &self,
        actor: &User,
        publication: PublicationId,
        user_ids: &[UserId],
        roles: &[Role],
    ) -> Result<GrantOutcome, PublicationError> {
        self.load(publication)?;
        if !actor.role.allows(Action::GrantAccess) {
            return Err(PublicationError::NotAuthorized);
        }

        let targets = self.resolve_targets(user_ids, roles)?;
        let mut outcome = GrantOutcome::default();
        for target in targets {
            if self.store.insert_access_grant(publication, target)? {
                outcome.granted.push(target);
            } else {
                outcome.already_granted.push(target);
            }
        }

        counter!(ACCESS_GRANTS).increment(outcome.granted.len() as u64);
        info!(
            publication = %publication,
            actor = %actor.id,
            granted = outcome.granted.len(),
            already_granted = outcome.already_granted.len(),
            "granted access"
        );
        Ok(outcome)
    }

    fn revoke_access(
        &self,
        actor: &User,
        publication: PublicationId,
        user_ids: &[UserId],
        roles: &[Role],
    ) -> Result<RevokeOutcome, PublicationError> {
        self.load(publication)?;
        if !actor.role.allows(Action::GrantAccess) {
            return Err(PublicationError::NotAuthorized);
        }

        let targets = self.resolve_targets(user_ids, roles)?;
        let mut outcome = RevokeOutcome::default();
        for target in targets {
            if self.store.delete_access_grant(publication, target)? {
                outcome.revoked.push(target);
            } else {
                outcome.not_granted.push(target);
            }
        }

        info!(
            publication = %publication,
            actor = %actor.id,
            revoked = outcome.revoked.len(),
            "revoked access"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_member::{MemberManager, MemberManagerImpl};

    struct Fixture {
        publications: PublicationManagerImpl,
        members: MemberManagerImpl,
    }

    fn setup() -> Fixture {
        let store = CommunityStore::memory().unwrap();
        Fixture {
            publications: PublicationManagerImpl::new(store.clone()),
            members: MemberManagerImpl::new(store),
        }
    }

    impl Fixture {
        fn user(&self, name: &str, role: Role) -> User {
            self.members
                .register_user(name, &format!("{name}@example.org"), role)
                .unwrap()
        }
    }

    #[test]
    fn test_interested_cannot_author() {
        let fx = setup();
        let guest = fx.user("guest", Role::Interested);

        let result =
            fx.publications
                .create_publication(&guest, "title", "content", Visibility::Public);
        assert!(matches!(result, Err(PublicationError::NotAuthorized)));
    }

    #[test]
    fn test_author_always_views_own_draft() {
        let fx = setup();
        let author = fx.user("alice", Role::Member);
        let item = fx
            .publications
            .create_publication(&author, "notes", "...", Visibility::Private)
            .unwrap();

        assert!(fx.publications.can_view(&author, item.id).unwrap());
    }

    #[test]
    fn test_private_item_needs_a_grant() {
        let fx = setup();
        let author = fx.user("alice", Role::Member);
        let reader = fx.user("bob", Role::Member);
        let staff = fx.user("carol", Role::Coordinator);
        let item = fx
            .publications
            .create_publication(&author, "notes", "...", Visibility::Private)
            .unwrap();
        fx.publications.publish(&author, item.id).unwrap();

        assert!(!fx.publications.can_view(&reader, item.id).unwrap());

        fx.publications
            .grant_access(&staff, item.id, &[reader.id], &[])
            .unwrap();
        assert!(fx.publications.can_view(&reader, item.id).unwrap());
    }

    #[test]
    fn test_grant_is_idempotent() {
        let fx = setup();
        let author = fx.user("alice", Role::Member);
        let reader = fx.user("bob", Role::Member);
        let staff = fx.user("carol", Role::Mentor);
        let item = fx
            .publications
            .create_publication(&author, "notes", "...", Visibility::Private)
            .unwrap();

        let first = fx
            .publications
            .grant_access(&staff, item.id, &[reader.id, reader.id], &[])
            .unwrap();
        assert_eq!(first.granted, vec![reader.id]);
        assert!(first.already_granted.is_empty());

        let second = fx
            .publications
            .grant_access(&staff, item.id, &[reader.id], &[])
            .unwrap();
        assert!(second.granted.is_empty());
        assert_eq!(second.already_granted, vec![reader.id]);
    }

    #[test]
    fn test_grant_requires_staff() {
        let fx = setup();
        let author = fx.user("alice", Role::Member);
        let reader = fx.user("bob", Role::Member);
        let item = fx
            .publications
            .create_publication(&author, "notes", "...", Visibility::Private)
            .unwrap();

        let result = fx
            .publications
            .grant_access(&author, item.id, &[reader.id], &[]);
        assert!(matches!(result, Err(PublicationError::NotAuthorized)));
    }

    #[test]
    fn test_role_grant_rejects_staff_roles() {
        let fx = setup();
        let author = fx.user("alice", Role::Member);
        let staff = fx.user("carol", Role::Mentor);
        let item = fx
            .publications
            .create_publication(&author, "notes", "...", Visibility::Private)
            .unwrap();

        let result = fx
            .publications
            .grant_access(&staff, item.id, &[], &[Role::Coordinator]);
        assert!(matches!(
            result,
            Err(PublicationError::InvalidGrantRole(Role::Coordinator))
        ));
    }

    #[test]
    fn test_role_grant_is_a_snapshot() {
        let fx = setup();
        let author = fx.user("alice", Role::Member);
        let staff = fx.user("carol", Role::Mentor);
        let before = fx.user("bob", Role::Interested);
        let item = fx
            .publications
            .create_publication(&author, "notes", "...", Visibility::Private)
            .unwrap();

        let outcome = fx
            .publications
            .grant_access(&staff, item.id, &[], &[Role::Interested])
            .unwrap();
        assert_eq!(outcome.granted, vec![before.id]);

        // Joins the role after the grant: no access.
        let after = fx.user("dan", Role::Interested);
        assert!(fx.publications.can_view(&before, item.id).unwrap());
        assert!(!fx.publications.can_view(&after, item.id).unwrap());
    }

    #[test]
    fn test_role_grant_skips_deactivated_accounts() {
        let fx = setup();
        let author = fx.user("alice", Role::Member);
        let staff = fx.user("carol", Role::Mentor);
        let gone = fx.user("bob", Role::Interested);
        fx.members.deactivate_user(&staff, gone.id).unwrap();

        let item = fx
            .publications
            .create_publication(&author, "notes", "...", Visibility::Private)
            .unwrap();
        let outcome = fx
            .publications
            .grant_access(&staff, item.id, &[], &[Role::Interested])
            .unwrap();
        assert!(outcome.granted.is_empty());
    }

    #[test]
    fn test_revoke_missing_grant_is_a_no_op() {
        let fx = setup();
        let author = fx.user("alice", Role::Member);
        let reader = fx.user("bob", Role::Member);
        let staff = fx.user("carol", Role::Mentor);
        let item = fx
            .publications
            .create_publication(&author, "notes", "...", Visibility::Private)
            .unwrap();

        let outcome = fx
            .publications
            .revoke_access(&staff, item.id, &[reader.id], &[])
            .unwrap();
        assert!(outcome.revoked.is_empty());
        assert_eq!(outcome.not_granted, vec![reader.id]);
    }

    #[test]
    fn test_publish_from_archived_is_rejected() {
        let fx = setup();
        let author = fx.user("alice", Role::Member);
        let item = fx
            .publications
            .create_publication(&author, "notes", "...", Visibility::Public)
            .unwrap();
        fx.publications.archive(&author, item.id).unwrap();

        let result = fx.publications.publish(&author, item.id);
        assert!(matches!(result, Err(PublicationError::Archived)));
    }

    #[test]
    fn test_publish_makes_public_item_readable() {
        let fx = setup();
        let author = fx.user("alice", Role::Member);
        let reader = fx.user("guest", Role::Interested);
        let item = fx
            .publications
            .create_publication(&author, "notes", "...", Visibility::Public)
            .unwrap();

        assert!(!fx.publications.can_view(&reader, item.id).unwrap());
        fx.publications.publish(&author, item.id).unwrap();
        assert!(fx.publications.can_view(&reader, item.id).unwrap());
    }
}
