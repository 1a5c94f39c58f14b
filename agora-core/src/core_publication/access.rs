//! Visibility resolution and grant bookkeeping

use super::publication::{Publication, PublicationStatus, Visibility};
use crate::core_member::User;
use crate::core_model::UserId;
use crate::core_role::Action;
use serde::Serialize;

/// Decide whether `user` may read `publication`.
///
/// Precedence, first match wins:
/// 1. active public publications are readable by anyone
/// 2. authors always see their own work, whatever its state
/// 3. staff roles see everything
/// 4. an explicit grant opens one publication to one account
///
/// The caller supplies `has_explicit_grant` so this stays a pure decision
/// over already-loaded state.
pub fn can_view(user: &User, publication: &Publication, has_explicit_grant: bool) -> bool {
    if publication.visibility == Visibility::Public
        && publication.status == PublicationStatus::Active
    {
        return true;
    }
    if user.id == publication.author_id {
        return true;
    }
    if user.role.allows(Action::ViewAny) {
        return true;
    }
    has_explicit_grant
}

/// Report of a grant operation. Already-held grants are reported, not
/// treated as failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GrantOutcome {
    pub granted: Vec<UserId>,
    pub already_granted: Vec<UserId>,
}

/// Report of a revoke operation. Revoking a grant that never existed is a
/// no-op, reported under `not_granted`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RevokeOutcome {
    pub revoked: Vec<UserId>,
    pub not_granted: Vec<UserId>,
}
