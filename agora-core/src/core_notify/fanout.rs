//! Notification fan-out

use super::matcher::InterestMatcher;
use super::notification::NotifyError;
use crate::core_model::UserId;
use crate::core_publication::Publication;
use crate::core_store::CommunityStore;
use crate::metrics::NOTIFICATIONS_CREATED;
use metrics::counter;
use serde::Serialize;
use tracing::info;

/// Report of one fan-out run. `skipped` accounts already held a
/// notification for the publication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FanoutOutcome {
    pub created: Vec<UserId>,
    pub skipped: Vec<UserId>,
}

/// Creates notification records for matched accounts.
///
/// Persistence only: delivery transport is a downstream consumer reading
/// the notification table, never called from here.
#[derive(Clone)]
pub struct NotificationFanout {
    store: CommunityStore,
    matcher: InterestMatcher,
}

impl NotificationFanout {
    pub fn new(store: CommunityStore) -> Self {
        let matcher = InterestMatcher::new(store.clone());
        Self { store, matcher }
    }

    /// Create at most one notification per matched account. Safe to re-run:
    /// the `(user, publication)` uniqueness constraint turns repeats into
    /// `skipped` entries.
    pub fn dispatch(&self, publication: &Publication) -> Result<FanoutOutcome, NotifyError> {
        let mut outcome = FanoutOutcome::default();
        for user in self.matcher.matched_users(publication)? {
            if self.store.insert_notification(user, publication.id)? {
                outcome.created.push(user);
            } else {
                outcome.skipped.push(user);
            }
        }

        counter!(NOTIFICATIONS_CREATED).increment(outcome.created.len() as u64);
        info!(
            publication = %publication.id,
            created = outcome.created.len(),
            skipped = outcome.skipped.len(),
            "dispatched notifications"
        );
        Ok(outcome)
    }
}
