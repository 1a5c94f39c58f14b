//! Interest matching

use super::notification::NotifyError;
use crate::core_model::UserId;
use crate::core_publication::Publication;
use crate::core_store::CommunityStore;

/// Computes which accounts should hear about a publication
#[derive(Clone)]
pub struct InterestMatcher {
    store: CommunityStore,
}

impl InterestMatcher {
    pub fn new(store: CommunityStore) -> Self {
        Self { store }
    }

    /// Active accounts whose declared interests intersect the publication's
    /// tags. The author never matches their own publication.
    pub fn matched_users(&self, publication: &Publication) -> Result<Vec<UserId>, NotifyError> {
        Ok(self
            .store
            .matched_users(publication.id, publication.author_id)?)
    }
}
