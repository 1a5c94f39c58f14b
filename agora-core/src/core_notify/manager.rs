//! Recipient-facing notification operations

use super::notification::{Notification, NotifyError};
use crate::core_member::User;
use crate::core_model::NotificationId;
use crate::core_store::CommunityStore;

/// Manager for a recipient's own notifications
pub trait NotifyManager {
    /// Notifications addressed to the actor, newest first. Read ones are
    /// excluded unless asked for explicitly.
    fn list_notifications(
        &self,
        actor: &User,
        include_read: bool,
    ) -> Result<Vec<Notification>, NotifyError>;

    /// Mark one of the actor's notifications as read. Notifications are
    /// read-only to the recipient beyond this flag.
    fn mark_read(&self, actor: &User, notification: NotificationId) -> Result<(), NotifyError>;
}

/// Store-backed `NotifyManager`
#[derive(Clone)]
pub struct NotifyManagerImpl {
    store: CommunityStore,
}

impl NotifyManagerImpl {
    pub fn new(store: CommunityStore) -> Self {
        Self { store }
    }
}

impl NotifyManager for NotifyManagerImpl {
    fn list_notifications(
        &self,
        actor: &User,
        include_read: bool,
    ) -> Result<Vec<Notification>, NotifyError> {
        Ok(self.store.list_notifications(actor.id, include_read)?)
    }

    fn mark_read(&self, actor: &User, notification: NotificationId) -> Result<(), NotifyError> {
        // The recipient scoping doubles as the permission check.
        if self.store.mark_notification_read(notification, actor.id)? {
            Ok(())
        } else {
            Err(NotifyError::NotificationNotFound)
        }
    }
}
