//! Notification records

use crate::core_model::{NotificationId, PublicationId, Timestamp, UserId};
use crate::core_store::StorageError;
use serde::{Deserialize, Serialize};

/// A generated, recipient-read-only record pointing at a publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique identifier
    pub id: NotificationId,

    /// Recipient account
    pub user_id: UserId,

    /// The publication this notification points at
    pub publication_id: PublicationId,

    /// Whether the recipient has opened it
    pub read: bool,

    pub created_at: Timestamp,
}

/// Notification operation errors
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Publication not found")]
    PublicationNotFound,

    #[error("Notification not found")]
    NotificationNotFound,

    #[error("Operation not permitted for this role")]
    NotAuthorized,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
