//! Publications and who may read them
//!
//! Visibility is resolved fresh on every read from four inputs, in order:
//! public+active status, authorship, staff role, explicit grant. Nothing is
//! cached on the publication row.

pub mod access;
pub mod manager;
pub mod publication;

pub use access::{can_view, GrantOutcome, RevokeOutcome};
pub use manager::{PublicationError, PublicationManager, PublicationManagerImpl};
pub use publication::{Publication, PublicationStatus, Visibility};
