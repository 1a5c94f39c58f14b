//! SQL persistence for the community engine
//!
//! One SQLite database behind an r2d2 connection pool. Uniqueness
//! invariants (one participation per `(event, user)`, one access grant per
//! `(publication, user)`, one notification per `(user, publication)`) live
//! in the schema, not in application code.

pub mod migrations;
pub mod sql_store;

pub use sql_store::{CommunityStore, StorageError};
