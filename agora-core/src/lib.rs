//! Agora community engine
//!
//! The core behind a membership community backend: who may read a
//! publication, who holds a seat at an event, and who gets told when
//! something they care about is published.
//!
//! ## Architecture
//!
//! - `core_role` — the single role/action permission table
//! - `core_member` — accounts, soft deactivation, declared interests
//! - `core_publication` — publications, visibility resolution, access grants
//! - `core_event` — events and the capacity-checked participation machine
//! - `core_notify` — interest matching and idempotent notification fan-out
//! - `core_store` — SQLite persistence; uniqueness invariants live in the
//!   schema
//!
//! Callers pass the acting user into every operation; the engine never
//! reads ambient identity. All operations are synchronous and safe to retry
//! thanks to upsert/report-not-error semantics everywhere except the one
//! place ordering matters: enrollment, which serializes its capacity check
//! and write in a single write-locking transaction.

pub mod config;
pub mod core_event;
pub mod core_member;
pub mod core_model;
pub mod core_notify;
pub mod core_publication;
pub mod core_role;
pub mod core_store;
pub mod logging;
pub mod metrics;

pub use config::Config;
pub use core_store::{CommunityStore, StorageError};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogLevel};
