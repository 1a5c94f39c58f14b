//! Events and the participation lifecycle
//!
//! A participation row exists at most once per `(event, user)` pair and
//! moves along a small state machine:
//!
//! ```text
//! enrolled ──> attended
//!     │  \──> absent
//!     └───> cancelled ──> enrolled   (re-enrollment reuses the row)
//! ```
//!
//! `enrolled` and `attended` rows hold a seat against the event capacity;
//! the capacity check and the enrollment write always run inside one
//! write-locking transaction.

pub mod event;
pub mod manager;
pub mod participation;

pub use event::{Event, EventStatus, Modality};
pub use manager::{EventError, EventManager, EventManagerImpl};
pub use participation::{BulkOutcome, Participation, ParticipationStatus};
