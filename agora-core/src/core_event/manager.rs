//! Event operations: scheduling, enrollment, attendance

use super::event::{Event, EventStatus, Modality};
use super::participation::{BulkOutcome, Participation, ParticipationStatus};
use crate::core_member::User;
use crate::core_model::{EventId, Timestamp, UserId};
use crate::core_role::Action;
use crate::core_store::{CommunityStore, StorageError};
use crate::metrics::{ATTENDANCE_MARKS, ENROLLMENTS, ENROLLMENTS_REJECTED};
use metrics::counter;
use tracing::{info, warn};

/// Event and participation operation errors
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Event not found")]
    EventNotFound,

    #[error("Event name already exists")]
    DuplicateName,

    #[error("Event must not end before it starts")]
    InvalidSchedule,

    #[error("Event no longer accepts enrollment changes")]
    EventNotOpen,

    #[error("Account is already enrolled")]
    DuplicateEnrollment,

    #[error("Event is at capacity")]
    CapacityExceeded,

    #[error("Account is not enrolled")]
    NotEnrolled,

    #[error("Operation not permitted for this role")]
    NotAuthorized,

    #[error("Invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Manager for events and their participation rosters
pub trait EventManager {
    /// Schedule a new event (staff only)
    fn create_event(
        &self,
        actor: &User,
        name: &str,
        starts_at: Timestamp,
        ends_at: Timestamp,
        modality: Modality,
        capacity: Option<u32>,
    ) -> Result<Event, EventError>;

    /// Fetch an event by id
    fn get_event(&self, id: EventId) -> Result<Event, EventError>;

    /// Move the event itself to `finished` or `cancelled` (staff only)
    fn set_event_status(
        &self,
        actor: &User,
        event: EventId,
        status: EventStatus,
    ) -> Result<(), EventError>;

    /// Enroll the actor themself. The capacity check and the write run as
    /// one atomic unit, so concurrent enrollments cannot overshoot.
    fn enroll(&self, actor: &User, event: EventId) -> Result<Participation, EventError>;

    /// Cancel the actor's own enrollment, freeing the seat
    fn cancel_enrollment(&self, actor: &User, event: EventId) -> Result<(), EventError>;

    /// Mark each id as having attended. Ids without an open enrollment are
    /// reported in `failed`; the batch never aborts.
    fn mark_attended(
        &self,
        actor: &User,
        event: EventId,
        users: &[UserId],
    ) -> Result<BulkOutcome, EventError>;

    /// Mirror of [`EventManager::mark_attended`] for no-shows
    fn mark_absent(
        &self,
        actor: &User,
        event: EventId,
        users: &[UserId],
    ) -> Result<BulkOutcome, EventError>;

    /// Seats currently held (`enrolled` + `attended`)
    fn count_active(&self, event: EventId) -> Result<u32, EventError>;

    /// Participation rows for staff reporting. Deactivated accounts are
    /// excluded unless asked for explicitly.
    fn roster(
        &self,
        actor: &User,
        event: EventId,
        include_deactivated: bool,
    ) -> Result<Vec<Participation>, EventError>;
}

/// Store-backed `EventManager`
#[derive(Clone)]
pub struct EventManagerImpl {
    store: CommunityStore,
}

impl EventManagerImpl {
    pub fn new(store: CommunityStore) -> Self {
        Self { store }
    }

    fn load(&self, id: EventId) -> Result<Event, EventError> {
        self.store.get_event(id)?.ok_or(EventError::EventNotFound)
    }

    fn mark(
        &self,
        actor: &User,
        event: EventId,
        users: &[UserId],
        status: ParticipationStatus,
    ) -> Result<BulkOutcome, EventError> {
        if !actor.role.allows(Action::MarkAttendance) {
            return Err(EventError::NotAuthorized);
        }
        self.load(event)?;

        let mut outcome = BulkOutcome::default();
        for &user in users {
            if self.store.set_attendance(event, user, status)? {
                outcome.succeeded.push(user);
            } else {
                outcome.failed.push(user);
            }
        }

        counter!(ATTENDANCE_MARKS).increment(outcome.succeeded.len() as u64);
        if !outcome.failed.is_empty() {
            warn!(
                event = %event,
                failed = outcome.failed.len(),
                status = %status,
                "attendance marks skipped ids without an open enrollment"
            );
        }
        info!(
            event = %event,
            actor = %actor.id,
            status = %status,
            succeeded = outcome.succeeded.len(),
            "marked attendance"
        );
        Ok(outcome)
    }
}

impl EventManager for EventManagerImpl {
    fn create_event(
        &self,
        actor: &User,
        name: &str,
        starts_at: Timestamp,
        ends_at: Timestamp,
        modality: Modality,
        capacity: Option<u32>,
    ) -> Result<Event, EventError> {
        // Events are organized by staff.
        if !actor.role.is_staff() {
            return Err(EventError::NotAuthorized);
        }
        if name.trim().is_empty() {
            return Err(EventError::InvalidField {
                field: "name",
                reason: "must not be empty".to_string(),
            });
        }
        if ends_at < starts_at {
            return Err(EventError::InvalidSchedule);
        }
        if capacity == Some(0) {
            return Err(EventError::InvalidField {
                field: "capacity",
                reason: "must be at least 1 when set".to_string(),
            });
        }

        let event = self
            .store
            .create_event(name.trim(), starts_at, ends_at, modality, capacity)?;
        info!(event = %event.id, name = %event.name, ?capacity, "created event");
        Ok(event)
    }

    fn get_event(&self, id: EventId) -> Result<Event, EventError> {
        self.load(id)
    }

    fn set_event_status(
        &self,
        actor: &User,
        event: EventId,
        status: EventStatus,
    ) -> Result<(), EventError> {
        if !actor.role.is_staff() {
            return Err(EventError::NotAuthorized);
        }

        self.store.set_event_status(event, status)?;
        info!(event = %event, actor = %actor.id, status = %status, "changed event status");
        Ok(())
    }

    fn enroll(&self, actor: &User, event: EventId) -> Result<Participation, EventError> {
        let result = self.store.enroll(event, actor.id);
        match &result {
            Ok(_) => {
                counter!(ENROLLMENTS).increment(1);
                info!(event = %event, user = %actor.id, "enrolled");
            }
            Err(EventError::CapacityExceeded) => {
                counter!(ENROLLMENTS_REJECTED).increment(1);
            }
            Err(_) => {}
        }
        result
    }

    fn cancel_enrollment(&self, actor: &User, event: EventId) -> Result<(), EventError> {
        self.store.cancel_enrollment(event, actor.id)?;
        info!(event = %event, user = %actor.id, "cancelled enrollment");
        Ok(())
    }

    fn mark_attended(
        &self,
        actor: &User,
        event: EventId,
        users: &[UserId],
    ) -> Result<BulkOutcome, EventError> {
        self.mark(actor, event, users, ParticipationStatus::Attended)
    }

    fn mark_absent(
        &self,
        actor: &User,
        event: EventId,
        users: &[UserId],
    ) -> Result<BulkOutcome, EventError> {
        self.mark(actor, event, users, ParticipationStatus::Absent)
    }

    fn count_active(&self, event: EventId) -> Result<u32, EventError> {
        self.load(event)?;
        Ok(self.store.count_active(event)?)
    }

    fn roster(
        &self,
        actor: &User,
        event: EventId,
        include_deactivated: bool,
    ) -> Result<Vec<Participation>, EventError> {
        if !actor.role.allows(Action::ViewAny) {
            return Err(EventError::NotAuthorized);
        }
        self.load(event)?;
        Ok(self.store.roster(event, include_deactivated)?)
    }
}
