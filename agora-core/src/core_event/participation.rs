//! Participation state machine

use crate::core_model::{EnumParseError, EventId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One account's relationship to one event. At most one row ever exists
/// per `(event, user)` pair; re-enrollment updates it in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participation {
    pub event_id: EventId,
    pub user_id: UserId,
    pub status: ParticipationStatus,
    /// When the current enrollment cycle began
    pub enrolled_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Lifecycle states of a participation row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationStatus {
    Enrolled,
    Attended,
    Absent,
    Cancelled,
}

impl ParticipationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipationStatus::Enrolled => "enrolled",
            ParticipationStatus::Attended => "attended",
            ParticipationStatus::Absent => "absent",
            ParticipationStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal for an enrollment cycle. Only `cancelled` frees the pair
    /// for a fresh cycle; `attended`/`absent` are attendance history and
    /// stay closed.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ParticipationStatus::Enrolled)
    }

    /// Rows holding a seat against the event capacity. Attendance implies
    /// prior enrollment, so it keeps the seat.
    pub fn counts_toward_capacity(&self) -> bool {
        matches!(
            self,
            ParticipationStatus::Enrolled | ParticipationStatus::Attended
        )
    }

    /// The full transition relation
    pub fn can_transition_to(&self, next: ParticipationStatus) -> bool {
        matches!(
            (self, next),
            (
                ParticipationStatus::Enrolled,
                ParticipationStatus::Attended
                    | ParticipationStatus::Absent
                    | ParticipationStatus::Cancelled,
            ) | (ParticipationStatus::Cancelled, ParticipationStatus::Enrolled)
        )
    }
}

impl fmt::Display for ParticipationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ParticipationStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enrolled" => Ok(ParticipationStatus::Enrolled),
            "attended" => Ok(ParticipationStatus::Attended),
            "absent" => Ok(ParticipationStatus::Absent),
            "cancelled" => Ok(ParticipationStatus::Cancelled),
            other => Err(EnumParseError::new("participation status", other)),
        }
    }
}

/// Per-id report for bulk transitions. A failing id never aborts the
/// batch; callers inspect both lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub succeeded: Vec<UserId>,
    pub failed: Vec<UserId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL: [ParticipationStatus; 4] = [
        ParticipationStatus::Enrolled,
        ParticipationStatus::Attended,
        ParticipationStatus::Absent,
        ParticipationStatus::Cancelled,
    ];

    #[test]
    fn test_enrolled_reaches_every_terminal() {
        for next in [
            ParticipationStatus::Attended,
            ParticipationStatus::Absent,
            ParticipationStatus::Cancelled,
        ] {
            assert!(ParticipationStatus::Enrolled.can_transition_to(next));
        }
    }

    #[test]
    fn test_only_cancellation_frees_the_pair() {
        assert!(ParticipationStatus::Cancelled.can_transition_to(ParticipationStatus::Enrolled));
        assert!(!ParticipationStatus::Attended.can_transition_to(ParticipationStatus::Enrolled));
        assert!(!ParticipationStatus::Absent.can_transition_to(ParticipationStatus::Enrolled));
    }

    #[test]
    fn test_capacity_accounting() {
        assert!(ParticipationStatus::Enrolled.counts_toward_capacity());
        assert!(ParticipationStatus::Attended.counts_toward_capacity());
        assert!(!ParticipationStatus::Absent.counts_toward_capacity());
        assert!(!ParticipationStatus::Cancelled.counts_toward_capacity());
    }

    #[test]
    fn test_status_parse_round_trip() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<ParticipationStatus>().unwrap(), status);
        }
    }

    fn status_strategy() -> impl Strategy<Value = ParticipationStatus> {
        prop::sample::select(ALL.to_vec())
    }

    proptest! {
        /// Every legal transition either starts from an open enrollment or
        /// is the one re-enrollment edge out of `cancelled`.
        #[test]
        fn prop_transitions_never_leave_attendance_history(
            from in status_strategy(),
            to in status_strategy(),
        ) {
            if from.can_transition_to(to) {
                prop_assert!(
                    from == ParticipationStatus::Enrolled
                        || (from == ParticipationStatus::Cancelled
                            && to == ParticipationStatus::Enrolled)
                );
            }
        }

        /// No sequence of legal transitions grows the seat count except by
        /// passing through an explicit enrollment.
        #[test]
        fn prop_seats_only_come_from_enrollment(
            steps in prop::collection::vec(status_strategy(), 1..20)
        ) {
            let mut current = ParticipationStatus::Enrolled;
            for next in steps {
                if !current.can_transition_to(next) {
                    continue;
                }
                if !current.counts_toward_capacity() && next.counts_toward_capacity() {
                    prop_assert_eq!(next, ParticipationStatus::Enrolled);
                }
                current = next;
            }
        }
    }
}
