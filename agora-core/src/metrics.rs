//! Metric names and registration
//!
//! Counters only; an exporter is a deployment concern and not wired here.

use metrics::describe_counter;

pub const ENROLLMENTS: &str = "agora.event.enrollments";
pub const ENROLLMENTS_REJECTED: &str = "agora.event.enrollments_rejected";
pub const ATTENDANCE_MARKS: &str = "agora.event.attendance_marks";
pub const ACCESS_GRANTS: &str = "agora.publication.access_grants";
pub const NOTIFICATIONS_CREATED: &str = "agora.notify.notifications_created";

/// Register descriptions with the installed recorder, if any
pub fn init_metrics() {
    describe_counter!(ENROLLMENTS, "Successful event enrollments");
    describe_counter!(
        ENROLLMENTS_REJECTED,
        "Enrollment attempts rejected because the event was at capacity"
    );
    describe_counter!(ATTENDANCE_MARKS, "Participations marked attended or absent");
    describe_counter!(ACCESS_GRANTS, "Newly created publication access grants");
    describe_counter!(
        NOTIFICATIONS_CREATED,
        "Notification records created by interest fan-out"
    );
}
