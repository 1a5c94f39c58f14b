/*
    stress_tests.rs - Concurrency tests for the enrollment path

    Enrollment is the one operation where ordering between concurrent
    requests is a correctness requirement: the capacity check and the row
    write must behave as a single atomic unit. These tests hammer a real
    database file from many threads at once.
*/

use agora_core::config::DatabaseConfig;
use agora_core::core_event::{EventError, EventManager, EventManagerImpl, Modality};
use agora_core::core_member::{MemberManager, MemberManagerImpl, User};
use agora_core::core_model::Timestamp;
use agora_core::core_role::Role;
use agora_core::CommunityStore;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn open_store(dir: &tempfile::TempDir) -> CommunityStore {
    let config = DatabaseConfig {
        path: dir.path().join("community.db"),
        max_connections: 16,
        busy_timeout: Duration::from_secs(10),
    };
    CommunityStore::open(&config).unwrap()
}

/// Capacity 3, 8 concurrent enrollments: exactly 3 must win and the other
/// 5 must see the capacity error, never a constraint blowup.
#[test]
fn test_concurrent_enrollment_never_overshoots_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let members = MemberManagerImpl::new(store.clone());
    let events = Arc::new(EventManagerImpl::new(store));

    let coordinator = members
        .register_user("carol", "carol@example.org", Role::Coordinator)
        .unwrap();
    let event = events
        .create_event(
            &coordinator,
            "Packed Workshop",
            Timestamp::from_millis(1_000),
            Timestamp::from_millis(2_000),
            Modality::InPerson,
            Some(3),
        )
        .unwrap();

    let users: Vec<User> = (0..8)
        .map(|i| {
            members
                .register_user(&format!("user-{i}"), &format!("user-{i}@example.org"), Role::Member)
                .unwrap()
        })
        .collect();

    let handles: Vec<_> = users
        .into_iter()
        .map(|user| {
            let events = Arc::clone(&events);
            let event_id = event.id;
            thread::spawn(move || events.enroll(&user, event_id))
        })
        .collect();

    let mut enrolled = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) => enrolled += 1,
            Err(EventError::CapacityExceeded) => rejected += 1,
            Err(other) => panic!("unexpected enrollment error: {other}"),
        }
    }

    assert_eq!(enrolled, 3);
    assert_eq!(rejected, 5);
    assert_eq!(events.count_active(event.id).unwrap(), 3);
}

/// The same account enrolling from several threads holds exactly one seat.
#[test]
fn test_concurrent_duplicate_enrollment_holds_one_seat() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let members = MemberManagerImpl::new(store.clone());
    let events = Arc::new(EventManagerImpl::new(store));

    let coordinator = members
        .register_user("carol", "carol@example.org", Role::Coordinator)
        .unwrap();
    let event = events
        .create_event(
            &coordinator,
            "Open Evening",
            Timestamp::from_millis(1_000),
            Timestamp::from_millis(2_000),
            Modality::Virtual,
            None,
        )
        .unwrap();
    let user = members
        .register_user("alice", "alice@example.org", Role::Member)
        .unwrap();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let events = Arc::clone(&events);
            let user = user.clone();
            let event_id = event.id;
            thread::spawn(move || events.enroll(&user, event_id))
        })
        .collect();

    let mut enrolled = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) => enrolled += 1,
            Err(EventError::DuplicateEnrollment) => duplicates += 1,
            Err(other) => panic!("unexpected enrollment error: {other}"),
        }
    }

    assert_eq!(enrolled, 1);
    assert_eq!(duplicates, 5);
    assert_eq!(events.count_active(event.id).unwrap(), 1);
}

/// Enroll/cancel churn across threads ends consistent: the active count
/// matches what the survivors report, and never exceeds capacity.
#[test]
fn test_enroll_cancel_churn_stays_within_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let members = MemberManagerImpl::new(store.clone());
    let events = Arc::new(EventManagerImpl::new(store));

    let coordinator = members
        .register_user("carol", "carol@example.org", Role::Coordinator)
        .unwrap();
    let event = events
        .create_event(
            &coordinator,
            "Churn Night",
            Timestamp::from_millis(1_000),
            Timestamp::from_millis(2_000),
            Modality::Hybrid,
            Some(2),
        )
        .unwrap();

    let users: Vec<User> = (0..6)
        .map(|i| {
            members
                .register_user(&format!("user-{i}"), &format!("user-{i}@example.org"), Role::Member)
                .unwrap()
        })
        .collect();

    let handles: Vec<_> = users
        .into_iter()
        .map(|user| {
            let events = Arc::clone(&events);
            let event_id = event.id;
            thread::spawn(move || {
                for _ in 0..10 {
                    match events.enroll(&user, event_id) {
                        Ok(_) => {
                            let _ = events.cancel_enrollment(&user, event_id);
                        }
                        Err(EventError::CapacityExceeded)
                        | Err(EventError::DuplicateEnrollment) => {}
                        Err(other) => panic!("unexpected enrollment error: {other}"),
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(events.count_active(event.id).unwrap() <= 2);
}
