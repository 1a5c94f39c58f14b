//! SQL-based storage for the community engine

use super::migrations;
use crate::config::DatabaseConfig;
use crate::core_event::event::{Event, EventStatus, Modality};
use crate::core_event::manager::EventError;
use crate::core_event::participation::{Participation, ParticipationStatus};
use crate::core_member::interest::Interest;
use crate::core_member::manager::MemberError;
use crate::core_member::user::User;
use crate::core_model::{
    EnumParseError, EventId, InterestId, NotificationId, PublicationId, Timestamp, UserId,
};
use crate::core_notify::notification::Notification;
use crate::core_publication::manager::PublicationError;
use crate::core_publication::publication::{Publication, PublicationStatus, Visibility};
use crate::core_role::Role;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use std::str::FromStr;

/// Storage failures, kept separate from domain errors so callers can tell
/// "the rule said no" apart from "the database said no"
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// SQL-backed store for every entity in the engine.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct CommunityStore {
    pool: Pool<SqliteConnectionManager>,
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn parse_enum<T>(idx: usize, value: String) -> rusqlite::Result<T>
where
    T: FromStr<Err = EnumParseError>,
{
    value.parse().map_err(|e: EnumParseError| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn millis(row_value: i64) -> Timestamp {
    Timestamp::from_millis(row_value.max(0) as u64)
}

// Column order: id, display_name, email, role, created_at, deactivated_at
fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(0)?),
        display_name: row.get(1)?,
        email: row.get(2)?,
        role: parse_enum(3, row.get(3)?)?,
        created_at: millis(row.get(4)?),
        deactivated_at: row.get::<_, Option<i64>>(5)?.map(millis),
    })
}

// Column order: id, keyword, created_at
fn interest_from_row(row: &Row) -> rusqlite::Result<Interest> {
    Ok(Interest {
        id: InterestId(row.get(0)?),
        keyword: row.get(1)?,
        created_at: millis(row.get(2)?),
    })
}

// Column order: id, title, content, status, visibility, author_id,
// created_at, updated_at
fn publication_from_row(row: &Row) -> rusqlite::Result<Publication> {
    Ok(Publication {
        id: PublicationId(row.get(0)?),
        title: row.get(1)?,
        content: row.get(2)?,
        status: parse_enum(3, row.get(3)?)?,
        visibility: parse_enum(4, row.get(4)?)?,
        author_id: UserId(row.get(5)?),
        created_at: millis(row.get(6)?),
        updated_at: millis(row.get(7)?),
    })
}

// Column order: id, name, starts_at, ends_at, modality, status, capacity,
// created_at, updated_at
fn event_from_row(row: &Row) -> rusqlite::Result<Event> {
    Ok(Event {
        id: EventId(row.get(0)?),
        name: row.get(1)?,
        starts_at: millis(row.get(2)?),
        ends_at: millis(row.get(3)?),
        modality: parse_enum(4, row.get(4)?)?,
        status: parse_enum(5, row.get(5)?)?,
        capacity: row.get::<_, Option<i64>>(6)?.map(|c| c.max(0) as u32),
        created_at: millis(row.get(7)?),
        updated_at: millis(row.get(8)?),
    })
}

// Column order: event_id, user_id, status, enrolled_at, updated_at
fn participation_from_row(row: &Row) -> rusqlite::Result<Participation> {
    Ok(Participation {
        event_id: EventId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        status: parse_enum(2, row.get(2)?)?,
        enrolled_at: millis(row.get(3)?),
        updated_at: millis(row.get(4)?),
    })
}

// Column order: id, user_id, publication_id, read, created_at
fn notification_from_row(row: &Row) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: NotificationId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        publication_id: PublicationId(row.get(2)?),
        read: row.get::<_, i64>(3)? != 0,
        created_at: millis(row.get(4)?),
    })
}

impl CommunityStore {
    /// Create a store over an existing pool, running pending migrations
    pub fn new(pool: Pool<SqliteConnectionManager>) -> Result<Self, StorageError> {
        migrations::migrate(&pool)?;
        Ok(Self { pool })
    }

    /// Open (or create) the database file named in the configuration
    pub fn open(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let busy_timeout = config.busy_timeout;
        let manager = SqliteConnectionManager::file(&config.path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")
        });
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .build(manager)
            .map_err(|e| StorageError::Pool(e.to_string()))?;
        Self::new(pool)
    }

    /// In-memory store for tests. Restricted to a single connection so
    /// every handle sees the same database.
    #[cfg(test)]
    pub fn memory() -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.pragma_update(None, "foreign_keys", "ON"));
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| StorageError::Pool(e.to_string()))?;
        Self::new(pool)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StorageError> {
        self.pool.get().map_err(|e| StorageError::Pool(e.to_string()))
    }

    // ===== User operations =====

    pub fn create_user(
        &self,
        display_name: &str,
        email: &str,
        role: Role,
    ) -> Result<User, MemberError> {
        let conn = self.conn()?;
        let now = Timestamp::now();

        match conn.execute(
            "INSERT INTO users (display_name, email, role, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![display_name, email, role.as_str(), now.as_millis() as i64],
        ) {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => return Err(MemberError::DuplicateEmail),
            Err(e) => return Err(StorageError::from(e).into()),
        }

        Ok(User {
            id: UserId(conn.last_insert_rowid()),
            display_name: display_name.to_owned(),
            email: email.to_owned(),
            role,
            created_at: now,
            deactivated_at: None,
        })
    }

    pub fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT id, display_name, email, role, created_at, deactivated_at
                 FROM users WHERE id = ?1",
                params![id.0],
                user_from_row,
            )
            .optional()?)
    }

    pub fn user_exists(&self, id: UserId) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        Ok(conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
            params![id.0],
            |row| row.get(0),
        )?)
    }

    pub fn set_user_role(&self, id: UserId, role: Role) -> Result<(), MemberError> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE users SET role = ?1 WHERE id = ?2",
                params![role.as_str(), id.0],
            )
            .map_err(StorageError::from)?;
        if changed == 0 {
            return Err(MemberError::UserNotFound);
        }
        Ok(())
    }

    /// Idempotent: an already-deactivated account keeps its original marker
    pub fn deactivate_user(&self, id: UserId) -> Result<(), MemberError> {
        let conn = self.conn()?;
        let now = Timestamp::now();
        let changed = conn
            .execute(
                "UPDATE users SET deactivated_at = COALESCE(deactivated_at, ?1) WHERE id = ?2",
                params![now.as_millis() as i64, id.0],
            )
            .map_err(StorageError::from)?;
        if changed == 0 {
            return Err(MemberError::UserNotFound);
        }
        Ok(())
    }

    pub fn list_users_by_role(
        &self,
        role: Role,
        include_deactivated: bool,
    ) -> Result<Vec<User>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, display_name, email, role, created_at, deactivated_at
             FROM users
             WHERE role = ?1 AND (?2 OR deactivated_at IS NULL)
             ORDER BY id",
        )?;
        let users = stmt
            .query_map(params![role.as_str(), include_deactivated], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    // ===== Interest operations =====

    pub fn create_interest(&self, keyword: &str) -> Result<Interest, MemberError> {
        let conn = self.conn()?;
        let now = Timestamp::now();

        match conn.execute(
            "INSERT INTO interests (keyword, created_at) VALUES (?1, ?2)",
            params![keyword, now.as_millis() as i64],
        ) {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => return Err(MemberError::DuplicateInterest),
            Err(e) => return Err(StorageError::from(e).into()),
        }

        Ok(Interest {
            id: InterestId(conn.last_insert_rowid()),
            keyword: keyword.to_owned(),
            created_at: now,
        })
    }

    pub fn delete_interest(&self, id: InterestId) -> Result<(), MemberError> {
        let conn = self.conn()?;
        let changed = conn
            .execute("DELETE FROM interests WHERE id = ?1", params![id.0])
            .map_err(StorageError::from)?;
        if changed == 0 {
            return Err(MemberError::InterestNotFound);
        }
        Ok(())
    }

    pub fn interest_exists(&self, id: InterestId) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        Ok(conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM interests WHERE id = ?1)",
            params![id.0],
            |row| row.get(0),
        )?)
    }

    /// Returns `false` when the interest was already declared
    pub fn declare_interest(
        &self,
        user: UserId,
        interest: InterestId,
    ) -> Result<bool, MemberError> {
        if !self.user_exists(user)? {
            return Err(MemberError::UserNotFound);
        }
        if !self.interest_exists(interest)? {
            return Err(MemberError::InterestNotFound);
        }

        let conn = self.conn()?;
        let now = Timestamp::now();
        let changed = conn
            .execute(
                "INSERT INTO profile_interests (user_id, interest_id, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, interest_id) DO NOTHING",
                params![user.0, interest.0, now.as_millis() as i64],
            )
            .map_err(StorageError::from)?;
        Ok(changed == 1)
    }

    pub fn retract_interest(
        &self,
        user: UserId,
        interest: InterestId,
    ) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM profile_interests WHERE user_id = ?1 AND interest_id = ?2",
            params![user.0, interest.0],
        )?;
        Ok(changed == 1)
    }

    pub fn list_declared_interests(&self, user: UserId) -> Result<Vec<Interest>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT i.id, i.keyword, i.created_at
             FROM interests i
             JOIN profile_interests pi ON pi.interest_id = i.id
             WHERE pi.user_id = ?1
             ORDER BY i.id",
        )?;
        let interests = stmt
            .query_map(params![user.0], interest_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(interests)
    }

    // ===== Publication operations =====

    pub fn create_publication(
        &self,
        title: &str,
        content: &str,
        visibility: Visibility,
        author: UserId,
    ) -> Result<Publication, PublicationError> {
        if !self.user_exists(author)? {
            return Err(PublicationError::UserNotFound);
        }

        let conn = self.conn()?;
        let now = Timestamp::now();
        conn.execute(
            "INSERT INTO publications (title, content, status, visibility, author_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                title,
                content,
                PublicationStatus::Draft.as_str(),
                visibility.as_str(),
                author.0,
                now.as_millis() as i64,
            ],
        )
        .map_err(StorageError::from)?;

        Ok(Publication {
            id: PublicationId(conn.last_insert_rowid()),
            title: title.to_owned(),
            content: content.to_owned(),
            status: PublicationStatus::Draft,
            visibility,
            author_id: author,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_publication(
        &self,
        id: PublicationId,
    ) -> Result<Option<Publication>, StorageError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT id, title, content, status, visibility, author_id, created_at, updated_at
                 FROM publications WHERE id = ?1",
                params![id.0],
                publication_from_row,
            )
            .optional()?)
    }

    pub fn set_publication_status(
        &self,
        id: PublicationId,
        status: PublicationStatus,
    ) -> Result<(), PublicationError> {
        let conn = self.conn()?;
        let now = Timestamp::now();
        let changed = conn
            .execute(
                "UPDATE publications SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), now.as_millis() as i64, id.0],
            )
            .map_err(StorageError::from)?;
        if changed == 0 {
            return Err(PublicationError::NotFound);
        }
        Ok(())
    }

    /// Returns `false` when the tag was already present
    pub fn tag_publication_interest(
        &self,
        publication: PublicationId,
        interest: InterestId,
    ) -> Result<bool, PublicationError> {
        if self.get_publication(publication)?.is_none() {
            return Err(PublicationError::NotFound);
        }
        if !self.interest_exists(interest)? {
            return Err(PublicationError::InterestNotFound);
        }

        let conn = self.conn()?;
        let changed = conn
            .execute(
                "INSERT INTO publication_interests (publication_id, interest_id)
                 VALUES (?1, ?2)
                 ON CONFLICT(publication_id, interest_id) DO NOTHING",
                params![publication.0, interest.0],
            )
            .map_err(StorageError::from)?;
        Ok(changed == 1)
    }

    pub fn has_access_grant(
        &self,
        publication: PublicationId,
        user: UserId,
    ) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        Ok(conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM publication_accesses WHERE publication_id = ?1 AND user_id = ?2)",
            params![publication.0, user.0],
            |row| row.get(0),
        )?)
    }

    /// Returns `false` when the grant already existed
    pub fn insert_access_grant(
        &self,
        publication: PublicationId,
        user: UserId,
    ) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let now = Timestamp::now();
        let changed = conn.execute(
            "INSERT INTO publication_accesses (publication_id, user_id, granted_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(publication_id, user_id) DO NOTHING",
            params![publication.0, user.0, now.as_millis() as i64],
        )?;
        Ok(changed == 1)
    }

    /// Returns `false` when there was nothing to revoke
    pub fn delete_access_grant(
        &self,
        publication: PublicationId,
        user: UserId,
    ) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM publication_accesses WHERE publication_id = ?1 AND user_id = ?2",
            params![publication.0, user.0],
        )?;
        Ok(changed == 1)
    }

    pub fn list_access_grants(
        &self,
        publication: PublicationId,
    ) -> Result<Vec<UserId>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT user_id FROM publication_accesses WHERE publication_id = ?1 ORDER BY user_id",
        )?;
        let users = stmt
            .query_map(params![publication.0], |row| Ok(UserId(row.get(0)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    // ===== Event operations =====

    pub fn create_event(
        &self,
        name: &str,
        starts_at: Timestamp,
        ends_at: Timestamp,
        modality: Modality,
        capacity: Option<u32>,
    ) -> Result<Event, EventError> {
        let conn = self.conn()?;
        let now = Timestamp::now();

        match conn.execute(
            "INSERT INTO events (name, starts_at, ends_at, modality, status, capacity, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                name,
                starts_at.as_millis() as i64,
                ends_at.as_millis() as i64,
                modality.as_str(),
                EventStatus::Scheduled.as_str(),
                capacity.map(|c| c as i64),
                now.as_millis() as i64,
            ],
        ) {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => return Err(EventError::DuplicateName),
            Err(e) => return Err(StorageError::from(e).into()),
        }

        Ok(Event {
            id: EventId(conn.last_insert_rowid()),
            name: name.to_owned(),
            starts_at,
            ends_at,
            modality,
            status: EventStatus::Scheduled,
            capacity,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_event(&self, id: EventId) -> Result<Option<Event>, StorageError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT id, name, starts_at, ends_at, modality, status, capacity, created_at, updated_at
                 FROM events WHERE id = ?1",
                params![id.0],
                event_from_row,
            )
            .optional()?)
    }

    pub fn set_event_status(
        &self,
        id: EventId,
        status: EventStatus,
    ) -> Result<(), EventError> {
        let conn = self.conn()?;
        let now = Timestamp::now();
        let changed = conn
            .execute(
                "UPDATE events SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), now.as_millis() as i64, id.0],
            )
            .map_err(StorageError::from)?;
        if changed == 0 {
            return Err(EventError::EventNotFound);
        }
        Ok(())
    }

    /// Enroll `user` into `event`.
    ///
    /// The whole decision runs inside one immediate transaction: the write
    /// lock taken at BEGIN serializes concurrent enrollments against the
    /// same database, so the capacity check and the row write are a single
    /// atomic unit and the seat count can never overshoot.
    pub fn enroll(&self, event: EventId, user: UserId) -> Result<Participation, EventError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::from)?;

        let row: Option<(String, Option<i64>)> = tx
            .query_row(
                "SELECT status, capacity FROM events WHERE id = ?1",
                params![event.0],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(StorageError::from)?;
        let (status, capacity) = row.ok_or(EventError::EventNotFound)?;
        let status: EventStatus = parse_enum(0, status).map_err(StorageError::from)?;
        if status != EventStatus::Scheduled {
            return Err(EventError::EventNotOpen);
        }

        let existing: Option<String> = tx
            .query_row(
                "SELECT status FROM participations WHERE event_id = ?1 AND user_id = ?2",
                params![event.0, user.0],
                |row| row.get(0),
            )
            .optional()
            .map_err(StorageError::from)?;
        if let Some(existing) = existing {
            let existing: ParticipationStatus =
                parse_enum(0, existing).map_err(StorageError::from)?;
            if !existing.can_transition_to(ParticipationStatus::Enrolled) {
                return Err(EventError::DuplicateEnrollment);
            }
        }

        if let Some(capacity) = capacity {
            let active: i64 = tx
                .query_row(
                    "SELECT COUNT(*) FROM participations
                     WHERE event_id = ?1 AND status IN ('enrolled', 'attended')",
                    params![event.0],
                    |row| row.get(0),
                )
                .map_err(StorageError::from)?;
            if active >= capacity {
                return Err(EventError::CapacityExceeded);
            }
        }

        let now = Timestamp::now();
        tx.execute(
            "INSERT INTO participations (event_id, user_id, status, enrolled_at, updated_at)
             VALUES (?1, ?2, 'enrolled', ?3, ?3)
             ON CONFLICT(event_id, user_id) DO UPDATE SET
                 status = 'enrolled',
                 enrolled_at = excluded.enrolled_at,
                 updated_at = excluded.updated_at",
            params![event.0, user.0, now.as_millis() as i64],
        )
        .map_err(StorageError::from)?;

        tx.commit().map_err(StorageError::from)?;
        Ok(Participation {
            event_id: event,
            user_id: user,
            status: ParticipationStatus::Enrolled,
            enrolled_at: now,
            updated_at: now,
        })
    }

    pub fn cancel_enrollment(&self, event: EventId, user: UserId) -> Result<(), EventError> {
        let conn = self.conn()?;
        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM events WHERE id = ?1",
                params![event.0],
                |row| row.get(0),
            )
            .optional()
            .map_err(StorageError::from)?;
        let status: EventStatus =
            parse_enum(0, status.ok_or(EventError::EventNotFound)?).map_err(StorageError::from)?;
        if status != EventStatus::Scheduled {
            return Err(EventError::EventNotOpen);
        }

        let now = Timestamp::now();
        let changed = conn
            .execute(
                "UPDATE participations SET status = 'cancelled', updated_at = ?1
                 WHERE event_id = ?2 AND user_id = ?3 AND status = 'enrolled'",
                params![now.as_millis() as i64, event.0, user.0],
            )
            .map_err(StorageError::from)?;
        if changed == 0 {
            return Err(EventError::NotEnrolled);
        }
        Ok(())
    }

    /// Transition one open enrollment to `attended`/`absent`. Returns
    /// `false` when the pair has no open enrollment.
    pub fn set_attendance(
        &self,
        event: EventId,
        user: UserId,
        status: ParticipationStatus,
    ) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let now = Timestamp::now();
        let changed = conn.execute(
            "UPDATE participations SET status = ?1, updated_at = ?2
             WHERE event_id = ?3 AND user_id = ?4 AND status = 'enrolled'",
            params![status.as_str(), now.as_millis() as i64, event.0, user.0],
        )?;
        Ok(changed == 1)
    }

    /// Seats currently held: `enrolled` plus `attended`
    pub fn count_active(&self, event: EventId) -> Result<u32, StorageError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM participations
             WHERE event_id = ?1 AND status IN ('enrolled', 'attended')",
            params![event.0],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u32)
    }

    pub fn roster(
        &self,
        event: EventId,
        include_deactivated: bool,
    ) -> Result<Vec<Participation>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT p.event_id, p.user_id, p.status, p.enrolled_at, p.updated_at
             FROM participations p
             JOIN users u ON u.id = p.user_id
             WHERE p.event_id = ?1 AND (?2 OR u.deactivated_at IS NULL)
             ORDER BY p.user_id",
        )?;
        let roster = stmt
            .query_map(params![event.0, include_deactivated], participation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(roster)
    }

    // ===== Notification operations =====

    /// Active accounts whose declared interests intersect the publication's
    /// tags, author excluded
    pub fn matched_users(
        &self,
        publication: PublicationId,
        author: UserId,
    ) -> Result<Vec<UserId>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT pi.user_id
             FROM profile_interests pi
             JOIN publication_interests pt ON pt.interest_id = pi.interest_id
             JOIN users u ON u.id = pi.user_id
             WHERE pt.publication_id = ?1
               AND pi.user_id <> ?2
               AND u.deactivated_at IS NULL
             ORDER BY pi.user_id",
        )?;
        let users = stmt
            .query_map(params![publication.0, author.0], |row| {
                Ok(UserId(row.get(0)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Returns `false` when a notification already existed for the pair
    pub fn insert_notification(
        &self,
        user: UserId,
        publication: PublicationId,
    ) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let now = Timestamp::now();
        let changed = conn.execute(
            "INSERT INTO notifications (user_id, publication_id, read, created_at)
             VALUES (?1, ?2, 0, ?3)
             ON CONFLICT(user_id, publication_id) DO NOTHING",
            params![user.0, publication.0, now.as_millis() as i64],
        )?;
        Ok(changed == 1)
    }

    pub fn list_notifications(
        &self,
        user: UserId,
        include_read: bool,
    ) -> Result<Vec<Notification>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, publication_id, read, created_at
             FROM notifications
             WHERE user_id = ?1 AND (?2 OR read = 0)
             ORDER BY created_at DESC, id DESC",
        )?;
        let notifications = stmt
            .query_map(params![user.0, include_read], notification_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notifications)
    }

    /// Returns `false` when no notification matches the (id, recipient)
    /// pair; marking twice stays `true`
    pub fn mark_notification_read(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2",
            params![id.0, user.0],
        )?;
        Ok(changed == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_user(name: &str) -> (CommunityStore, User) {
        let store = CommunityStore::memory().unwrap();
        let user = store
            .create_user(name, &format!("{name}@example.org"), Role::Member)
            .unwrap();
        (store, user)
    }

    #[test]
    fn test_create_and_get_user() {
        let (store, user) = store_with_user("alice");
        let fetched = store.get_user(user.id).unwrap().unwrap();
        assert_eq!(fetched, user);
    }

    #[test]
    fn test_duplicate_email_maps_to_domain_error() {
        let (store, _) = store_with_user("alice");
        let result = store.create_user("other", "alice@example.org", Role::Member);
        assert!(matches!(result, Err(MemberError::DuplicateEmail)));
    }

    #[test]
    fn test_enroll_respects_capacity_exactly() {
        let (store, a) = store_with_user("alice");
        let b = store
            .create_user("bob", "bob@example.org", Role::Member)
            .unwrap();
        let c = store
            .create_user("cleo", "cleo@example.org", Role::Member)
            .unwrap();
        let event = store
            .create_event(
                "ML Talk",
                Timestamp::from_millis(1000),
                Timestamp::from_millis(2000),
                Modality::Virtual,
                Some(2),
            )
            .unwrap();

        store.enroll(event.id, a.id).unwrap();
        store.enroll(event.id, b.id).unwrap();
        assert!(matches!(
            store.enroll(event.id, c.id),
            Err(EventError::CapacityExceeded)
        ));
        assert_eq!(store.count_active(event.id).unwrap(), 2);
    }

    #[test]
    fn test_re_enrollment_reuses_the_row() {
        let (store, a) = store_with_user("alice");
        let event = store
            .create_event(
                "ML Talk",
                Timestamp::from_millis(1000),
                Timestamp::from_millis(2000),
                Modality::Virtual,
                None,
            )
            .unwrap();

        store.enroll(event.id, a.id).unwrap();
        store.cancel_enrollment(event.id, a.id).unwrap();
        store.enroll(event.id, a.id).unwrap();

        let conn = store.conn().unwrap();
        let rows: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM participations WHERE event_id = ?1 AND user_id = ?2",
                params![event.id.0, a.id.0],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_access_grant_conflict_insert() {
        let (store, a) = store_with_user("alice");
        let publication = store
            .create_publication("notes", "...", Visibility::Private, a.id)
            .unwrap();

        assert!(store.insert_access_grant(publication.id, a.id).unwrap());
        assert!(!store.insert_access_grant(publication.id, a.id).unwrap());
        assert_eq!(store.list_access_grants(publication.id).unwrap(), vec![a.id]);

        assert!(store.delete_access_grant(publication.id, a.id).unwrap());
        assert!(!store.delete_access_grant(publication.id, a.id).unwrap());
    }

    #[test]
    fn test_notification_pair_is_unique() {
        let (store, a) = store_with_user("alice");
        let publication = store
            .create_publication("notes", "...", Visibility::Public, a.id)
            .unwrap();

        assert!(store.insert_notification(a.id, publication.id).unwrap());
        assert!(!store.insert_notification(a.id, publication.id).unwrap());
        assert_eq!(store.list_notifications(a.id, true).unwrap().len(), 1);
    }
}
