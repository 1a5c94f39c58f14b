//! Database migrations
//!
//! Versioned migrations for the community schema. Each migration is applied
//! atomically and tracked in the schema_version table.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Migration descriptor
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
}

/// All available migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial community schema",
        up_sql: r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            );

            -- Accounts; deactivation is a soft marker, rows are never deleted
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                display_name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL CHECK(role IN ('interested', 'member', 'coordinator', 'mentor')),
                created_at INTEGER NOT NULL,
                deactivated_at INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_users_role ON users(role) WHERE deactivated_at IS NULL;

            -- Interest vocabulary, unique case-insensitively
            CREATE TABLE IF NOT EXISTS interests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                keyword TEXT NOT NULL UNIQUE COLLATE NOCASE,
                created_at INTEGER NOT NULL
            );

            -- Interests declared on a profile
            CREATE TABLE IF NOT EXISTS profile_interests (
                user_id INTEGER NOT NULL,
                interest_id INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, interest_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (interest_id) REFERENCES interests(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_profile_interests_interest ON profile_interests(interest_id);

            -- Publications
            CREATE TABLE IF NOT EXISTS publications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                status TEXT NOT NULL CHECK(status IN ('draft', 'pending', 'active', 'archived')),
                visibility TEXT NOT NULL CHECK(visibility IN ('public', 'private')),
                author_id INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                FOREIGN KEY (author_id) REFERENCES users(id)
            );

            CREATE INDEX IF NOT EXISTS idx_publications_author ON publications(author_id);
            CREATE INDEX IF NOT EXISTS idx_publications_status ON publications(status, visibility);

            -- Interest tags on a publication
            CREATE TABLE IF NOT EXISTS publication_interests (
                publication_id INTEGER NOT NULL,
                interest_id INTEGER NOT NULL,
                PRIMARY KEY (publication_id, interest_id),
                FOREIGN KEY (publication_id) REFERENCES publications(id) ON DELETE CASCADE,
                FOREIGN KEY (interest_id) REFERENCES interests(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_publication_interests_interest ON publication_interests(interest_id);

            -- Explicit access grants; the pair key makes grants idempotent
            CREATE TABLE IF NOT EXISTS publication_accesses (
                publication_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                granted_at INTEGER NOT NULL,
                PRIMARY KEY (publication_id, user_id),
                FOREIGN KEY (publication_id) REFERENCES publications(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_publication_accesses_user ON publication_accesses(user_id);

            -- Events
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                starts_at INTEGER NOT NULL,
                ends_at INTEGER NOT NULL,
                modality TEXT NOT NULL CHECK(modality IN ('in_person', 'virtual', 'hybrid')),
                status TEXT NOT NULL CHECK(status IN ('scheduled', 'finished', 'cancelled')),
                capacity INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                CHECK (starts_at <= ends_at),
                CHECK (capacity IS NULL OR capacity >= 1)
            );

            -- Participations; one row per (event, user) forever, status moves
            CREATE TABLE IF NOT EXISTS participations (
                event_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                status TEXT NOT NULL CHECK(status IN ('enrolled', 'attended', 'absent', 'cancelled')),
                enrolled_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (event_id, user_id),
                FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_participations_active
                ON participations(event_id)
                WHERE status IN ('enrolled', 'attended');

            -- Notifications; the pair constraint is the at-most-once guarantee
            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                publication_id INTEGER NOT NULL,
                read INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                UNIQUE (user_id, publication_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (publication_id) REFERENCES publications(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_notifications_unread
                ON notifications(user_id, created_at)
                WHERE read = 0;
        "#,
    }]
}

/// Get current schema version from the database
fn get_current_version(pool: &Pool<SqliteConnectionManager>) -> Result<i32, rusqlite::Error> {
    let conn = pool.get().map_err(|e| {
        rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to get connection: {e}"),
        )))
    })?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let version: Result<i32, _> = conn.query_row(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    );

    Ok(version.unwrap_or(0))
}

/// Run all pending migrations
pub fn migrate(pool: &Pool<SqliteConnectionManager>) -> Result<(), rusqlite::Error> {
    let current_version = get_current_version(pool)?;
    let pending: Vec<_> = get_migrations()
        .into_iter()
        .filter(|m| m.version > current_version)
        .collect();

    if pending.is_empty() {
        return Ok(());
    }

    let conn = pool.get().map_err(|e| {
        rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to get connection: {e}"),
        )))
    })?;

    for migration in pending {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.up_sql)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis() as i64;
        tx.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?, ?)",
            params![migration.version, now],
        )?;

        tx.commit()?;
        debug!(
            version = migration.version,
            description = migration.description,
            "applied migration"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_pool() -> Pool<SqliteConnectionManager> {
        let manager = SqliteConnectionManager::memory();
        Pool::builder()
            .max_size(1)
            .build(manager)
            .expect("Failed to create pool")
    }

    #[test]
    fn test_initial_migration() {
        let pool = setup_test_pool();
        migrate(&pool).expect("Migration failed");

        let conn = pool.get().unwrap();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        for table in [
            "users",
            "interests",
            "profile_interests",
            "publications",
            "publication_interests",
            "publication_accesses",
            "events",
            "participations",
            "notifications",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_migration_version_tracking() {
        let pool = setup_test_pool();
        migrate(&pool).expect("Migration failed");

        let version = get_current_version(&pool).expect("Failed to get version");
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_idempotent_migrations() {
        let pool = setup_test_pool();
        migrate(&pool).expect("First migration failed");
        migrate(&pool).expect("Second migration failed");

        let version = get_current_version(&pool).expect("Failed to get version");
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_pair_keys_reject_duplicates() {
        let pool = setup_test_pool();
        migrate(&pool).expect("Migration failed");

        let conn = pool.get().unwrap();
        let now = 1000i64;
        conn.execute(
            "INSERT INTO users (display_name, email, role, created_at) VALUES (?, ?, ?, ?)",
            params!["alice", "alice@example.org", "member", now],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO events (name, starts_at, ends_at, modality, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params!["ML Talk", now, now, "virtual", "scheduled", now, now],
        )
        .unwrap();

        conn.execute(
            "INSERT INTO participations (event_id, user_id, status, enrolled_at, updated_at)
             VALUES (1, 1, 'enrolled', ?, ?)",
            params![now, now],
        )
        .unwrap();

        let duplicate = conn.execute(
            "INSERT INTO participations (event_id, user_id, status, enrolled_at, updated_at)
             VALUES (1, 1, 'enrolled', ?, ?)",
            params![now, now],
        );
        assert!(duplicate.is_err());
    }
}
