//! Versioned schema migrations.
//!
//! Each migration is a static SQL batch keyed by version. Applied versions
//! are recorded in `_migrations`, so running the set twice is a no-op.

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

struct Migration {
    /// Strictly increasing, starting at 1.
    version: u32,
    description: &'static str,
    /// May contain several `;`-separated statements.
    sql: &'static str,
}

/// Append new migrations at the end; never edit an applied one.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "users",
        sql: r#"
            CREATE TABLE users (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
                name          TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                created_at    INTEGER NOT NULL,
                updated_at    INTEGER NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        description: "generated workflows",
        sql: r#"
            CREATE TABLE workflows (
                id                   INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id              INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name                 TEXT NOT NULL,
                description          TEXT NOT NULL DEFAULT '',
                prompt               TEXT NOT NULL,
                workflow_json        TEXT NOT NULL,
                node_count           INTEGER NOT NULL DEFAULT 0,
                trigger_type         TEXT NOT NULL,
                estimated_setup_time TEXT NOT NULL DEFAULT '',
                setup_instructions   TEXT NOT NULL DEFAULT '[]',
                is_public            BOOLEAN NOT NULL DEFAULT 0,
                created_at           INTEGER NOT NULL,
                updated_at           INTEGER NOT NULL
            );
            CREATE INDEX idx_workflows_user ON workflows(user_id, created_at DESC);
            CREATE INDEX idx_workflows_public ON workflows(is_public, created_at DESC);
        "#,
    },
];

/// Apply every migration newer than the recorded version.
pub fn run_all(conn: &Connection) -> StoreResult<()> {
    ensure_migrations_table(conn)?;

    let current = current_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();

    if pending.is_empty() {
        debug!(current_version = current, "database schema is up to date");
        return Ok(());
    }

    info!(
        current_version = current,
        pending = pending.len(),
        "running pending migrations"
    );

    for migration in pending {
        apply(conn, migration)?;
    }

    info!(
        new_version = latest_version(),
        "all migrations applied"
    );
    Ok(())
}

/// Latest applied migration version, or 0 on a fresh database.
pub fn current_version(conn: &Connection) -> StoreResult<u32> {
    ensure_migrations_table(conn)?;
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| StoreError::Migration {
        version: 0,
        message: format!("failed to read current version: {e}"),
    })
}

/// Highest version this build knows about.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

// ── internals ────────────────────────────────────────────────────────

fn ensure_migrations_table(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version     INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at  INTEGER NOT NULL
        );",
    )
    .map_err(|e| StoreError::Migration {
        version: 0,
        message: format!("failed to create _migrations table: {e}"),
    })
}

/// Apply one migration and record it, all or nothing.
fn apply(conn: &Connection, migration: &Migration) -> StoreResult<()> {
    info!(
        version = migration.version,
        description = migration.description,
        "applying migration"
    );

    // `Connection::transaction` needs `&mut`; manage the transaction by hand.
    conn.execute_batch("BEGIN IMMEDIATE;")
        .map_err(|e| StoreError::Migration {
            version: migration.version,
            message: format!("failed to begin transaction: {e}"),
        })?;

    let result = (|| -> StoreResult<()> {
        conn.execute_batch(migration.sql)
            .map_err(|e| StoreError::Migration {
                version: migration.version,
                message: format!("SQL execution failed: {e}"),
            })?;

        conn.execute(
            "INSERT INTO _migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                migration.version,
                migration.description,
                chrono::Utc::now().timestamp()
            ],
        )
        .map_err(|e| StoreError::Migration {
            version: migration.version,
            message: format!("failed to record migration: {e}"),
        })?;

        Ok(())
    })();

    match &result {
        Ok(()) => {
            conn.execute_batch("COMMIT;")
                .map_err(|e| StoreError::Migration {
                    version: migration.version,
                    message: format!("failed to commit: {e}"),
                })?;
        }
        Err(err) => {
            warn!(version = migration.version, %err, "migration failed, rolling back");
            let _ = conn.execute_batch("ROLLBACK;");
        }
    }

    result
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const LATEST_VERSION: u32 = 2;

    fn setup_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        conn
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[1].version > window[0].version,
                "migration versions must be strictly increasing: {} >= {}",
                window[0].version,
                window[1].version,
            );
        }
        assert_eq!(latest_version(), LATEST_VERSION);
    }

    #[test]
    fn run_all_on_fresh_db() {
        let conn = setup_conn();
        assert_eq!(current_version(&conn).unwrap(), 0);
        run_all(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), LATEST_VERSION);
    }

    #[test]
    fn run_all_is_idempotent() {
        let conn = setup_conn();
        run_all(&conn).unwrap();
        run_all(&conn).unwrap();
        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, i64::from(LATEST_VERSION));
    }

    #[test]
    fn email_is_unique_case_insensitively() {
        let conn = setup_conn();
        run_all(&conn).unwrap();
        conn.execute(
            "INSERT INTO users (email, name, password_hash, created_at, updated_at) \
             VALUES ('a@example.com', 'A', 'x', 0, 0)",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO users (email, name, password_hash, created_at, updated_at) \
             VALUES ('A@EXAMPLE.COM', 'B', 'x', 0, 0)",
            [],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn workflows_cascade_with_their_owner() {
        let conn = setup_conn();
        run_all(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO users (id, email, name, password_hash, created_at, updated_at) \
             VALUES (1, 'a@example.com', 'A', 'x', 0, 0);
             INSERT INTO workflows (user_id, name, prompt, workflow_json, trigger_type, created_at, updated_at) \
             VALUES (1, 'W', 'p', '{}', 'Manual', 0, 0);
             DELETE FROM users WHERE id = 1;",
        )
        .unwrap();
        let left: i64 = conn
            .query_row("SELECT COUNT(*) FROM workflows", [], |row| row.get(0))
            .unwrap();
        assert_eq!(left, 0);
    }

    #[test]
    fn workflow_requires_existing_user() {
        let conn = setup_conn();
        run_all(&conn).unwrap();
        let orphan = conn.execute(
            "INSERT INTO workflows (user_id, name, prompt, workflow_json, trigger_type, created_at, updated_at) \
             VALUES (99, 'W', 'p', '{}', 'Manual', 0, 0)",
            [],
        );
        assert!(orphan.is_err());
    }
}
