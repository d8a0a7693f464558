// Database migrations for speech-data
// Creates and updates the database schema

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Current schema version
const SCHEMA_VERSION: i32 = 2;

/// Run all necessary migrations to bring the database up to date
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version from the database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    ).context("Failed to check for schema_version table")?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> = conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get(0),
    ).context("Failed to read schema version")?;

    Ok(version.unwrap_or(0))
}

/// Initial schema creation (version 1): collections, labels and their mapping
fn migrate_v1(conn: &Connection) -> Result<()> {
    log::info!("Running database migration v1");

    conn.execute_batch(r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Collections: named groups of labels with sampling requirements
        CREATE TABLE IF NOT EXISTS collections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            samples_per_label INTEGER NOT NULL CHECK (samples_per_label > 0),
            sample_duration_seconds INTEGER NOT NULL CHECK (sample_duration_seconds > 0),
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Names are unique among active rows only
        CREATE UNIQUE INDEX IF NOT EXISTS idx_collections_active_name
        ON collections(name) WHERE is_active = 1;

        -- Labels: classification tags with a running sample count
        CREATE TABLE IF NOT EXISTS labels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            sample_count INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_labels_active_name
        ON labels(name) WHERE is_active = 1;

        -- Collection <-> label mapping
        CREATE TABLE IF NOT EXISTS collection_labels (
            collection_id INTEGER NOT NULL,
            label_id INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (collection_id, label_id),
            FOREIGN KEY (collection_id) REFERENCES collections(id),
            FOREIGN KEY (label_id) REFERENCES labels(id)
        );

        CREATE INDEX IF NOT EXISTS idx_collection_labels_label
        ON collection_labels(label_id);

        INSERT INTO schema_version (version) VALUES (1);
    "#).context("Failed to run migration v1")?;

    log::info!("Database migration v1 completed");
    Ok(())
}

/// Version 2: speech APIs, their label sets and version snapshots
fn migrate_v2(conn: &Connection) -> Result<()> {
    log::info!("Running database migration v2");

    conn.execute_batch(r#"
        CREATE TABLE IF NOT EXISTS speech_apis (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            type TEXT NOT NULL DEFAULT 'custom',
            training_status INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_speech_apis_active_name
        ON speech_apis(name) WHERE is_active = 1;

        CREATE TABLE IF NOT EXISTS speech_api_labels (
            speech_api_id INTEGER NOT NULL,
            label_id INTEGER NOT NULL,
            PRIMARY KEY (speech_api_id, label_id),
            FOREIGN KEY (speech_api_id) REFERENCES speech_apis(id),
            FOREIGN KEY (label_id) REFERENCES labels(id)
        );

        -- Versions are append-only snapshots; rows are never updated
        CREATE TABLE IF NOT EXISTS speech_api_versions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            speech_api_id INTEGER NOT NULL,
            version_number INTEGER NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (speech_api_id, version_number),
            FOREIGN KEY (speech_api_id) REFERENCES speech_apis(id)
        );

        CREATE TABLE IF NOT EXISTS speech_api_version_labels (
            speech_api_version_id INTEGER NOT NULL,
            label_id INTEGER NOT NULL,
            PRIMARY KEY (speech_api_version_id, label_id),
            FOREIGN KEY (speech_api_version_id) REFERENCES speech_api_versions(id),
            FOREIGN KEY (label_id) REFERENCES labels(id)
        );

        INSERT INTO schema_version (version) VALUES (2);
    "#).context("Failed to run migration v2")?;

    log::info!("Database migration v2 completed (schema version {})", SCHEMA_VERSION);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_active_name_uniqueness_is_partial() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute("INSERT INTO labels (name, is_active) VALUES ('Yes', 0)", []).unwrap();
        conn.execute("INSERT INTO labels (name) VALUES ('Yes')", []).unwrap();

        assert!(conn.execute("INSERT INTO labels (name) VALUES ('Yes')", []).is_err());
    }
}
