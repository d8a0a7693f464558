// Database Manager for speech-data
// Owns the SQLite database location and runs every gateway call on its own connection

use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::gateway::{Row, Statement, StoreGateway};
use super::{migrations, procedures};
use crate::error::StoreError;

/// How long a call waits for another writer before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Database manager for the speech training store.
///
/// No connection is held between calls: each statement opens a fresh
/// connection, runs inside a transaction and drops both before returning.
pub struct DatabaseManager {
    db_path: PathBuf,
}

impl DatabaseManager {
    /// Create a new DatabaseManager with the database at the specified path
    pub fn new(db_path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create database directory")?;
            }
        }

        let conn = Connection::open(&db_path)
            .context("Failed to open database")?;

        // WAL lets readers proceed while one writer holds the lock; the mode persists in the file
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .context("Failed to enable WAL journal mode")?;

        migrations::run_migrations(&conn)
            .context("Failed to run database migrations")?;

        log::info!("Database initialized at: {:?}", db_path);

        Ok(Self { db_path })
    }

    /// Execute a function inside a write transaction on a freshly opened connection.
    ///
    /// The write lock is taken up front, so a procedure that reads before it
    /// writes waits for other writers instead of failing mid-transaction.
    /// The transaction commits only when `f` succeeds; any error rolls it back.
    pub fn with_connection<F, T>(&self, f: F) -> std::result::Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> std::result::Result<T, StoreError>,
    {
        self.in_transaction(TransactionBehavior::Immediate, f)
    }

    /// Like `with_connection`, but only takes the write lock once `f` writes.
    pub fn with_read_connection<F, T>(&self, f: F) -> std::result::Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> std::result::Result<T, StoreError>,
    {
        self.in_transaction(TransactionBehavior::Deferred, f)
    }

    fn in_transaction<F, T>(
        &self,
        behavior: TransactionBehavior,
        f: F,
    ) -> std::result::Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> std::result::Result<T, StoreError>,
    {
        let mut conn = open_connection(&self.db_path)?;
        let tx = conn.transaction_with_behavior(behavior)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Get the database path
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl StoreGateway for DatabaseManager {
    fn execute(&self, statement: &Statement) -> std::result::Result<Vec<Row>, StoreError> {
        log::debug!("Executing {}", statement);

        // Procedures may read before they write; plain queries are single statements
        let result = match statement {
            Statement::Procedure { name, args } => {
                self.with_connection(|conn| procedures::call(conn, name, args))
            }
            Statement::Query { sql, params } => {
                self.with_read_connection(|conn| select_rows(conn, sql, params))
            }
        };

        if let Err(e) = &result {
            log::warn!(
                "{} failed (code {:?}): {}",
                statement,
                e.code,
                e.message
            );
        }

        result
    }
}

fn open_connection(db_path: &Path) -> std::result::Result<Connection, StoreError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;

    // Enable foreign keys; the pragma is per connection
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    Ok(conn)
}

/// Run a statement with bound parameters and collect every row by column name.
///
/// Statements that return no columns (plain INSERT/UPDATE) yield an empty set.
pub(crate) fn select_rows(
    conn: &Connection,
    sql: &str,
    params: &[Value],
) -> std::result::Result<Vec<Row>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let column_names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut collected = Vec::new();

    while let Some(row) = rows.next()? {
        let mut columns = Vec::with_capacity(column_names.len());
        for (idx, name) in column_names.iter().enumerate() {
            columns.push((name.clone(), row.get::<_, Value>(idx)?));
        }
        collected.push(Row::new(columns));
    }

    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::TestDb;
    use crate::database::queries;

    #[test]
    fn test_database_creation() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("test.db");

        let manager = DatabaseManager::new(db_path.clone()).unwrap();
        assert!(db_path.exists());

        let count: i64 = manager
            .with_connection(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM labels", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_reopening_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let first = DatabaseManager::new(db_path.clone()).unwrap();
        first
            .execute(&Statement::procedure(procedures::CREATE_LABELS).arg("LabelName", "Yes".to_string()))
            .unwrap();
        drop(first);

        let second = DatabaseManager::new(db_path).unwrap();
        let rows = second.execute(&Statement::query(queries::ACTIVE_LABELS)).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_failed_call_rolls_back() {
        let db = TestDb::new();

        let result: std::result::Result<(), StoreError> = db.with_connection(|conn| {
            conn.execute("INSERT INTO labels (name) VALUES ('Partial')", [])?;
            Err(StoreError::new("abort after insert"))
        });
        assert!(result.is_err());

        let rows = db.execute(&Statement::query(queries::ACTIVE_LABELS)).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_insert_query_returns_no_rows() {
        let db = TestDb::new();

        let rows = db
            .execute(&Statement::query("INSERT INTO labels (name) VALUES (?1)").bind("Yes".to_string()))
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_concurrent_creates_all_succeed() {
        let db = TestDb::new();
        let label = db
            .execute(&Statement::procedure(procedures::CREATE_LABELS).arg("LabelName", "Yes".to_string()))
            .unwrap()[0]
            .get_i64("id")
            .unwrap();

        let failures: Vec<StoreError> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|worker| {
                    let db = &db;
                    scope.spawn(move || {
                        (0..40)
                            .filter_map(|n| {
                                db.execute(
                                    &Statement::procedure(procedures::CREATE_SPEECH_API)
                                        .arg("Name", format!("api-{}-{}", worker, n))
                                        .arg("Description", String::new())
                                        .arg("Labels", label.to_string()),
                                )
                                .err()
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            workers
                .into_iter()
                .flat_map(|worker| worker.join().unwrap())
                .collect()
        });

        assert!(failures.is_empty(), "lock failures: {:?}", failures.first());
        let rows = db
            .execute(&Statement::procedure(procedures::GET_ACTIVE_SPEECH_API))
            .unwrap();
        assert_eq!(rows.len(), 8 * 40);
    }

    #[test]
    fn test_database_uses_wal() {
        let db = TestDb::new();
        let mode: String = db
            .with_read_connection(|conn| Ok(conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_unknown_procedure_is_rejected() {
        let db = TestDb::new();
        let err = db.execute(&Statement::procedure("DropEverything")).unwrap_err();
        assert!(err.message.contains("DropEverything"));
    }
}
