pub mod dsn;

use planlog_core::{PlanRecord, PlanSink, SinkError, WriteOutcome};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, info};

use dsn::{parse_dsn, DbTarget};

/// Table holding one row per extracted plan. The unique key makes
/// re-ingesting the same log a no-op.
pub const PLAN_SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS query_plans (
    source_database TEXT NOT NULL,
    logged_at       TEXT NOT NULL,
    query_name      TEXT NOT NULL,
    plan_body       TEXT NOT NULL,
    UNIQUE (source_database, logged_at, query_name)
);";

const LOGGED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite plan sink. One connection for the whole run, closed on drop.
pub struct PlanDb {
    conn: Connection,
}

impl PlanDb {
    /// Open the database named by a connection string.
    pub fn connect(dsn: &str) -> Result<Self, SinkError> {
        match parse_dsn(dsn).map_err(SinkError::Connection)? {
            DbTarget::Memory => Self::open_in_memory(),
            DbTarget::File(path) => Self::open_path(&path),
        }
    }

    /// Open (or create) the database at a specific path.
    pub fn open_path(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SinkError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| SinkError::Database(format!("open db {}: {e}", path.display())))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").map_err(db_err)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, SinkError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, SinkError> {
        conn.execute_batch(PLAN_SCHEMA).map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Insert one plan. A row with the same key already present is reported
    /// as [`WriteOutcome::Duplicate`].
    pub fn insert_plan(&self, record: &PlanRecord) -> Result<WriteOutcome, SinkError> {
        let logged_at = record.logged_at.format(LOGGED_AT_FORMAT).to_string();
        let result = self.conn.execute(
            "INSERT INTO query_plans (source_database, logged_at, query_name, plan_body) \
             VALUES (?1, ?2, ?3, ?4)",
            params![&record.database, &logged_at, &record.query_name, &record.body],
        );
        match result {
            Ok(_) => {
                info!(
                    db = %record.database,
                    query = %record.query_name,
                    "Inserted plan logged at {logged_at}"
                );
                Ok(WriteOutcome::Written)
            }
            Err(e) if is_unique_violation(&e) => {
                debug!(
                    db = %record.database,
                    query = %record.query_name,
                    "Plan already exists in DB"
                );
                Ok(WriteOutcome::Duplicate)
            }
            Err(e) => Err(db_err(e)),
        }
    }

    /// Rows currently stored, including those from earlier runs.
    pub fn count_plans(&self) -> Result<u64, SinkError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM query_plans", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(count as u64)
    }

    #[cfg(test)]
    fn get_plan_body(
        &self,
        database: &str,
        logged_at: &str,
        query_name: &str,
    ) -> Result<Option<String>, SinkError> {
        use rusqlite::OptionalExtension;
        self.conn
            .query_row(
                "SELECT plan_body FROM query_plans \
                 WHERE source_database = ?1 AND logged_at = ?2 AND query_name = ?3",
                params![database, logged_at, query_name],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)
    }

    /// Close explicitly to surface errors that a plain drop would swallow.
    pub fn close(self) -> Result<(), SinkError> {
        self.conn.close().map_err(|(_, e)| db_err(e))
    }
}

impl PlanSink for PlanDb {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn write(&mut self, record: &PlanRecord) -> Result<WriteOutcome, SinkError> {
        self.insert_plan(record)
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn db_err(err: rusqlite::Error) -> SinkError {
    SinkError::Database(err.to_string())
}
