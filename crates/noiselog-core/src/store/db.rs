use std::ops::Bound;
use std::path::Path;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, trace};

use super::{Cursor, Direction, KeyRange, RecordStore};
use crate::error::{NoiseError, Result};
use crate::models::NoiseEvent;

/// Version written to `PRAGMA user_version` once the schema exists.
pub const SCHEMA_VERSION: i64 = 1;

const EVENT_COLUMNS: &str = "datetime, listener, source, noise, severity";

/// Durable store backed by a single SQLite table keyed on `datetime`.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        debug!(path = %path.display(), "opened noise database");
        Self::with_connection(conn)
    }

    /// Non-durable store, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Create the schema on first open. Databases written by a newer version are refused.
fn initialize_schema(conn: &Connection) -> Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version > SCHEMA_VERSION {
        return Err(NoiseError::Io(format!(
            "database schema version {version} is newer than supported version {SCHEMA_VERSION}"
        )));
    }

    if version == 0 {
        conn.execute_batch(&format!(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS noises (
                datetime TEXT PRIMARY KEY NOT NULL,
                listener TEXT NOT NULL,
                source TEXT NOT NULL,
                noise TEXT NOT NULL,
                severity TEXT NOT NULL
            ) WITHOUT ROWID;
            PRAGMA user_version = {SCHEMA_VERSION};
            COMMIT;
            "#
        ))?;
        debug!(version = SCHEMA_VERSION, "initialized noise schema");
    }

    Ok(())
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<NoiseEvent> {
    Ok(NoiseEvent {
        datetime: row.get(0)?,
        listener: row.get(1)?,
        source: row.get(2)?,
        noise: row.get(3)?,
        severity: row.get(4)?,
    })
}

fn is_primary_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

impl RecordStore for SqliteStore {
    fn insert(&mut self, event: &NoiseEvent) -> Result<()> {
        let inserted = self.conn.execute(
            "INSERT INTO noises (datetime, listener, source, noise, severity)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.datetime,
                event.listener,
                event.source,
                event.noise,
                event.severity
            ],
        );

        match inserted {
            Ok(_) => Ok(()),
            Err(err) if is_primary_key_violation(&err) => {
                Err(NoiseError::DuplicateKey(event.datetime.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM noises", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn open_cursor<'a>(
        &'a self,
        range: &KeyRange,
        direction: Direction,
    ) -> Result<Box<dyn Cursor + 'a>> {
        let mut cursor = SqliteCursor {
            conn: &self.conn,
            range: range.clone(),
            direction,
            position: None,
            done: false,
        };
        cursor.position = cursor.fetch_event(0)?;
        cursor.done = cursor.position.is_none();
        Ok(Box::new(cursor))
    }
}

/// Keyset cursor: every move re-queries for the records past the current key.
struct SqliteCursor<'a> {
    conn: &'a Connection,
    range: KeyRange,
    direction: Direction,
    position: Option<NoiseEvent>,
    done: bool,
}

impl SqliteCursor<'_> {
    /// SQL selecting `columns` of the record `skip` places past the current position.
    /// The offset is the last bound parameter, so the text only varies with the range shape.
    fn scan_sql(&self, columns: &str, skip: u64) -> (String, Vec<SqlValue>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        match &self.range.lower {
            Bound::Included(key) => {
                clauses.push("datetime >= ?");
                values.push(SqlValue::Text(key.clone()));
            }
            Bound::Excluded(key) => {
                clauses.push("datetime > ?");
                values.push(SqlValue::Text(key.clone()));
            }
            Bound::Unbounded => {}
        }
        match &self.range.upper {
            Bound::Included(key) => {
                clauses.push("datetime <= ?");
                values.push(SqlValue::Text(key.clone()));
            }
            Bound::Excluded(key) => {
                clauses.push("datetime < ?");
                values.push(SqlValue::Text(key.clone()));
            }
            Bound::Unbounded => {}
        }
        if let Some(current) = &self.position {
            clauses.push(match self.direction {
                Direction::Forward => "datetime > ?",
                Direction::Reverse => "datetime < ?",
            });
            values.push(SqlValue::Text(current.datetime.clone()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let order = match self.direction {
            Direction::Forward => "ASC",
            Direction::Reverse => "DESC",
        };

        values.push(SqlValue::Integer(i64::try_from(skip).unwrap_or(i64::MAX)));

        let sql = format!(
            "SELECT {columns} FROM noises{where_clause} ORDER BY datetime {order} LIMIT 1 OFFSET ?"
        );
        (sql, values)
    }

    fn fetch_event(&self, skip: u64) -> Result<Option<NoiseEvent>> {
        let (sql, values) = self.scan_sql(EVENT_COLUMNS, skip);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let event = stmt
            .query_row(params_from_iter(values.iter()), event_from_row)
            .optional()?;
        Ok(event)
    }

    fn fetch_key(&self, skip: u64) -> Result<Option<String>> {
        let (sql, values) = self.scan_sql("datetime", skip);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let key = stmt
            .query_row(params_from_iter(values.iter()), |row| row.get(0))
            .optional()?;
        Ok(key)
    }

    fn load(&self, key: &str) -> Result<Option<NoiseEvent>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {EVENT_COLUMNS} FROM noises WHERE datetime = ?1"
        ))?;
        let event = stmt.query_row([key], event_from_row).optional()?;
        Ok(event)
    }

    fn settle(&mut self, next: Option<NoiseEvent>) {
        self.done = next.is_none();
        self.position = next;
    }
}

impl Cursor for SqliteCursor<'_> {
    fn value(&self) -> Option<&NoiseEvent> {
        self.position.as_ref()
    }

    fn advance(&mut self, count: u64) -> Result<()> {
        if count == 0 {
            return Err(NoiseError::precondition("cursor advance count must be at least 1"));
        }
        if self.done {
            return Ok(());
        }

        // Only the key of the landing record is read while skipping
        let next = match self.fetch_key(count - 1)? {
            Some(key) => self.load(&key)?,
            None => None,
        };
        trace!(count, landed = next.is_some(), "sqlite cursor advanced");
        self.settle(next);
        Ok(())
    }

    fn step(&mut self) -> Result<()> {
        if self.done {
            return Ok(());
        }
        let next = self.fetch_event(0)?;
        self.settle(next);
        Ok(())
    }
}
