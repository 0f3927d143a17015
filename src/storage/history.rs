//! SQLite table of terminal session verdicts.

use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use super::{HISTORY_CAPACITY, StorageError};
use crate::diagnostics::Status;
use crate::session::HistoryRecord;

/// Filename for the history database inside the app directory.
pub const HISTORY_DB_FILE_NAME: &str = "history.db";

/// Append-only history capped at [`HISTORY_CAPACITY`] rows.
///
/// Rows are ordered by an autoincrement insertion sequence, so eviction is
/// FIFO by insertion regardless of the stored timestamps.
pub struct HistoryDatabase {
    connection: Connection,
}

impl HistoryDatabase {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> Result<Self, StorageError> {
        let db = Self { connection };
        db.apply_pragmas()?;
        db.apply_schema()?;
        Ok(db)
    }

    fn apply_pragmas(&self) -> Result<(), StorageError> {
        self.connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout=5000;",
        )?;
        Ok(())
    }

    fn apply_schema(&self) -> Result<(), StorageError> {
        self.connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS history (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                machine_id TEXT NOT NULL,
                machine_name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                status TEXT NOT NULL,
                db REAL NOT NULL,
                peak_frequency INTEGER NOT NULL
             );",
        )?;
        Ok(())
    }

    /// Records, most recent first.
    pub fn load(&self) -> Result<Vec<HistoryRecord>, StorageError> {
        let mut stmt = self.connection.prepare(
            "SELECT id, machine_id, machine_name, created_at, status, db, peak_frequency
             FROM history
             ORDER BY seq DESC
             LIMIT ?1",
        )?;
        let records = stmt
            .query_map(params![HISTORY_CAPACITY as i64], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Insert `record`, evict anything beyond the newest [`HISTORY_CAPACITY`]
    /// rows, and return the remaining history.
    pub fn append(&mut self, record: &HistoryRecord) -> Result<Vec<HistoryRecord>, StorageError> {
        let created_at = record.created_at.format(&Rfc3339)?;
        let tx = self.connection.transaction()?;
        tx.execute(
            "INSERT INTO history (id, machine_id, machine_name, created_at, status, db, peak_frequency)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id.to_string(),
                record.machine_id,
                record.machine_name,
                created_at,
                record.status.as_str(),
                record.db as f64,
                record.peak_frequency as i64,
            ],
        )?;
        let evicted = tx.execute(
            "DELETE FROM history
             WHERE seq NOT IN (SELECT seq FROM history ORDER BY seq DESC LIMIT ?1)",
            params![HISTORY_CAPACITY as i64],
        )?;
        tx.commit()?;
        if evicted > 0 {
            tracing::debug!("Evicted {evicted} history record(s) beyond capacity");
        }
        self.load()
    }

    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.connection.execute("DELETE FROM history", [])?;
        Ok(())
    }
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryRecord> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(3)?;
    let status: String = row.get(4)?;
    let db: f64 = row.get(5)?;
    let peak_frequency: i64 = row.get(6)?;
    Ok(HistoryRecord {
        id: Uuid::parse_str(&id).map_err(|err| conversion_error(0, err.to_string()))?,
        machine_id: row.get(1)?,
        machine_name: row.get(2)?,
        created_at: OffsetDateTime::parse(&created_at, &Rfc3339)
            .map_err(|err| conversion_error(3, err.to_string()))?,
        status: Status::parse(&status)
            .ok_or_else(|| conversion_error(4, format!("unknown status {status:?}")))?,
        db: db as f32,
        peak_frequency: u32::try_from(peak_frequency)
            .map_err(|err| conversion_error(6, err.to_string()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Metrics, builtin_catalog};
    use tempfile::tempdir;

    fn record(peak_frequency: u32) -> HistoryRecord {
        let metrics = Metrics {
            db: 64.2,
            peak_frequency,
            is_stable: true,
            status: Status::Abnormal,
        };
        HistoryRecord::new(
            &builtin_catalog()[2],
            &metrics,
            OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        )
    }

    #[test]
    fn append_returns_most_recent_first() {
        let mut db = HistoryDatabase::open_in_memory().unwrap();
        db.append(&record(1)).unwrap();
        let history = db.append(&record(2)).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].peak_frequency, 2);
        assert_eq!(history[1].peak_frequency, 1);
        assert_eq!(history[0].status, Status::Abnormal);
    }

    #[test]
    fn keeps_only_the_newest_fifty() {
        let mut db = HistoryDatabase::open_in_memory().unwrap();
        let first = record(0);
        db.append(&first).unwrap();
        for i in 1..=HISTORY_CAPACITY as u32 {
            db.append(&record(i)).unwrap();
        }
        let history = db.load().unwrap();
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert!(history.iter().all(|r| r.id != first.id));
        assert_eq!(history[0].peak_frequency, HISTORY_CAPACITY as u32);
        let count: i64 = db
            .connection
            .query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, HISTORY_CAPACITY as i64);
    }

    #[test]
    fn records_survive_reopen_and_clear() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(HISTORY_DB_FILE_NAME);
        let stored = record(150);
        {
            let mut db = HistoryDatabase::open(&path).unwrap();
            db.append(&stored).unwrap();
        }
        let mut db = HistoryDatabase::open(&path).unwrap();
        assert_eq!(db.load().unwrap(), vec![stored]);
        db.clear().unwrap();
        assert!(db.load().unwrap().is_empty());
    }
}
