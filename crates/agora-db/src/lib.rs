pub mod condition;
pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Timestamps are persisted as UTC text in this format.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self::init(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run a read-only closure over the connection. The handle is scoped to
    /// the closure and released on every exit path.
    pub fn with_conn<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<anyhow::Error>,
        F: FnOnce(&Connection) -> Result<T, E>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Run a closure inside one transaction: committed when it returns Ok,
    /// rolled back on any error.
    pub fn with_tx<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<anyhow::Error>,
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        let tx = conn.transaction().map_err(anyhow::Error::from)?;
        let out = f(&tx)?;
        tx.commit().map_err(anyhow::Error::from)?;
        Ok(out)
    }
}

/// Encode an instant into the stored column format.
pub fn encode_datetime(at: DateTime<Utc>) -> String {
    at.format(DATETIME_FORMAT).to_string()
}

/// Decode a stored column value back into an instant.
pub fn decode_datetime(text: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)?;
    Ok(naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn datetime_roundtrip() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 17, 30, 5).unwrap();
        let encoded = encode_datetime(at);
        assert_eq!(encoded, "2024-03-09 17:30:05");
        assert_eq!(decode_datetime(&encoded).unwrap(), at);
    }

    #[test]
    fn tx_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();

        let result: Result<()> = db.with_tx(|tx| {
            tx.execute(
                "INSERT INTO member (id, password_hash, rank, activity_date)
                 VALUES (1, 'h', 'regular', '2024-01-01 00:00:00')",
                [],
            )?;
            anyhow::bail!("boom");
        });
        assert!(result.is_err());

        let count: i64 = db
            .with_conn(|conn| -> Result<i64> {
                Ok(conn.query_row("SELECT COUNT(*) FROM member", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }
}
