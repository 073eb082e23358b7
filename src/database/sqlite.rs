use std::{path::Path, sync::Mutex};

use miette::{Context, IntoDiagnostic, Result};
use rusqlite::{
    params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
    Connection, ToSql,
};

use super::{DownloadLogEntry, DownloadStore, LogStatus, PlatformCount, UserId};
use crate::utils::MutexUtils;

#[derive(Debug)]
pub struct Sqlite {
    conn: Mutex<Connection>,
}

impl Sqlite {
    /// Open the database file at the given path or create it if it does not
    /// exist, along with the schema.
    pub fn read_or_create(p: &Path) -> Result<Self> {
        let conn = Connection::open(p)
            .into_diagnostic()
            .wrap_err("Could not open sqlite file")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_tables().wrap_err("Could not create tables")?;

        Ok(store)
    }

    #[cfg(test)]
    fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory().into_diagnostic()?),
        };
        store.create_tables()?;
        Ok(store)
    }

    /// Create the tables if they do not already exist
    fn create_tables(&self) -> Result<()> {
        self.conn.with_lock(|conn| {
            conn.execute_batch(
                "BEGIN;
                CREATE TABLE IF NOT EXISTS downloads (
                    id          INTEGER PRIMARY KEY,
                    user_id     INTEGER NOT NULL,
                    platform    TEXT NOT NULL,
                    video_url   TEXT NOT NULL,
                    status      TEXT NOT NULL,
                    created_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                );
                CREATE INDEX IF NOT EXISTS idx_downloads_user_id
                    ON downloads (user_id);
                CREATE INDEX IF NOT EXISTS idx_downloads_created_at
                    ON downloads (created_at);
                COMMIT;",
            )
        })
        .into_diagnostic()?;
        Ok(())
    }
}

impl DownloadStore for Sqlite {
    fn record(&self, entry: &DownloadLogEntry) -> crate::result::Result<()> {
        self.conn
            .with_lock(|conn| {
                conn.execute(
                    "INSERT INTO downloads (user_id, platform, video_url, status)
                    VALUES (?1, ?2, ?3, ?4)",
                    params![
                        entry.user_id,
                        entry.platform,
                        entry.video_url,
                        SqliteLogStatus(entry.status)
                    ],
                )
            })
            .into_diagnostic()
            .wrap_err("Could not insert download row")?;

        Ok(())
    }

    fn user_stats(&self, user: UserId) -> crate::result::Result<Vec<PlatformCount>> {
        let counts = self
            .conn
            .with_lock(|conn| -> rusqlite::Result<Vec<PlatformCount>> {
                let mut stmt = conn.prepare(
                    "SELECT platform, COUNT(id) FROM downloads
                    WHERE user_id = ?1 AND status = ?2
                    GROUP BY platform
                    ORDER BY platform",
                )?;

                let rows = stmt.query_map(
                    params![user, SqliteLogStatus(LogStatus::Completed)],
                    |row| {
                        Ok(PlatformCount {
                            platform: row.get(0)?,
                            count: row.get(1)?,
                        })
                    },
                )?;

                rows.collect()
            })
            .into_diagnostic()
            .wrap_err("Could not query user stats")?;

        Ok(counts)
    }
}

/// Wrapper around [LogStatus] so that it can be read from/written to sqlite
#[derive(Debug)]
struct SqliteLogStatus(LogStatus);

impl ToSql for SqliteLogStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let val = match self.0 {
            LogStatus::Completed => "completed",
            LogStatus::Failed => "failed",
        };

        Ok(ToSqlOutput::from(val))
    }
}

impl FromSql for SqliteLogStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let status = match value.as_str()? {
            "completed" => LogStatus::Completed,
            "failed" => LogStatus::Failed,
            other => return Err(FromSqlError::Other(format!("unknown status {other}").into())),
        };

        Ok(SqliteLogStatus(status))
    }
}
