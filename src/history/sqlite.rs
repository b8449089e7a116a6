//! SQLite conversation log
//!
//! Read-only [`LogStore`] over the `events` table written by the process
//! that records conversations. Queries run on the blocking pool.

use crate::error::{ChatlineError, Result};
use crate::history::bridge::{LogEvent, LogStore};
use crate::message::MessageKind;
use crate::transport::AccountId;
use anyhow::Context;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// Schema of the conversation log read by [`SqliteLogStore`]
///
/// The store only reads; whatever process records conversations is expected
/// to create this table.
pub const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account TEXT NOT NULL,
    partner TEXT NOT NULL,
    sender TEXT NOT NULL,
    is_self INTEGER NOT NULL,
    kind TEXT NOT NULL,
    body TEXT NOT NULL,
    timestamp INTEGER NOT NULL
)";

/// Read-only [`LogStore`] backed by a SQLite file
#[derive(Debug, Clone)]
pub struct SqliteLogStore {
    db_path: PathBuf,
}

impl SqliteLogStore {
    /// Open the log in the user's data directory
    ///
    /// `CHATLINE_LOG_DB` overrides the location.
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var("CHATLINE_LOG_DB") {
            return Ok(Self::new_with_path(override_path));
        }

        Ok(Self::new_with_path(default_db_path()?))
    }

    /// Use the log at `db_path`
    ///
    /// The file is opened lazily on every fetch, so a log created after the
    /// store is constructed is picked up.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatline::history::SqliteLogStore;
    ///
    /// let store = SqliteLogStore::new_with_path("/tmp/chatline-log.db");
    /// assert!(store.db_path().ends_with("chatline-log.db"));
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Location of the database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Blocking fetch of the most recent events, oldest first
    pub fn query_recent(
        &self,
        account: &AccountId,
        partner: &str,
        max_count: usize,
    ) -> Result<Vec<LogEvent>> {
        let conn = Connection::open_with_flags(&self.db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .context("Failed to open conversation log")
            .map_err(|e| ChatlineError::LogStore(format!("{:#}", e)))?;

        let mut stmt = conn
            .prepare(
                "SELECT sender, is_self, kind, body, timestamp
                FROM events
                WHERE account = ? AND partner = ?
                ORDER BY timestamp DESC, id DESC
                LIMIT ?",
            )
            .context("Failed to prepare statement")
            .map_err(|e| ChatlineError::LogStore(format!("{:#}", e)))?;

        let rows = stmt
            .query_map(
                params![account.as_str(), partner, max_count as i64],
                |row| {
                    let sender: String = row.get(0)?;
                    let is_self: bool = row.get(1)?;
                    let kind: String = row.get(2)?;
                    let body: String = row.get(3)?;
                    let timestamp: i64 = row.get(4)?;
                    Ok((sender, is_self, kind, body, timestamp))
                },
            )
            .context("Failed to query events")
            .map_err(|e| ChatlineError::LogStore(format!("{:#}", e)))?;

        let mut events = Vec::new();
        for (sender, is_self, kind, body, timestamp) in rows.flatten() {
            let kind = match kind.parse::<MessageKind>() {
                Ok(kind) => kind,
                Err(e) => {
                    tracing::warn!(timestamp = timestamp, "Skipping log event: {}", e);
                    continue;
                }
            };
            events.push(LogEvent {
                sender,
                is_self,
                text: body,
                kind,
                timestamp,
            });
        }

        events.reverse();
        Ok(events)
    }
}

fn default_db_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("org", "chatline", "chatline")
        .ok_or_else(|| ChatlineError::LogStore("Could not determine data directory".into()))?;
    Ok(proj_dirs.data_dir().join("log.db"))
}

#[async_trait::async_trait]
impl LogStore for SqliteLogStore {
    async fn fetch_recent_events(
        &self,
        account: &AccountId,
        partner: &str,
        max_count: usize,
    ) -> Result<Vec<LogEvent>> {
        let store = self.clone();
        let account = account.clone();
        let partner = partner.to_string();
        tokio::task::spawn_blocking(move || store.query_recent(&account, &partner, max_count))
            .await
            .context("Log query task failed")?
    }
}
