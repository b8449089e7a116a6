//! Conversation history: the scrollback engine and its log-store inputs
//!
//! - [`bridge`]: reads persisted events and normalizes them into messages
//! - [`scrollback`]: bounded, time-grouped history buffer per conversation
//! - [`sqlite`]: read-only SQLite implementation of the log store
//! - [`timestamp`]: divider label formatting

pub mod bridge;
pub mod scrollback;
pub mod sqlite;
pub mod timestamp;

pub use bridge::{LogEvent, LogStore, MessageLogBridge};
pub use scrollback::{HistoryEntry, ScheduledDivider, Scrollback};
pub use sqlite::SqliteLogStore;
