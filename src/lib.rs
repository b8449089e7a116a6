//! Chatline - conversation notifications for instant-messaging transports
//!
//! This library keeps one live notification per active text conversation:
//! it negotiates channels with the transport dispatcher, tracks the
//! partner's presence and renders a bounded, time-grouped scrollback seeded
//! from the persisted conversation log.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `conversation`: registry of live conversations and per-channel sources
//! - `history`: scrollback engine, log bridge and SQLite log store
//! - `notification`: the notification surface the core renders into
//! - `transport`: seams to the messaging transport and dispatcher
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli`: command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chatline::history::{MessageLogBridge, Scrollback, SqliteLogStore};
//! use chatline::{Config, MemorySink, SystemClock};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let bridge = MessageLogBridge::new(Arc::new(SqliteLogStore::new()?));
//!     let logged = bridge
//!         .fetch_recent(&"acct/1".into(), "bob@example.com", 10)
//!         .await?;
//!
//!     let sink = Arc::new(MemorySink::new());
//!     let mut scrollback = Scrollback::new(config.scrollback, Arc::new(SystemClock), sink);
//!     scrollback.seed("Bob", &logged, &[]);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod error;
pub mod history;
pub mod logging;
pub mod markup;
pub mod message;
pub mod notification;
pub mod transport;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use conversation::{ConversationRegistry, DispatchRequest};
pub use error::{ChatlineError, Result};
pub use message::{Direction, Message, MessageKind};
pub use notification::{MemorySink, MemoryTray, NotificationSink, NotificationTray, TrayEvent};
