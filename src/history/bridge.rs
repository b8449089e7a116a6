//! Bridge to the persisted conversation log
//!
//! The log store is an external, read-only event source. The bridge fetches
//! recent events for a conversation partner and normalizes them into
//! [`Message`]s.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::{Direction, Message, MessageKind};
use crate::transport::AccountId;

/// Event as stored in the conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Display name of the sender
    pub sender: String,
    /// The sender is the local user
    pub is_self: bool,
    pub text: String,
    pub kind: MessageKind,
    /// Epoch seconds
    pub timestamp: i64,
}

impl LogEvent {
    /// Normalize into a [`Message`]
    pub fn to_message(&self) -> Message {
        let direction = if self.is_self {
            Direction::Sent
        } else {
            Direction::Received
        };
        Message::new(
            self.kind,
            self.text.clone(),
            self.sender.clone(),
            self.timestamp,
            direction,
        )
    }
}

/// Read access to the persisted conversation log
#[async_trait::async_trait]
pub trait LogStore: Send + Sync + std::fmt::Debug {
    /// Fetch at most `max_count` of the most recent events exchanged with
    /// `partner`, oldest first
    async fn fetch_recent_events(
        &self,
        account: &AccountId,
        partner: &str,
        max_count: usize,
    ) -> Result<Vec<LogEvent>>;
}

/// Normalizing adapter over a [`LogStore`]
#[derive(Debug, Clone)]
pub struct MessageLogBridge {
    store: Arc<dyn LogStore>,
}

impl MessageLogBridge {
    /// Wrap a log store
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Recent messages exchanged with `partner`, oldest first
    ///
    /// # Errors
    ///
    /// Propagates the log store's error; callers treat it as empty history.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use chatline::history::{MessageLogBridge, SqliteLogStore};
    /// use chatline::transport::AccountId;
    ///
    /// # tokio_test::block_on(async {
    /// let store = SqliteLogStore::new_with_path("/nonexistent/chatline/log.db");
    /// let bridge = MessageLogBridge::new(Arc::new(store));
    /// let messages = bridge
    ///     .fetch_recent(&AccountId::from("acct/1"), "bob@example.com", 10)
    ///     .await
    ///     .unwrap_or_default();
    /// assert!(messages.is_empty());
    /// # });
    /// ```
    pub async fn fetch_recent(
        &self,
        account: &AccountId,
        partner: &str,
        max_count: usize,
    ) -> Result<Vec<Message>> {
        let events = self
            .store
            .fetch_recent_events(account, partner, max_count)
            .await?;
        tracing::debug!(
            account = %account,
            partner = partner,
            count = events.len(),
            "Fetched log events"
        );
        Ok(events.iter().map(LogEvent::to_message).collect())
    }
}
