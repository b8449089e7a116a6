//! Common message shape shared by live transport traffic and the persisted log
//!
//! Both the transport and the log store deliver messages in their own
//! representation; everything downstream of the adapters works on
//! [`Message`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ChatlineError;

/// Kind of a text message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    /// Plain message
    Normal,
    /// `/me` style action
    Action,
    /// Delivery report; never displayed
    DeliveryReport,
}

impl MessageKind {
    /// Returns the canonical string form used in the log store
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Normal => "normal",
            MessageKind::Action => "action",
            MessageKind::DeliveryReport => "delivery-report",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = ChatlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(MessageKind::Normal),
            "action" => Ok(MessageKind::Action),
            "delivery-report" | "delivery_report" => Ok(MessageKind::DeliveryReport),
            other => Err(ChatlineError::LogStore(format!(
                "unknown message kind: {}",
                other
            ))),
        }
    }
}

/// Which side of the conversation produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Sent by the local user (from any client)
    Sent,
    /// Received from the partner
    Received,
}

impl Direction {
    /// Style class attached to history entries of this direction
    pub fn style_class(&self) -> &'static str {
        match self {
            Direction::Sent => "chat-sent",
            Direction::Received => "chat-received",
        }
    }
}

/// Normalized, immutable chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message kind
    pub kind: MessageKind,
    /// Raw (unescaped) message text
    pub text: String,
    /// Display name of the sender
    pub sender: String,
    /// Epoch seconds; `0` means unknown and is replaced by "now" on append
    pub timestamp: i64,
    /// Sent or received
    pub direction: Direction,
}

impl Message {
    /// Build a message
    ///
    /// # Examples
    ///
    /// ```
    /// use chatline::message::{Direction, Message, MessageKind};
    ///
    /// let msg = Message::new(MessageKind::Normal, "hi", "alice", 1_700_000_000, Direction::Received);
    /// assert!(msg.is_displayable());
    /// ```
    pub fn new(
        kind: MessageKind,
        text: impl Into<String>,
        sender: impl Into<String>,
        timestamp: i64,
        direction: Direction,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            sender: sender.into(),
            timestamp,
            direction,
        }
    }

    /// Returns false for delivery reports
    pub fn is_displayable(&self) -> bool {
        self.kind != MessageKind::DeliveryReport
    }

    /// Returns true when this message and `other` share timestamp and text
    pub fn same_content(&self, other: &Message) -> bool {
        self.timestamp == other.timestamp && self.text == other.text
    }
}
