//! Notification surface abstraction
//!
//! The core never renders anything itself. Each conversation source owns a
//! [`NotificationSink`] obtained from the [`NotificationTray`] and pushes
//! content, history entries and attention requests into it. The tray feeds
//! user interaction back as [`TrayEvent`]s.
//!
//! - [`memory::MemorySink`] -- in-process recording sink used by the CLI
//!   transcript and by tests.

use std::path::PathBuf;
use std::sync::Arc;

use crate::transport::ChannelId;

pub mod memory;

pub use memory::{MemorySink, MemoryTray};

/// Style class for timestamp dividers and presence/alias lines
pub const META_STYLE: &str = "chat-meta-message";

/// Style class for action (`/me`) messages
pub const ACTION_STYLE: &str = "chat-action";

/// Style class for messages replayed from the persisted log
pub const LOG_STYLE: &str = "chat-log-message";

/// Opaque handle to a rendered history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryHandle(pub u64);

/// Options for [`NotificationSink::push_content`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushOptions {
    /// The title line carries the pushed text (e.g. a presence change)
    pub replace_title: bool,
    /// Title/body are markup rather than plain text
    pub markup: bool,
}

/// Layout hints for a history entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryHints {
    /// Style classes applied to the rendered entry
    pub style_classes: Vec<String>,
    /// Entry text is markup
    pub markup: bool,
    /// Align to the trailing edge instead of filling the row
    pub align_end: bool,
}

impl EntryHints {
    /// Markup entry with the given style classes
    pub fn markup(style_classes: Vec<String>) -> Self {
        Self {
            style_classes,
            markup: true,
            align_end: false,
        }
    }

    /// Hints for a timestamp divider
    pub fn divider() -> Self {
        Self {
            style_classes: vec![META_STYLE.to_string()],
            markup: false,
            align_end: true,
        }
    }

    /// Hints for a presence or alias meta line
    pub fn meta() -> Self {
        Self::markup(vec![META_STYLE.to_string()])
    }

    /// Returns true when the given class is present
    pub fn has_class(&self, class: &str) -> bool {
        self.style_classes.iter().any(|c| c == class)
    }
}

/// Icon shown next to a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Icon {
    /// Contact avatar loaded from a file
    Avatar(PathBuf),
    /// Themed icon name
    Named(String),
}

impl Icon {
    /// Fallback used when a contact has no avatar
    pub fn default_avatar() -> Self {
        Icon::Named("avatar-default".to_string())
    }
}

/// Notification urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// Per-conversation notification object
pub trait NotificationSink: Send + Sync + std::fmt::Debug {
    /// Replace the banner content
    fn push_content(&self, title: &str, body: Option<&str>, options: PushOptions);

    /// Render a history entry and return a handle to it
    fn add_entry(&self, text: &str, is_real: bool, hints: &EntryHints) -> EntryHandle;

    /// Release a rendered history entry
    fn remove_entry(&self, handle: EntryHandle);

    /// Update the conversation icon
    fn set_icon(&self, icon: &Icon);

    /// Keep the notification around after it has been shown
    fn set_resident(&self, resident: bool);

    /// Set the notification urgency
    fn set_urgency(&self, urgency: Urgency);

    /// Bring the conversation to the user's notice
    fn request_attention(&self);

    /// Tear down the rendered notification
    fn destroy(&self);
}

/// The notification tray that hosts one sink per conversation
pub trait NotificationTray: Send + Sync + std::fmt::Debug {
    /// Register a new conversation and return its sink
    fn add_source(&self, channel: &ChannelId, title: &str) -> Arc<dyn NotificationSink>;
}

/// User interaction reported by the tray
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrayEvent {
    /// The user typed a reply into the conversation's entry
    Reply { channel: ChannelId, text: String },
    /// The user clicked the conversation
    Activated { channel: ChannelId },
    /// The tray dropped the conversation
    Discarded { channel: ChannelId },
}
