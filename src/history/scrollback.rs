//! Scrollback engine
//!
//! Maintains the bounded, newest-first history of one conversation and
//! mirrors every change onto the conversation's [`NotificationSink`].
//!
//! # Retention
//!
//! After every insertion the buffer is trimmed. If the newest entry that
//! was present *before* the insertion is older than `recent_window_secs`,
//! the conversation is idle and only `idle_length` real entries survive;
//! otherwise `recent_length` do. Dividers and meta lines never count toward
//! the cap but are dropped together with the real entries around them.
//!
//! # Dividers
//!
//! A timestamp divider follows a group of messages. Appending a message
//! cancels the pending divider; a divider is then inserted right away when
//! the message is already older than `immediate_window_secs`, or scheduled
//! for `immediate_window_secs` after the message's own timestamp.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::config::ScrollbackConfig;
use crate::history::timestamp::format_local;
use crate::markup;
use crate::message::{Direction, Message, MessageKind};
use crate::notification::{
    EntryHandle, EntryHints, NotificationSink, PushOptions, ACTION_STYLE, LOG_STYLE,
};

/// One rendered line of history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub handle: EntryHandle,
    /// Markup (or plain text for dividers) as rendered
    pub content: String,
    /// Epoch seconds used for ordering and retention
    pub timestamp: i64,
    /// False for dividers and presence/alias lines
    pub is_real: bool,
}

/// A divider waiting for its timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledDivider {
    /// Epoch seconds at which the divider is due
    pub due_at: i64,
    /// Delay from the moment it was scheduled
    pub delay: Duration,
    /// Identifies this schedule; a fire carrying another generation is stale
    pub generation: u64,
}

/// History buffer for one conversation
#[derive(Debug)]
pub struct Scrollback {
    config: ScrollbackConfig,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn NotificationSink>,
    // Newest first
    history: VecDeque<HistoryEntry>,
    scheduled: Option<ScheduledDivider>,
    generation: u64,
    banner: Option<Banner>,
}

/// Last content pushed to the sink
#[derive(Debug, Clone, PartialEq, Eq)]
struct Banner {
    title: String,
    body: Option<String>,
    options: PushOptions,
}

impl Scrollback {
    /// Create an empty scrollback rendering into `sink`
    pub fn new(
        config: ScrollbackConfig,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            clock,
            sink,
            history: VecDeque::new(),
            scheduled: None,
            generation: 0,
            banner: None,
        }
    }

    /// Entries, newest first
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    /// Total number of entries, dividers included
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Number of real message entries
    pub fn real_count(&self) -> usize {
        self.history.iter().filter(|e| e.is_real).count()
    }

    /// The divider currently waiting for its timer, if any
    pub fn scheduled_divider(&self) -> Option<ScheduledDivider> {
        self.scheduled
    }

    /// Seed the buffer from the persisted log and the transport's pending
    /// messages
    ///
    /// Logged messages that also appear in `pending` (same timestamp and
    /// text) are skipped. Rendered log messages are followed by a single
    /// divider, then every pending message is appended. Returns true when
    /// the conversation needs attention, i.e. something was pending.
    pub fn seed(&mut self, title: &str, logged: &[Message], pending: &[Message]) -> bool {
        let pending: Vec<&Message> = pending.iter().filter(|m| m.is_displayable()).collect();

        let mut show_timestamp = false;
        for message in logged {
            if pending.iter().any(|p| p.same_content(message)) {
                continue;
            }
            if !message.is_displayable() {
                continue;
            }
            show_timestamp = true;
            self.append_message(title, message, true, &[LOG_STYLE]);
        }

        if show_timestamp {
            self.append_timestamp();
        }

        for message in &pending {
            self.append_message(title, message, true, &[]);
        }

        tracing::debug!(
            logged = logged.len(),
            pending = pending.len(),
            retained = self.real_count(),
            "Seeded scrollback"
        );

        !pending.is_empty()
    }

    /// Append a chat message
    ///
    /// The text is escaped, action messages are prefixed with the sender in
    /// italics, and received messages also replace the banner body.
    /// Delivery reports are ignored.
    pub fn append_message(
        &mut self,
        title: &str,
        message: &Message,
        no_timestamp: bool,
        styles: &[&str],
    ) {
        if !message.is_displayable() {
            tracing::trace!("Ignoring delivery report");
            return;
        }

        let mut body = markup::escape(&message.text);
        let mut classes: Vec<String> = styles.iter().map(|s| s.to_string()).collect();
        classes.push(message.direction.style_class().to_string());

        if message.kind == MessageKind::Action {
            body = format!(
                "{} {}",
                markup::italic(&markup::escape(&message.sender)),
                body
            );
            classes.push(ACTION_STYLE.to_string());
        }

        if message.direction == Direction::Received {
            self.push(
                &markup::escape(title),
                Some(&body),
                PushOptions {
                    replace_title: false,
                    markup: true,
                },
            );
        }

        let timestamp = (message.timestamp > 0).then_some(message.timestamp);
        self.append(body, classes, timestamp, no_timestamp);
    }

    fn append(
        &mut self,
        text: String,
        classes: Vec<String>,
        timestamp: Option<i64>,
        no_timestamp: bool,
    ) {
        let now = self.clock.now_secs();
        let timestamp = timestamp.unwrap_or(now);
        let reference = self.head_time();

        self.scheduled = None;

        let handle = self.sink.add_entry(&text, true, &EntryHints::markup(classes));
        self.history.push_front(HistoryEntry {
            handle,
            content: text,
            timestamp,
            is_real: true,
        });

        if !no_timestamp {
            let immediate = self.config.immediate_window_secs as i64;
            if timestamp < now - immediate {
                self.append_timestamp();
            } else {
                let delay = immediate - (now - timestamp);
                self.generation += 1;
                self.scheduled = Some(ScheduledDivider {
                    due_at: timestamp + immediate,
                    delay: Duration::from_secs(delay.max(0) as u64),
                    generation: self.generation,
                });
            }
        }

        self.trim(reference);
    }

    /// Insert a divider labelled with the newest entry's time
    pub fn append_timestamp(&mut self) {
        let Some(head_time) = self.head_time() else {
            return;
        };

        let label = format_local(head_time, &self.clock.now());
        let handle = self.sink.add_entry(&label, false, &EntryHints::divider());
        self.history.push_front(HistoryEntry {
            handle,
            content: label,
            timestamp: head_time,
            is_real: false,
        });
        self.scheduled = None;

        self.trim(Some(head_time));
    }

    /// Insert the scheduled divider if `generation` is still current
    ///
    /// Returns false for a fire that was superseded by a later append.
    pub fn fire_scheduled_divider(&mut self, generation: u64) -> bool {
        match self.scheduled {
            Some(scheduled) if scheduled.generation == generation => {
                self.append_timestamp();
                true
            }
            _ => false,
        }
    }

    /// Drop any pending divider
    pub fn cancel_divider(&mut self) {
        self.scheduled = None;
    }

    /// Append a presence line
    ///
    /// With `as_title` the line replaces the banner title; otherwise the
    /// title stays and the line becomes the banner body.
    pub fn append_presence(&mut self, text: &str, as_title: bool, title: &str) {
        let options = PushOptions {
            replace_title: as_title,
            markup: true,
        };
        if as_title {
            self.push(text, None, options);
        } else {
            self.push(&markup::escape(title), Some(text), options);
        }

        self.append_meta(text);
    }

    /// Append an "X is now known as Y" line and retitle the banner
    pub fn append_alias_change(&mut self, old_alias: &str, new_alias: &str) {
        let old_alias = markup::escape(old_alias);
        let new_alias = markup::escape(new_alias);
        let text = markup::italic(&format!("{} is now known as {}", old_alias, new_alias));

        self.push(
            &new_alias,
            None,
            PushOptions {
                replace_title: false,
                markup: true,
            },
        );
        self.append_meta(&text);
    }

    fn append_meta(&mut self, text: &str) {
        let reference = self.head_time();
        let handle = self.sink.add_entry(text, false, &EntryHints::meta());
        self.history.push_front(HistoryEntry {
            handle,
            content: text.to_string(),
            timestamp: self.clock.now_secs(),
            is_real: false,
        });
        self.trim(reference);
    }

    /// Push the current banner content again
    ///
    /// Falls back to the bare title when nothing was pushed yet.
    pub fn repush(&self, title: &str) {
        match &self.banner {
            Some(banner) => {
                self.sink
                    .push_content(&banner.title, banner.body.as_deref(), banner.options)
            }
            None => self.sink.push_content(
                &markup::escape(title),
                None,
                PushOptions {
                    replace_title: false,
                    markup: true,
                },
            ),
        }
    }

    fn push(&mut self, title: &str, body: Option<&str>, options: PushOptions) {
        self.sink.push_content(title, body, options);
        self.banner = Some(Banner {
            title: title.to_string(),
            body: body.map(str::to_string),
            options,
        });
    }

    fn head_time(&self) -> Option<i64> {
        self.history.front().map(|e| e.timestamp)
    }

    fn trim(&mut self, reference: Option<i64>) {
        let now = self.clock.now_secs();
        let recent_window = self.config.recent_window_secs as i64;
        let max_length = match reference {
            Some(time) if time < now - recent_window => self.config.idle_length,
            _ => self.config.recent_length,
        };

        let boundary = self
            .history
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_real)
            .nth(max_length)
            .map(|(index, _)| index);

        if let Some(index) = boundary {
            let expired = self.history.split_off(index);
            tracing::trace!(
                expired = expired.len(),
                max_length = max_length,
                "Trimmed scrollback"
            );
            for entry in expired {
                self.sink.remove_entry(entry.handle);
            }
        }
    }
}
