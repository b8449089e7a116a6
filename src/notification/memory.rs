//! In-process notification sink
//!
//! [`MemorySink`] records everything pushed into it. The CLI uses it to
//! render a transcript; tests use it to assert on scrollback contents.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{EntryHandle, EntryHints, Icon, NotificationSink, NotificationTray, PushOptions, Urgency};
use crate::transport::ChannelId;

/// A history entry as it was rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEntry {
    pub handle: EntryHandle,
    pub text: String,
    pub is_real: bool,
    pub hints: EntryHints,
}

/// One call to [`NotificationSink::push_content`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushedContent {
    pub title: String,
    pub body: Option<String>,
    pub options: PushOptions,
}

#[derive(Debug, Default)]
struct SinkState {
    // Rendering order, i.e. oldest first
    entries: Vec<RenderedEntry>,
    pushes: Vec<PushedContent>,
    removed: usize,
    attention: usize,
    icon: Option<Icon>,
    resident: bool,
    urgency: Urgency,
    destroyed: bool,
    next_handle: u64,
}

/// Recording [`NotificationSink`]
#[derive(Debug, Default)]
pub struct MemorySink {
    state: Mutex<SinkState>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SinkState> {
        // A poisoned sink only means a test panicked mid-push; keep reading.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Live entries in display order (oldest first)
    pub fn entries(&self) -> Vec<RenderedEntry> {
        self.state().entries.clone()
    }

    /// Texts of live real entries, oldest first
    pub fn real_texts(&self) -> Vec<String> {
        self.state()
            .entries
            .iter()
            .filter(|e| e.is_real)
            .map(|e| e.text.clone())
            .collect()
    }

    /// Number of entries released through [`NotificationSink::remove_entry`]
    pub fn removed_count(&self) -> usize {
        self.state().removed
    }

    /// Every content push, in order
    pub fn pushes(&self) -> Vec<PushedContent> {
        self.state().pushes.clone()
    }

    /// Most recent content push
    pub fn last_push(&self) -> Option<PushedContent> {
        self.state().pushes.last().cloned()
    }

    /// Number of attention requests
    pub fn attention_count(&self) -> usize {
        self.state().attention
    }

    /// Current icon
    pub fn icon(&self) -> Option<Icon> {
        self.state().icon.clone()
    }

    /// Whether the sink was marked resident
    pub fn is_resident(&self) -> bool {
        self.state().resident
    }

    /// Current urgency
    pub fn urgency(&self) -> Urgency {
        self.state().urgency
    }

    /// Whether the sink was destroyed
    pub fn is_destroyed(&self) -> bool {
        self.state().destroyed
    }
}

impl NotificationSink for MemorySink {
    fn push_content(&self, title: &str, body: Option<&str>, options: PushOptions) {
        self.state().pushes.push(PushedContent {
            title: title.to_string(),
            body: body.map(str::to_string),
            options,
        });
    }

    fn add_entry(&self, text: &str, is_real: bool, hints: &EntryHints) -> EntryHandle {
        let mut state = self.state();
        state.next_handle += 1;
        let handle = EntryHandle(state.next_handle);
        state.entries.push(RenderedEntry {
            handle,
            text: text.to_string(),
            is_real,
            hints: hints.clone(),
        });
        handle
    }

    fn remove_entry(&self, handle: EntryHandle) {
        let mut state = self.state();
        let before = state.entries.len();
        state.entries.retain(|e| e.handle != handle);
        if state.entries.len() != before {
            state.removed += 1;
        }
    }

    fn set_icon(&self, icon: &Icon) {
        self.state().icon = Some(icon.clone());
    }

    fn set_resident(&self, resident: bool) {
        self.state().resident = resident;
    }

    fn set_urgency(&self, urgency: Urgency) {
        self.state().urgency = urgency;
    }

    fn request_attention(&self) {
        self.state().attention += 1;
    }

    fn destroy(&self) {
        self.state().destroyed = true;
    }
}

/// Tray that hands out [`MemorySink`]s and remembers them per channel
#[derive(Debug, Default)]
pub struct MemoryTray {
    sinks: Mutex<HashMap<ChannelId, Vec<Arc<MemorySink>>>>,
}

impl MemoryTray {
    /// Create an empty tray
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest sink created for a channel
    pub fn sink(&self, channel: &ChannelId) -> Option<Arc<MemorySink>> {
        self.sinks
            .lock()
            .ok()
            .and_then(|sinks| sinks.get(channel).and_then(|v| v.last().cloned()))
    }

    /// How many sinks were ever created for a channel
    pub fn sinks_created(&self, channel: &ChannelId) -> usize {
        self.sinks
            .lock()
            .map(|sinks| sinks.get(channel).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

impl NotificationTray for MemoryTray {
    fn add_source(&self, channel: &ChannelId, _title: &str) -> Arc<dyn NotificationSink> {
        let sink = Arc::new(MemorySink::new());
        if let Ok(mut sinks) = self.sinks.lock() {
            sinks.entry(channel.clone()).or_default().push(sink.clone());
        }
        sink
    }
}
