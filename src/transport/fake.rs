//! In-process fake transport for unit tests
//!
//! Each fake records the calls made against it and lets the test emit
//! signals. Subscribers get an unbounded channel per `subscribe()` call:
//!
//! ```text
//! fake.emit(event) -> subscriber_tx[i] -> stream returned by subscribe()
//! ```
//!
//! A subscriber that drops its stream disappears from
//! [`FakeChannel::subscriber_count`], which is how tests observe that a
//! source detached its signal handlers.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::error::{ChatlineError, Result};
use crate::history::bridge::{LogEvent, LogStore};
use crate::message::MessageKind;
use crate::transport::{
    AccountId, Channel, ChannelEvent, ChannelId, ClientHandle, Connection, Contact, ContactEvent,
    DispatchOperation, DispatchResponder, EventStream, Handle, HandleType, Presence, PresenceType,
    TransportMessage,
};

#[derive(Debug)]
struct Subscribers<T> {
    senders: Mutex<Vec<mpsc::UnboundedSender<T>>>,
}

impl<T: Clone + Send + 'static> Subscribers<T> {
    fn new() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }

    fn subscribe(&self) -> EventStream<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().unwrap().push(tx);
        Box::pin(UnboundedReceiverStream::new(rx))
    }

    fn emit(&self, event: T) {
        let mut senders = self.senders.lock().unwrap();
        senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn live(&self) -> usize {
        let mut senders = self.senders.lock().unwrap();
        senders.retain(|tx| !tx.is_closed());
        senders.len()
    }
}

/// Build a received/sent transport message
pub fn transport_message(
    kind: MessageKind,
    text: &str,
    sender: &str,
    timestamp: i64,
) -> TransportMessage {
    TransportMessage {
        kind,
        text: text.to_string(),
        sender_alias: sender.to_string(),
        received_timestamp: timestamp,
    }
}

/// Fake text or media channel
#[derive(Debug)]
pub struct FakeChannel {
    id: ChannelId,
    target: (Handle, HandleType),
    text: bool,
    pending: Mutex<Vec<TransportMessage>>,
    sent: Mutex<Vec<(MessageKind, String)>>,
    closes: AtomicUsize,
    subscribers: Subscribers<ChannelEvent>,
}

impl FakeChannel {
    /// Text channel targeting a single contact
    pub fn text(id: &str, handle: Handle) -> Arc<Self> {
        Arc::new(Self::build(id, (handle, HandleType::Contact), true))
    }

    /// Text channel targeting a room
    pub fn room(id: &str, handle: Handle) -> Arc<Self> {
        Arc::new(Self::build(id, (handle, HandleType::Room), true))
    }

    /// Non-text (e.g. call) channel
    pub fn media(id: &str, handle: Handle) -> Arc<Self> {
        Arc::new(Self::build(id, (handle, HandleType::Contact), false))
    }

    fn build(id: &str, target: (Handle, HandleType), text: bool) -> Self {
        Self {
            id: ChannelId::from(id),
            target,
            text,
            pending: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
            subscribers: Subscribers::new(),
        }
    }

    /// Queue a pending message
    pub fn push_pending(&self, message: TransportMessage) {
        self.pending.lock().unwrap().push(message);
    }

    /// Emit a channel signal
    pub fn emit(&self, event: ChannelEvent) {
        self.subscribers.emit(event);
    }

    /// Messages passed to `send_message`
    pub fn sent(&self) -> Vec<(MessageKind, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of `close` calls
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.live()
    }
}

#[async_trait::async_trait]
impl Channel for FakeChannel {
    fn id(&self) -> ChannelId {
        self.id.clone()
    }

    fn target(&self) -> (Handle, HandleType) {
        self.target
    }

    fn is_text(&self) -> bool {
        self.text
    }

    fn pending_messages(&self) -> Vec<TransportMessage> {
        self.pending.lock().unwrap().clone()
    }

    async fn send_message(&self, kind: MessageKind, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push((kind, text.to_string()));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe(&self) -> EventStream<ChannelEvent> {
        self.subscribers.subscribe()
    }
}

/// Fake remote contact
#[derive(Debug)]
pub struct FakeContact {
    identifier: String,
    alias: Mutex<String>,
    avatar: Mutex<Option<PathBuf>>,
    presence: Mutex<Presence>,
    subscribers: Subscribers<ContactEvent>,
}

impl FakeContact {
    /// Contact that is currently available
    pub fn new(identifier: &str, alias: &str) -> Arc<Self> {
        Self::with_presence(identifier, alias, PresenceType::Available)
    }

    /// Contact with the given initial presence
    pub fn with_presence(identifier: &str, alias: &str, presence: PresenceType) -> Arc<Self> {
        Arc::new(Self {
            identifier: identifier.to_string(),
            alias: Mutex::new(alias.to_string()),
            avatar: Mutex::new(None),
            presence: Mutex::new(Presence::new(presence)),
            subscribers: Subscribers::new(),
        })
    }

    /// Change the alias and emit `AliasChanged`
    pub fn set_alias(&self, alias: &str) {
        *self.alias.lock().unwrap() = alias.to_string();
        self.subscribers.emit(ContactEvent::AliasChanged);
    }

    /// Change the avatar and emit `AvatarChanged`
    pub fn set_avatar(&self, avatar: Option<PathBuf>) {
        *self.avatar.lock().unwrap() = avatar;
        self.subscribers.emit(ContactEvent::AvatarChanged);
    }

    /// Change presence and emit `PresenceChanged`
    pub fn set_presence(&self, presence: Presence) {
        *self.presence.lock().unwrap() = presence.clone();
        self.subscribers.emit(ContactEvent::PresenceChanged(presence));
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.live()
    }
}

impl Contact for FakeContact {
    fn identifier(&self) -> String {
        self.identifier.clone()
    }

    fn alias(&self) -> String {
        self.alias.lock().unwrap().clone()
    }

    fn avatar_file(&self) -> Option<PathBuf> {
        self.avatar.lock().unwrap().clone()
    }

    fn presence(&self) -> Presence {
        self.presence.lock().unwrap().clone()
    }

    fn subscribe(&self) -> EventStream<ContactEvent> {
        self.subscribers.subscribe()
    }
}

/// Fake connection resolving handles from a fixed table
#[derive(Debug, Default)]
pub struct FakeConnection {
    self_alias_known: AtomicBool,
    self_prepared: AtomicUsize,
    lookups: AtomicUsize,
    contacts: Mutex<HashMap<Handle, Arc<FakeContact>>>,
}

impl FakeConnection {
    /// Connection whose self contact already has its alias
    pub fn new() -> Arc<Self> {
        let conn = Self::default();
        conn.self_alias_known.store(true, Ordering::SeqCst);
        Arc::new(conn)
    }

    /// Connection whose self contact still needs preparing
    pub fn without_self_alias() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make a contact resolvable
    pub fn add_contact(&self, handle: Handle, contact: Arc<FakeContact>) {
        self.contacts.lock().unwrap().insert(handle, contact);
    }

    /// Number of `prepare_self_contact` calls
    pub fn self_prepared(&self) -> usize {
        self.self_prepared.load(Ordering::SeqCst)
    }

    /// Number of `fetch_contacts` calls
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Connection for FakeConnection {
    fn self_contact_has_alias(&self) -> bool {
        self.self_alias_known.load(Ordering::SeqCst)
    }

    async fn prepare_self_contact(&self) -> Result<()> {
        self.self_prepared.fetch_add(1, Ordering::SeqCst);
        self.self_alias_known.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_contacts(&self, handles: &[Handle]) -> Result<Vec<Arc<dyn Contact>>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let contacts = self.contacts.lock().unwrap();
        Ok(handles
            .iter()
            .filter_map(|h| contacts.get(h).cloned())
            .map(|c| c as Arc<dyn Contact>)
            .collect())
    }
}

/// Fake client registration
#[derive(Debug, Default)]
pub struct FakeClient {
    fail_register: bool,
    handling: Mutex<HashSet<ChannelId>>,
    delegated: Mutex<Vec<ChannelId>>,
    presented: Mutex<Vec<ChannelId>>,
}

impl FakeClient {
    /// Client that registers successfully
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Client whose registration fails
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_register: true,
            ..Self::default()
        })
    }

    /// Mark this process as the handler of a channel
    pub fn set_handling(&self, channel: &ChannelId, handling: bool) {
        let mut set = self.handling.lock().unwrap();
        if handling {
            set.insert(channel.clone());
        } else {
            set.remove(channel);
        }
    }

    /// Channels passed to `delegate_channels`
    pub fn delegated(&self) -> Vec<ChannelId> {
        self.delegated.lock().unwrap().clone()
    }

    /// Channels passed to `present_channel`
    pub fn presented(&self) -> Vec<ChannelId> {
        self.presented.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ClientHandle for FakeClient {
    fn register(&self) -> Result<()> {
        if self.fail_register {
            return Err(ChatlineError::Transport("bus name already taken".to_string()).into());
        }
        Ok(())
    }

    fn is_handling_channel(&self, channel: &ChannelId) -> bool {
        self.handling.lock().unwrap().contains(channel)
    }

    async fn delegate_channels(
        &self,
        channels: Vec<Arc<dyn Channel>>,
        _user_action_time: i64,
    ) -> Result<()> {
        let mut delegated = self.delegated.lock().unwrap();
        delegated.extend(channels.iter().map(|c| c.id()));
        Ok(())
    }

    async fn present_channel(&self, channel: Arc<dyn Channel>, _user_action_time: i64) -> Result<()> {
        self.presented.lock().unwrap().push(channel.id());
        Ok(())
    }
}

/// Fake dispatch operation
#[derive(Debug, Default)]
pub struct FakeDispatchOperation {
    fail: bool,
    claims: AtomicUsize,
}

impl FakeDispatchOperation {
    /// Operation whose claim succeeds
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Operation whose claim fails
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    /// Number of claim attempts
    pub fn claims(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DispatchOperation for FakeDispatchOperation {
    async fn claim(&self) -> Result<()> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ChatlineError::Claim("another approver claimed it".to_string()).into());
        }
        Ok(())
    }
}

/// Responder counting delay/accept calls
#[derive(Debug, Default)]
pub struct RecordingResponder {
    delays: AtomicUsize,
    accepts: AtomicUsize,
}

impl RecordingResponder {
    pub fn delays(&self) -> usize {
        self.delays.load(Ordering::SeqCst)
    }

    pub fn accepts(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }
}

impl DispatchResponder for RecordingResponder {
    fn delay(&self) {
        self.delays.fetch_add(1, Ordering::SeqCst);
    }

    fn accept(&self) {
        self.accepts.fetch_add(1, Ordering::SeqCst);
    }
}

/// Log store serving a fixed list of events
#[derive(Debug, Default)]
pub struct FakeLogStore {
    events: Mutex<Vec<LogEvent>>,
    fail: bool,
    requests: Mutex<Vec<(AccountId, String, usize)>>,
}

impl FakeLogStore {
    /// Store returning the given events
    pub fn with_events(events: Vec<LogEvent>) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(events),
            ..Self::default()
        })
    }

    /// Store whose fetch always fails
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    /// Recorded fetch requests
    pub fn requests(&self) -> Vec<(AccountId, String, usize)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LogStore for FakeLogStore {
    async fn fetch_recent_events(
        &self,
        account: &AccountId,
        partner: &str,
        max_count: usize,
    ) -> Result<Vec<LogEvent>> {
        self.requests
            .lock()
            .unwrap()
            .push((account.clone(), partner.to_string(), max_count));
        if self.fail {
            return Err(ChatlineError::LogStore("log daemon unavailable".to_string()).into());
        }
        let events = self.events.lock().unwrap();
        let skip = events.len().saturating_sub(max_count);
        Ok(events[skip..].to_vec())
    }
}
