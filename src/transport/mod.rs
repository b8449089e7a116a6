//! Transport abstraction
//!
//! This module defines the seams through which the conversation core talks
//! to the instant-messaging transport stack. The stack itself (channel
//! creation, delivery, presence propagation, avatar storage) lives outside
//! this crate; a host process wires concrete implementations of these traits
//! into [`crate::conversation::ConversationRegistry`].
//!
//! - [`fake`] -- in-process fakes used in tests (cfg(test) only).
//!
//! # Design
//!
//! Signals are exposed as pinned [`Stream`]s. A subscriber drains a stream
//! for as long as it wants the events and simply drops it to disconnect.
//! Operations that suspend (claims, sends, contact lookups) are `async`.

use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::{Direction, Message, MessageKind};

#[cfg(test)]
pub mod fake;

/// Boxed stream of signal payloads
pub type EventStream<T> = Pin<Box<dyn Stream<Item = T> + Send + 'static>>;

/// Unique identifier of a channel (its object path)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(String);

impl ChannelId {
    /// Create a channel id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the account a channel belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create an account id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport handle of a channel target or contact
pub type Handle = u32;

/// What kind of entity a channel targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleType {
    None,
    Contact,
    Room,
    List,
    Group,
}

/// Presence as reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresenceType {
    Unset,
    Offline,
    Available,
    Away,
    ExtendedAway,
    Hidden,
    Busy,
    Unknown,
    Error,
}

/// A contact's presence snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    pub kind: PresenceType,
    /// Transport status identifier, e.g. `"dnd"`
    pub status: String,
    /// Free-form status message set by the contact
    pub message: String,
}

impl Presence {
    /// Presence with no status text
    pub fn new(kind: PresenceType) -> Self {
        Self {
            kind,
            status: String::new(),
            message: String::new(),
        }
    }
}

/// Text message as delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportMessage {
    pub kind: MessageKind,
    pub text: String,
    pub sender_alias: String,
    /// Epoch seconds when the transport received it; `0` if unknown
    pub received_timestamp: i64,
}

impl TransportMessage {
    /// Normalize into a [`Message`]
    pub fn to_message(&self, direction: Direction) -> Message {
        Message::new(
            self.kind,
            self.text.clone(),
            self.sender_alias.clone(),
            self.received_timestamp,
            direction,
        )
    }
}

/// Signals emitted by a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The channel is gone
    Invalidated,
    /// A message was sent on this channel, by us or another client
    MessageSent(TransportMessage),
    /// A message arrived
    MessageReceived(TransportMessage),
}

/// Signals emitted by a contact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactEvent {
    AliasChanged,
    AvatarChanged,
    PresenceChanged(Presence),
}

/// A remote contact with its rich profile
pub trait Contact: Send + Sync + fmt::Debug {
    /// Stable identifier, used as the log partner identity
    fn identifier(&self) -> String;

    /// Current display name
    fn alias(&self) -> String;

    /// Avatar file, if the contact has one
    fn avatar_file(&self) -> Option<PathBuf>;

    /// Current presence
    fn presence(&self) -> Presence;

    /// Subscribe to alias/avatar/presence changes
    fn subscribe(&self) -> EventStream<ContactEvent>;
}

/// A transport connection
#[async_trait::async_trait]
pub trait Connection: Send + Sync + fmt::Debug {
    /// Whether the local user's own contact already carries its alias
    fn self_contact_has_alias(&self) -> bool;

    /// Fetch the self contact's alias, avatar and presence
    async fn prepare_self_contact(&self) -> Result<()>;

    /// Resolve handles into contacts with alias, avatar and presence loaded
    ///
    /// Handles that cannot be resolved are omitted from the result.
    async fn fetch_contacts(&self, handles: &[Handle]) -> Result<Vec<Arc<dyn Contact>>>;
}

/// A transport channel
#[async_trait::async_trait]
pub trait Channel: Send + Sync + fmt::Debug {
    /// Unique identifier
    fn id(&self) -> ChannelId;

    /// Target handle and its type
    fn target(&self) -> (Handle, HandleType);

    /// Whether this is a text channel
    fn is_text(&self) -> bool;

    /// Messages delivered by the transport but not yet acknowledged
    fn pending_messages(&self) -> Vec<TransportMessage>;

    /// Send a message; the transport echoes it back as `MessageSent`
    async fn send_message(&self, kind: MessageKind, text: &str) -> Result<()>;

    /// Close the channel
    async fn close(&self) -> Result<()>;

    /// Subscribe to channel signals
    fn subscribe(&self) -> EventStream<ChannelEvent>;
}

/// A pending dispatch operation that approvers can claim
#[async_trait::async_trait]
pub trait DispatchOperation: Send + Sync + fmt::Debug {
    /// Claim the operation for this client
    async fn claim(&self) -> Result<()>;
}

/// This process's client registration with the dispatcher
#[async_trait::async_trait]
pub trait ClientHandle: Send + Sync + fmt::Debug {
    /// Register the observer/approver/handler with the dispatcher
    fn register(&self) -> Result<()>;

    /// Whether this process is currently the handler for a channel
    fn is_handling_channel(&self, channel: &ChannelId) -> bool;

    /// Hand channels over to another capable handler
    async fn delegate_channels(&self, channels: Vec<Arc<dyn Channel>>, user_action_time: i64)
        -> Result<()>;

    /// Ask the current handler to present a channel
    async fn present_channel(&self, channel: Arc<dyn Channel>, user_action_time: i64) -> Result<()>;
}

/// Responder side of a dispatcher callback
pub trait DispatchResponder: Send + Sync + fmt::Debug {
    /// Tell the dispatcher the response will come later
    fn delay(&self);

    /// Tell the dispatcher the callback succeeded
    fn accept(&self);
}

/// State of a [`DispatchContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseState {
    Pending,
    Responded,
}

/// Pending response to a dispatcher callback
///
/// Every observe/approve/handle callback must eventually be accepted. The
/// context moves from `Pending` to `Responded` exactly once; dropping a
/// pending context accepts it so a lost continuation cannot stall the
/// dispatcher.
#[derive(Debug)]
pub struct DispatchContext {
    responder: Arc<dyn DispatchResponder>,
    state: ResponseState,
    delayed: bool,
}

impl DispatchContext {
    /// Wrap a responder
    pub fn new(responder: Arc<dyn DispatchResponder>) -> Self {
        Self {
            responder,
            state: ResponseState::Pending,
            delayed: false,
        }
    }

    /// Current state
    pub fn state(&self) -> ResponseState {
        self.state
    }

    /// Whether `delay` was signalled
    pub fn is_delayed(&self) -> bool {
        self.delayed
    }

    /// Signal that the response will come after a suspension
    pub fn delay(&mut self) {
        if self.state == ResponseState::Pending && !self.delayed {
            self.delayed = true;
            self.responder.delay();
        }
    }

    /// Accept the callback, consuming the context
    pub fn accept(mut self) {
        self.respond();
    }

    fn respond(&mut self) {
        if self.state == ResponseState::Pending {
            self.state = ResponseState::Responded;
            self.responder.accept();
        }
    }
}

impl Drop for DispatchContext {
    fn drop(&mut self) {
        if self.state == ResponseState::Pending {
            tracing::warn!("Dispatch context dropped without a response, accepting");
            self.respond();
        }
    }
}
