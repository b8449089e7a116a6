//! Live state of one conversation
//!
//! A [`ConversationSource`] wraps a single text channel: it listens to the
//! channel and its contact, tracks the contact's presence and feeds a
//! [`Scrollback`]. Everything that suspends runs in a spawned task whose
//! result comes back to the registry as a [`SourceEvent`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::clock::Clock;
use crate::config::ScrollbackConfig;
use crate::conversation::presence::{self, PresenceState};
use crate::conversation::registry::{RegistryEvent, SourceId};
use crate::conversation::subscription::Subscription;
use crate::history::{MessageLogBridge, Scrollback};
use crate::message::{Direction, Message, MessageKind};
use crate::notification::{Icon, NotificationSink, NotificationTray, Urgency};
use crate::transport::{
    AccountId, Channel, ChannelEvent, ChannelId, ClientHandle, Contact, ContactEvent, Presence,
    TransportMessage,
};

/// Replies remembered per conversation
pub const SENT_HISTORY_LENGTH: usize = 20;

const ME_PREFIX: &str = "/me ";

/// Event addressed to one source
#[derive(Debug)]
pub enum SourceEvent {
    /// Channel signal
    Channel(ChannelEvent),
    /// Contact signal
    Contact(ContactEvent),
    /// The initial log fetch finished; empty on failure
    LogFetched(Vec<Message>),
    /// The divider timer of the given generation elapsed
    DividerDue(u64),
}

/// Whether a source survived handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    Alive,
    Destroyed,
}

/// Capabilities a conversation exposes to the notification layer
pub trait NotificationSource {
    /// Current title, the contact's alias
    fn title(&self) -> &str;

    /// Change the title
    fn set_title(&mut self, title: &str);

    /// Push the current banner content
    fn push_notification(&self);

    /// Bring the conversation to the user's notice
    fn notify(&self);

    /// Tear down the notification
    fn destroy(&mut self);
}

/// Collaborators shared by every source
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub config: ScrollbackConfig,
    pub client: Arc<dyn ClientHandle>,
    pub tray: Arc<dyn NotificationTray>,
    pub bridge: MessageLogBridge,
    pub clock: Arc<dyn Clock>,
    pub events: mpsc::UnboundedSender<RegistryEvent>,
}

/// One channel's conversation
#[derive(Debug)]
pub struct ConversationSource {
    id: SourceId,
    channel_id: ChannelId,
    account: AccountId,
    channel: Arc<dyn Channel>,
    contact: Arc<dyn Contact>,
    client: Arc<dyn ClientHandle>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn NotificationSink>,
    scrollback: Scrollback,
    title: String,
    presence: PresenceState,
    icon: Icon,
    sent_history: VecDeque<String>,
    events: mpsc::UnboundedSender<RegistryEvent>,
    subscriptions: Vec<Subscription>,
    log_fetch: Option<Subscription>,
    divider_timer: Option<(u64, Subscription)>,
    destroyed: bool,
}

impl ConversationSource {
    /// Create the source, register its notification and start seeding
    pub fn new(
        id: SourceId,
        account: AccountId,
        channel: Arc<dyn Channel>,
        contact: Arc<dyn Contact>,
        ctx: &SourceContext,
    ) -> Self {
        let channel_id = channel.id();
        let title = contact.alias();
        let sink = ctx.tray.add_source(&channel_id, &title);
        sink.set_resident(true);
        sink.set_urgency(Urgency::High);

        let scrollback = Scrollback::new(ctx.config.clone(), ctx.clock.clone(), sink.clone());

        let mut source = Self {
            id,
            channel_id: channel_id.clone(),
            account: account.clone(),
            channel: channel.clone(),
            contact: contact.clone(),
            client: ctx.client.clone(),
            clock: ctx.clock.clone(),
            sink,
            scrollback,
            title,
            presence: PresenceState::initial(contact.presence().kind),
            icon: Icon::default_avatar(),
            sent_history: VecDeque::new(),
            events: ctx.events.clone(),
            subscriptions: Vec::new(),
            log_fetch: None,
            divider_timer: None,
            destroyed: false,
        };

        source.subscribe();
        source.on_avatar_changed();
        source.push_notification();

        let bridge = ctx.bridge.clone();
        let partner = contact.identifier();
        let max_count = ctx.config.history_lines;
        let events = source.events.clone();
        source.log_fetch = Some(Subscription::once(
            "log-fetch",
            async move {
                let messages = match bridge.fetch_recent(&account, &partner, max_count).await {
                    Ok(messages) => messages,
                    Err(e) => {
                        tracing::warn!(partner = %partner, error = %e, "Failed to fetch conversation log");
                        Vec::new()
                    }
                };
                RegistryEvent::source(&channel_id, id, SourceEvent::LogFetched(messages))
            },
            events,
        ));

        tracing::info!(channel = %source.channel_id, title = %source.title, "Created conversation source");
        source
    }

    fn subscribe(&mut self) {
        let channel_id = self.channel_id.clone();
        let id = self.id;
        self.subscriptions.push(Subscription::forward(
            "channel",
            self.channel.subscribe(),
            self.events.clone(),
            move |event| RegistryEvent::source(&channel_id, id, SourceEvent::Channel(event)),
        ));

        let channel_id = self.channel_id.clone();
        self.subscriptions.push(Subscription::forward(
            "contact",
            self.contact.subscribe(),
            self.events.clone(),
            move |event| RegistryEvent::source(&channel_id, id, SourceEvent::Contact(event)),
        ));
    }

    /// Identity of this source instance
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// The channel this source wraps
    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    /// The account the channel belongs to
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn channel(&self) -> &Arc<dyn Channel> {
        &self.channel
    }

    /// Tracked presence of the contact
    pub fn presence(&self) -> PresenceState {
        self.presence
    }

    pub fn icon(&self) -> &Icon {
        &self.icon
    }

    /// The scrollback rendered into this source's sink
    pub fn scrollback(&self) -> &Scrollback {
        &self.scrollback
    }

    /// Replies sent through [`respond`](Self::respond), newest first
    pub fn sent_history(&self) -> impl Iterator<Item = &str> {
        self.sent_history.iter().map(String::as_str)
    }

    /// Number of live signal subscriptions
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether a divider timer is armed
    pub fn has_divider_timer(&self) -> bool {
        self.divider_timer.is_some()
    }

    /// Handle one event addressed to this source
    pub fn handle(&mut self, event: SourceEvent) -> SourceStatus {
        if self.destroyed {
            return SourceStatus::Destroyed;
        }

        match event {
            SourceEvent::Channel(ChannelEvent::Invalidated) => {
                self.close();
                return SourceStatus::Destroyed;
            }
            SourceEvent::Channel(ChannelEvent::MessageSent(message)) => {
                self.on_message_sent(&message)
            }
            SourceEvent::Channel(ChannelEvent::MessageReceived(message)) => {
                self.on_message_received(&message)
            }
            SourceEvent::Contact(ContactEvent::AliasChanged) => self.on_alias_changed(),
            SourceEvent::Contact(ContactEvent::AvatarChanged) => self.on_avatar_changed(),
            SourceEvent::Contact(ContactEvent::PresenceChanged(presence)) => {
                self.on_presence_changed(&presence)
            }
            SourceEvent::LogFetched(logged) => self.on_log_fetched(&logged),
            SourceEvent::DividerDue(generation) => {
                if matches!(self.divider_timer, Some((armed, _)) if armed == generation) {
                    self.divider_timer = None;
                }
                if !self.scrollback.fire_scheduled_divider(generation) {
                    tracing::trace!(generation, "Ignoring stale divider timer");
                }
            }
        }

        self.sync_divider_timer();
        SourceStatus::Alive
    }

    fn on_log_fetched(&mut self, logged: &[Message]) {
        self.log_fetch = None;
        let pending: Vec<Message> = self
            .channel
            .pending_messages()
            .iter()
            .map(|m| m.to_message(Direction::Received))
            .collect();

        let attention = self.scrollback.seed(&self.title, logged, &pending);
        self.push_notification();
        if attention {
            self.notify();
        }
    }

    /// A message arrived on the channel
    pub fn on_message_received(&mut self, message: &TransportMessage) {
        let message = message.to_message(Direction::Received);
        if !message.is_displayable() {
            tracing::trace!(channel = %self.channel_id, "Dropping delivery report");
            return;
        }
        self.scrollback
            .append_message(&self.title, &message, false, &[]);
        self.notify();
    }

    /// A message was sent on the channel
    pub fn on_message_sent(&mut self, message: &TransportMessage) {
        let message = message.to_message(Direction::Sent);
        self.scrollback
            .append_message(&self.title, &message, false, &[]);
    }

    /// The contact changed its alias
    pub fn on_alias_changed(&mut self) {
        let alias = self.contact.alias();
        let old = std::mem::replace(&mut self.title, alias);
        self.scrollback.append_alias_change(&old, &self.title);
    }

    /// The contact changed its avatar
    pub fn on_avatar_changed(&mut self) {
        self.icon = match self.contact.avatar_file() {
            Some(path) => Icon::Avatar(path),
            None => Icon::default_avatar(),
        };
        self.sink.set_icon(&self.icon);
    }

    /// The contact changed its presence
    pub fn on_presence_changed(&mut self, presence: &Presence) {
        let Some(change) = presence::transition(self.presence, presence, &self.title) else {
            return;
        };
        tracing::debug!(channel = %self.channel_id, state = ?change.state, "Presence changed");

        self.presence = change.state;
        self.scrollback
            .append_presence(&change.text, change.notify, &self.title);
        if change.notify {
            self.notify();
        }
    }

    /// Send a reply typed by the user
    ///
    /// A leading `/me ` turns the reply into an action.
    pub fn respond(&mut self, text: &str) {
        let (kind, body) = match text.strip_prefix(ME_PREFIX) {
            Some(rest) => (MessageKind::Action, rest.to_string()),
            None => (MessageKind::Normal, text.to_string()),
        };

        self.sent_history.push_front(text.to_string());
        self.sent_history.truncate(SENT_HISTORY_LENGTH);

        let channel = self.channel.clone();
        let channel_id = self.channel_id.clone();
        tokio::spawn(async move {
            if let Err(e) = channel.send_message(kind, &body).await {
                tracing::error!(channel = %channel_id, error = %e, "Failed to send message");
            }
        });
    }

    /// Bring the full conversation up in a chat client
    pub fn open(&self) {
        let time = self.clock.now_secs();
        let handling = self.client.is_handling_channel(&self.channel_id);
        let client = self.client.clone();
        let channel = self.channel.clone();
        let channel_id = self.channel_id.clone();

        tokio::spawn(async move {
            let result = if handling {
                client.delegate_channels(vec![channel], time).await
            } else {
                client.present_channel(channel, time).await
            };
            if let Err(e) = result {
                tracing::warn!(channel = %channel_id, handling, error = %e, "Failed to open conversation");
            }
        });
    }

    /// Detach from every signal
    pub fn close(&mut self) {
        tracing::debug!(channel = %self.channel_id, "Channel invalidated");
        self.subscriptions.clear();
        self.log_fetch = None;
        self.divider_timer = None;
    }

    fn sync_divider_timer(&mut self) {
        let Some(scheduled) = self.scrollback.scheduled_divider() else {
            self.divider_timer = None;
            return;
        };
        if matches!(self.divider_timer, Some((generation, _)) if generation == scheduled.generation)
        {
            return;
        }

        // Sleep until due_at, not for the delay recorded at scheduling
        let remaining = (scheduled.due_at - self.clock.now_secs()).max(0) as u64;
        let delay = Duration::from_secs(remaining).min(scheduled.delay);
        let channel_id = self.channel_id.clone();
        let id = self.id;
        let timer = Subscription::once(
            "divider",
            async move {
                tokio::time::sleep(delay).await;
                RegistryEvent::source(&channel_id, id, SourceEvent::DividerDue(scheduled.generation))
            },
            self.events.clone(),
        );
        self.divider_timer = Some((scheduled.generation, timer));
    }
}

impl NotificationSource for ConversationSource {
    fn title(&self) -> &str {
        &self.title
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn push_notification(&self) {
        self.scrollback.repush(&self.title);
    }

    fn notify(&self) {
        self.sink.request_attention();
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.close();
        self.scrollback.cancel_divider();
        self.sink.destroy();
        self.destroyed = true;
    }
}
