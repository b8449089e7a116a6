//! Conversation registry
//!
//! The registry is the single point of contact with the transport
//! dispatcher. It owns every [`ConversationSource`], keyed by channel, and
//! is the only code that adds or removes them.
//!
//! # Event loop
//!
//! All state lives on one task. Dispatcher requests, tray events and the
//! results of spawned work (contact lookups, claims, log fetches, signal
//! forwards, divider timers) are processed one at a time:
//!
//! ```text
//! DispatchRequest ─┐
//! TrayEvent ───────┼─> ConversationRegistry::run ─> ConversationSource
//! RegistryEvent ───┘         (HashMap<ChannelId, _>)
//! ```
//!
//! Events for a source carry its [`SourceId`]; an event that reaches a
//! recreated source with a different id is dropped.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::clock::Clock;
use crate::config::Config;
use crate::conversation::source::{
    ConversationSource, NotificationSource, SourceContext, SourceEvent, SourceStatus,
};
use crate::error::{ChatlineError, Result};
use crate::history::{LogStore, MessageLogBridge};
use crate::notification::{NotificationTray, TrayEvent};
use crate::transport::{
    AccountId, Channel, ChannelId, ClientHandle, Connection, Contact, DispatchContext,
    DispatchOperation, HandleType,
};

/// Identity of one source instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u64);

/// Results of spawned work re-entering the event loop
#[derive(Debug)]
pub enum RegistryEvent {
    /// The self contact was prepared; observation can proceed
    SelfContactReady {
        account: AccountId,
        connection: Arc<dyn Connection>,
        channels: Vec<Arc<dyn Channel>>,
        context: DispatchContext,
    },
    /// A channel's target contact was looked up
    ContactResolved {
        account: AccountId,
        channel: Arc<dyn Channel>,
        contact: Option<Arc<dyn Contact>>,
    },
    /// A dispatch operation claim finished
    ClaimFinished {
        channels: Vec<Arc<dyn Channel>>,
        result: Result<()>,
    },
    /// Event for one source
    Source {
        channel: ChannelId,
        source: SourceId,
        event: SourceEvent,
    },
}

impl RegistryEvent {
    /// Address `event` to the source `source` of `channel`
    pub fn source(channel: &ChannelId, source: SourceId, event: SourceEvent) -> Self {
        RegistryEvent::Source {
            channel: channel.clone(),
            source,
            event,
        }
    }
}

/// Callback from the transport dispatcher
#[derive(Debug)]
pub enum DispatchRequest {
    /// New channels appeared
    Observe {
        account: AccountId,
        connection: Arc<dyn Connection>,
        channels: Vec<Arc<dyn Channel>>,
        context: DispatchContext,
    },
    /// Channels need a handler; claiming makes this process handle them
    Approve {
        account: AccountId,
        connection: Arc<dyn Connection>,
        channels: Vec<Arc<dyn Channel>>,
        operation: Arc<dyn DispatchOperation>,
        context: DispatchContext,
    },
    /// This process was chosen to handle the channels
    Handle {
        account: AccountId,
        connection: Arc<dyn Connection>,
        channels: Vec<Arc<dyn Channel>>,
        user_action_time: i64,
        context: DispatchContext,
    },
}

/// Owner of every live conversation source
#[derive(Debug)]
pub struct ConversationRegistry {
    ctx: SourceContext,
    sources: HashMap<ChannelId, ConversationSource>,
    next_id: u64,
    events: mpsc::UnboundedReceiver<RegistryEvent>,
}

impl ConversationRegistry {
    /// Register with the dispatcher and create an empty registry
    ///
    /// # Errors
    ///
    /// Returns [`ChatlineError::Registration`] when the client cannot be
    /// registered; the process cannot work without it.
    pub fn new(
        config: &Config,
        client: Arc<dyn ClientHandle>,
        tray: Arc<dyn NotificationTray>,
        log_store: Arc<dyn LogStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        client
            .register()
            .map_err(|e| ChatlineError::Registration(e.to_string()))?;
        tracing::info!(
            name = %config.client.name,
            uniquify = config.client.uniquify_name,
            "Registered with dispatcher"
        );

        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            ctx: SourceContext {
                config: config.scrollback.clone(),
                client,
                tray,
                bridge: MessageLogBridge::new(log_store),
                clock,
                events: tx,
            },
            sources: HashMap::new(),
            next_id: 0,
            events: rx,
        })
    }

    /// Number of live sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Whether a source exists for `channel`
    pub fn contains(&self, channel: &ChannelId) -> bool {
        self.sources.contains_key(channel)
    }

    /// The source for `channel`
    pub fn source(&self, channel: &ChannelId) -> Option<&ConversationSource> {
        self.sources.get(channel)
    }

    /// Route a dispatcher callback
    pub fn dispatch(&mut self, request: DispatchRequest) {
        match request {
            DispatchRequest::Observe {
                account,
                connection,
                channels,
                context,
            } => self.on_observe(account, connection, channels, context),
            DispatchRequest::Approve {
                account,
                connection,
                channels,
                operation,
                context,
            } => self.on_approve(account, connection, channels, operation, context),
            DispatchRequest::Handle {
                account,
                connection,
                channels,
                user_action_time,
                context,
            } => self.on_handle(account, connection, channels, user_action_time, context),
        }
    }

    /// New channels appeared on `connection`
    ///
    /// When the self contact still lacks its alias the response is delayed
    /// until it has been prepared.
    pub fn on_observe(
        &mut self,
        account: AccountId,
        connection: Arc<dyn Connection>,
        channels: Vec<Arc<dyn Channel>>,
        mut context: DispatchContext,
    ) {
        if connection.self_contact_has_alias() {
            self.finish_observe(account, connection, channels, context);
            return;
        }

        tracing::debug!(account = %account, "Preparing self contact before observing");
        context.delay();
        let events = self.ctx.events.clone();
        tokio::spawn(async move {
            if let Err(e) = connection.prepare_self_contact().await {
                tracing::warn!(account = %account, error = %e, "Failed to prepare self contact");
            }
            let _ = events.send(RegistryEvent::SelfContactReady {
                account,
                connection,
                channels,
                context,
            });
        });
    }

    fn finish_observe(
        &mut self,
        account: AccountId,
        connection: Arc<dyn Connection>,
        channels: Vec<Arc<dyn Channel>>,
        context: DispatchContext,
    ) {
        for channel in channels {
            let (handle, handle_type) = channel.target();
            if !channel.is_text() || handle_type != HandleType::Contact {
                tracing::debug!(channel = %channel.id(), ?handle_type, "Ignoring channel");
                continue;
            }
            if self.contains(&channel.id()) {
                continue;
            }

            let connection = connection.clone();
            let account = account.clone();
            let events = self.ctx.events.clone();
            tokio::spawn(async move {
                let contact = match connection.fetch_contacts(&[handle]).await {
                    Ok(contacts) => contacts.into_iter().next(),
                    Err(e) => {
                        tracing::warn!(channel = %channel.id(), error = %e, "Failed to fetch contact");
                        None
                    }
                };
                let _ = events.send(RegistryEvent::ContactResolved {
                    account,
                    channel,
                    contact,
                });
            });
        }

        context.accept();
    }

    /// Channels await approval; claim them for this process
    pub fn on_approve(
        &mut self,
        account: AccountId,
        _connection: Arc<dyn Connection>,
        channels: Vec<Arc<dyn Channel>>,
        operation: Arc<dyn DispatchOperation>,
        context: DispatchContext,
    ) {
        tracing::debug!(account = %account, channels = channels.len(), "Claiming channels");
        let events = self.ctx.events.clone();
        tokio::spawn(async move {
            let result = operation.claim().await;
            let _ = events.send(RegistryEvent::ClaimFinished { channels, result });
        });
        context.accept();
    }

    /// This process handles the channels
    pub fn on_handle(
        &mut self,
        account: AccountId,
        _connection: Arc<dyn Connection>,
        channels: Vec<Arc<dyn Channel>>,
        user_action_time: i64,
        context: DispatchContext,
    ) {
        tracing::debug!(account = %account, user_action_time, "Handling channels");
        self.handle_channels(channels);
        context.accept();
    }

    /// Close channels we cannot show and re-notify the ones we already do
    pub fn handle_channels(&mut self, channels: Vec<Arc<dyn Channel>>) {
        for channel in channels {
            let id = channel.id();
            if !channel.is_text() {
                tracing::debug!(channel = %id, "Closing non-text channel");
                spawn_close(channel);
                continue;
            }
            if !self.ctx.client.is_handling_channel(&id) {
                continue;
            }
            if let Some(source) = self.sources.get(&id) {
                source.notify();
            }
        }
    }

    /// Create the source for `channel` unless one already exists
    ///
    /// Returns true when a new source was created.
    pub fn create_source(
        &mut self,
        account: AccountId,
        channel: Arc<dyn Channel>,
        contact: Arc<dyn Contact>,
    ) -> bool {
        let channel_id = channel.id();
        if self.sources.contains_key(&channel_id) {
            tracing::debug!(channel = %channel_id, "Source already exists");
            return false;
        }

        self.next_id += 1;
        let source =
            ConversationSource::new(SourceId(self.next_id), account, channel, contact, &self.ctx);
        self.sources.insert(channel_id, source);
        true
    }

    /// Remove and tear down the source for `channel`
    ///
    /// Closes the channel first when this process still handles it. This is
    /// the only place sources leave the map.
    pub fn destroy_source(&mut self, channel: &ChannelId) {
        let Some(mut source) = self.sources.remove(channel) else {
            return;
        };
        if self.ctx.client.is_handling_channel(channel) {
            spawn_close(source.channel().clone());
        }
        source.destroy();
        tracing::info!(channel = %channel, "Destroyed conversation source");
    }

    /// React to user interaction in the tray
    pub fn on_tray_event(&mut self, event: TrayEvent) {
        match event {
            TrayEvent::Reply { channel, text } => match self.sources.get_mut(&channel) {
                Some(source) => source.respond(&text),
                None => tracing::warn!(channel = %channel, "Reply for unknown conversation"),
            },
            TrayEvent::Activated { channel } => {
                if let Some(source) = self.sources.get(&channel) {
                    source.open();
                }
            }
            TrayEvent::Discarded { channel } => self.destroy_source(&channel),
        }
    }

    fn process(&mut self, event: RegistryEvent) {
        match event {
            RegistryEvent::SelfContactReady {
                account,
                connection,
                channels,
                context,
            } => self.finish_observe(account, connection, channels, context),
            RegistryEvent::ContactResolved {
                account,
                channel,
                contact,
            } => match contact {
                Some(contact) => {
                    self.create_source(account, channel, contact);
                }
                None => tracing::debug!(channel = %channel.id(), "No contact for channel"),
            },
            RegistryEvent::ClaimFinished { channels, result } => match result {
                Ok(()) => self.handle_channels(channels),
                Err(e) => tracing::error!(error = %e, "Failed to claim channels"),
            },
            RegistryEvent::Source {
                channel,
                source,
                event,
            } => {
                let status = match self.sources.get_mut(&channel) {
                    Some(current) if current.id() == source => current.handle(event),
                    _ => {
                        tracing::trace!(channel = %channel, "Dropping event for stale source");
                        return;
                    }
                };
                if status == SourceStatus::Destroyed {
                    self.destroy_source(&channel);
                }
            }
        }
    }

    /// Wait for the next internal event and process it
    pub async fn step(&mut self) {
        if let Some(event) = self.events.recv().await {
            self.process(event);
        }
    }

    /// Process every internal event that is already queued
    pub fn process_ready(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.events.try_recv() {
            self.process(event);
            processed += 1;
        }
        processed
    }

    /// Run until the dispatcher side goes away
    pub async fn run(
        mut self,
        mut dispatch: mpsc::Receiver<DispatchRequest>,
        mut tray: mpsc::Receiver<TrayEvent>,
    ) {
        tracing::info!("Conversation registry running");
        loop {
            tokio::select! {
                request = dispatch.recv() => match request {
                    Some(request) => self.dispatch(request),
                    None => break,
                },
                Some(event) = tray.recv() => self.on_tray_event(event),
                Some(event) = self.events.recv() => self.process(event),
            }
        }

        let channels: Vec<ChannelId> = self.sources.keys().cloned().collect();
        for channel in channels {
            self.destroy_source(&channel);
        }
        tracing::info!("Conversation registry stopped");
    }
}

fn spawn_close(channel: Arc<dyn Channel>) {
    tokio::spawn(async move {
        if let Err(e) = channel.close().await {
            tracing::warn!(channel = %channel.id(), error = %e, "Failed to close channel");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::history::LogEvent;
    use crate::message::MessageKind;
    use crate::notification::MemoryTray;
    use crate::transport::fake::{
        transport_message, FakeChannel, FakeClient, FakeConnection, FakeContact,
        FakeDispatchOperation, FakeLogStore, RecordingResponder,
    };
    use crate::transport::{ChannelEvent, ResponseState};

    const NOW: i64 = 1_700_000_000;

    struct Harness {
        registry: ConversationRegistry,
        tray: Arc<MemoryTray>,
        client: Arc<FakeClient>,
        connection: Arc<FakeConnection>,
        store: Arc<FakeLogStore>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_connection(FakeConnection::new())
        }

        fn with_connection(connection: Arc<FakeConnection>) -> Self {
            let tray = Arc::new(MemoryTray::new());
            let client = FakeClient::new();
            let store = FakeLogStore::with_events(vec![]);
            let registry = ConversationRegistry::new(
                &Config::default(),
                client.clone(),
                tray.clone(),
                store.clone(),
                Arc::new(ManualClock::at_secs(NOW)),
            )
            .unwrap();
            Self {
                registry,
                tray,
                client,
                connection,
                store,
            }
        }

        fn text_channel(&self, id: &str, handle: u32) -> Arc<FakeChannel> {
            self.connection
                .add_contact(handle, FakeContact::new(&format!("user{}", handle), "Bob"));
            FakeChannel::text(id, handle)
        }

        fn observe(&mut self, channels: Vec<Arc<dyn Channel>>) -> Arc<RecordingResponder> {
            let responder = Arc::new(RecordingResponder::default());
            self.registry.dispatch(DispatchRequest::Observe {
                account: AccountId::from("acct/1"),
                connection: self.connection.clone(),
                channels,
                context: DispatchContext::new(responder.clone()),
            });
            responder
        }

        async fn settle(&mut self) {
            for _ in 0..10 {
                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }
                self.registry.process_ready();
            }
        }
    }

    #[test]
    fn test_registration_failure_is_fatal() {
        let err = ConversationRegistry::new(
            &Config::default(),
            FakeClient::failing(),
            Arc::new(MemoryTray::new()),
            FakeLogStore::with_events(vec![]),
            Arc::new(ManualClock::at_secs(NOW)),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChatlineError>(),
            Some(ChatlineError::Registration(_))
        ));
    }

    #[tokio::test]
    async fn test_observe_creates_one_source_per_channel() {
        let mut h = Harness::new();
        let channel = h.text_channel("/chan/1", 7);

        let first = h.observe(vec![channel.clone()]);
        h.settle().await;
        let second = h.observe(vec![channel.clone()]);
        h.settle().await;

        assert_eq!(h.registry.len(), 1);
        assert_eq!(h.tray.sinks_created(&channel.id()), 1);
        assert_eq!(first.accepts(), 1);
        assert_eq!(second.accepts(), 1);
        assert_eq!(first.delays(), 0);
    }

    #[tokio::test]
    async fn test_create_source_is_idempotent() {
        let mut h = Harness::new();
        let channel = h.text_channel("/chan/1", 7);
        let contact: Arc<dyn Contact> = FakeContact::new("bob", "Bob");

        assert!(h
            .registry
            .create_source(AccountId::from("acct/1"), channel.clone(), contact.clone()));
        assert!(!h
            .registry
            .create_source(AccountId::from("acct/1"), channel.clone(), contact));
        assert_eq!(h.registry.len(), 1);
        assert_eq!(channel.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_observe_ignores_rooms_and_media_without_closing() {
        let mut h = Harness::new();
        let room = FakeChannel::room("/chan/room", 9);
        let media = FakeChannel::media("/chan/call", 10);

        let responder = h.observe(vec![room.clone(), media.clone()]);
        h.settle().await;

        assert!(h.registry.is_empty());
        assert_eq!(room.close_count(), 0);
        assert_eq!(media.close_count(), 0);
        assert_eq!(h.connection.lookups(), 0);
        assert_eq!(responder.accepts(), 1);
    }

    #[tokio::test]
    async fn test_observe_skips_unresolvable_contact() {
        let mut h = Harness::new();
        let channel = FakeChannel::text("/chan/ghost", 404);

        let responder = h.observe(vec![channel.clone()]);
        h.settle().await;

        assert!(h.registry.is_empty());
        assert_eq!(h.connection.lookups(), 1);
        assert_eq!(responder.accepts(), 1);
    }

    #[tokio::test]
    async fn test_observe_waits_for_self_contact() {
        let mut h = Harness::with_connection(FakeConnection::without_self_alias());
        let channel = h.text_channel("/chan/1", 7);

        let responder = h.observe(vec![channel.clone()]);
        assert_eq!(responder.delays(), 1);
        assert_eq!(responder.accepts(), 0);

        h.settle().await;
        assert_eq!(h.connection.self_prepared(), 1);
        assert_eq!(responder.delays(), 1);
        assert_eq!(responder.accepts(), 1);
        assert!(h.registry.contains(&channel.id()));
    }

    #[tokio::test]
    async fn test_source_seeds_from_log() {
        let mut h = Harness::new();
        h.store = FakeLogStore::with_events(vec![LogEvent {
            sender: "Bob".to_string(),
            is_self: false,
            text: "earlier".to_string(),
            kind: MessageKind::Normal,
            timestamp: NOW - 3600,
        }]);
        // Rebuild with the populated store
        let registry = ConversationRegistry::new(
            &Config::default(),
            h.client.clone(),
            h.tray.clone(),
            h.store.clone(),
            Arc::new(ManualClock::at_secs(NOW)),
        )
        .unwrap();
        h.registry = registry;

        let channel = h.text_channel("/chan/1", 7);
        channel.push_pending(transport_message(MessageKind::Normal, "now", "Bob", NOW));
        h.observe(vec![channel.clone()]);
        h.settle().await;

        let sink = h.tray.sink(&channel.id()).unwrap();
        assert_eq!(sink.real_texts(), vec!["earlier", "now"]);
        assert_eq!(sink.attention_count(), 1);
    }

    #[tokio::test]
    async fn test_invalidated_channel_removes_source() {
        let mut h = Harness::new();
        let channel = h.text_channel("/chan/1", 7);
        h.observe(vec![channel.clone()]);
        h.settle().await;
        let sink = h.tray.sink(&channel.id()).unwrap();

        channel.emit(ChannelEvent::Invalidated);
        h.settle().await;

        assert!(h.registry.is_empty());
        assert!(sink.is_destroyed());
        assert_eq!(channel.subscriber_count(), 0);
        assert_eq!(channel.close_count(), 0);
    }

    #[tokio::test]
    async fn test_destroyed_source_can_be_recreated() {
        let mut h = Harness::new();
        let channel = h.text_channel("/chan/1", 7);
        h.observe(vec![channel.clone()]);
        h.settle().await;

        h.registry.destroy_source(&channel.id());
        assert!(h.registry.is_empty());

        h.observe(vec![channel.clone()]);
        h.settle().await;
        assert_eq!(h.registry.len(), 1);
        assert_eq!(h.tray.sinks_created(&channel.id()), 2);
        assert_eq!(channel.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_events_do_not_reach_recreated_source() {
        let mut h = Harness::new();
        let channel = h.text_channel("/chan/1", 7);
        h.observe(vec![channel.clone()]);
        h.settle().await;
        let old_id = h.registry.source(&channel.id()).unwrap().id();

        h.registry.destroy_source(&channel.id());
        h.observe(vec![channel.clone()]);
        h.settle().await;
        assert_ne!(h.registry.source(&channel.id()).unwrap().id(), old_id);

        h.ctx_send(RegistryEvent::source(
            &channel.id(),
            old_id,
            SourceEvent::Channel(ChannelEvent::Invalidated),
        ));
        h.settle().await;
        assert!(h.registry.contains(&channel.id()));
    }

    impl Harness {
        fn ctx_send(&self, event: RegistryEvent) {
            self.registry.ctx.events.send(event).unwrap();
        }
    }

    #[tokio::test]
    async fn test_discard_closes_channel_only_when_handling() {
        let mut h = Harness::new();
        let observed = h.text_channel("/chan/1", 7);
        let handled = h.text_channel("/chan/2", 8);
        h.observe(vec![observed.clone(), handled.clone()]);
        h.settle().await;
        h.client.set_handling(&handled.id(), true);

        h.registry.on_tray_event(TrayEvent::Discarded {
            channel: observed.id(),
        });
        h.registry.on_tray_event(TrayEvent::Discarded {
            channel: handled.id(),
        });
        h.settle().await;

        assert!(h.registry.is_empty());
        assert_eq!(observed.close_count(), 0);
        assert_eq!(handled.close_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_claim_is_logged_and_context_accepted() {
        let mut h = Harness::new();
        let media = FakeChannel::media("/chan/call", 3);
        let operation = FakeDispatchOperation::failing();
        let responder = Arc::new(RecordingResponder::default());

        h.registry.dispatch(DispatchRequest::Approve {
            account: AccountId::from("acct/1"),
            connection: h.connection.clone(),
            channels: vec![media.clone()],
            operation: operation.clone(),
            context: DispatchContext::new(responder.clone()),
        });
        assert_eq!(responder.accepts(), 1);

        h.settle().await;
        assert_eq!(operation.claims(), 1);
        assert_eq!(media.close_count(), 0);
    }

    #[tokio::test]
    async fn test_successful_claim_handles_channels() {
        let mut h = Harness::new();
        let media = FakeChannel::media("/chan/call", 3);
        let operation = FakeDispatchOperation::new();
        let responder = Arc::new(RecordingResponder::default());

        h.registry.dispatch(DispatchRequest::Approve {
            account: AccountId::from("acct/1"),
            connection: h.connection.clone(),
            channels: vec![media.clone()],
            operation,
            context: DispatchContext::new(responder.clone()),
        });
        h.settle().await;

        assert_eq!(media.close_count(), 1);
        assert_eq!(responder.accepts(), 1);
    }

    #[tokio::test]
    async fn test_handle_renotifies_existing_source() {
        let mut h = Harness::new();
        let channel = h.text_channel("/chan/1", 7);
        h.observe(vec![channel.clone()]);
        h.settle().await;
        h.client.set_handling(&channel.id(), true);

        let responder = Arc::new(RecordingResponder::default());
        let context = DispatchContext::new(responder.clone());
        assert_eq!(context.state(), ResponseState::Pending);
        h.registry.dispatch(DispatchRequest::Handle {
            account: AccountId::from("acct/1"),
            connection: h.connection.clone(),
            channels: vec![channel.clone()],
            user_action_time: NOW,
            context,
        });
        h.settle().await;

        let sink = h.tray.sink(&channel.id()).unwrap();
        assert_eq!(sink.attention_count(), 1);
        assert_eq!(h.registry.len(), 1);
        assert_eq!(h.tray.sinks_created(&channel.id()), 1);
        assert_eq!(responder.accepts(), 1);
    }

    #[tokio::test]
    async fn test_reply_and_activation_reach_source() {
        let mut h = Harness::new();
        let channel = h.text_channel("/chan/1", 7);
        h.observe(vec![channel.clone()]);
        h.settle().await;

        h.registry.on_tray_event(TrayEvent::Reply {
            channel: channel.id(),
            text: "/me waves".to_string(),
        });
        h.registry.on_tray_event(TrayEvent::Activated {
            channel: channel.id(),
        });
        h.settle().await;

        assert_eq!(channel.sent(), vec![(MessageKind::Action, "waves".to_string())]);
        assert_eq!(h.client.presented(), vec![channel.id()]);
    }

    #[tokio::test]
    async fn test_run_stops_when_dispatcher_goes_away() {
        let h = Harness::new();
        let channel = h.text_channel("/chan/1", 7);
        let (dispatch_tx, dispatch_rx) = mpsc::channel(8);
        let (_tray_tx, tray_rx) = mpsc::channel(8);
        let tray = h.tray.clone();
        let connection = h.connection.clone();

        let task = tokio::spawn(h.registry.run(dispatch_rx, tray_rx));
        let responder = Arc::new(RecordingResponder::default());
        dispatch_tx
            .send(DispatchRequest::Observe {
                account: AccountId::from("acct/1"),
                connection,
                channels: vec![channel.clone()],
                context: DispatchContext::new(responder.clone()),
            })
            .await
            .unwrap();

        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        drop(dispatch_tx);
        task.await.unwrap();

        assert_eq!(responder.accepts(), 1);
        let sink = tray.sink(&channel.id()).unwrap();
        assert!(sink.is_destroyed());
    }
}
