//! Conversation lifecycle
//!
//! - [`registry`]: dispatcher callbacks and the one-source-per-channel map
//! - [`source`]: live state of a single conversation
//! - [`presence`]: presence folding and the notification rules
//! - [`subscription`]: abort-on-drop signal forwarding

pub mod presence;
pub mod registry;
pub mod source;
pub mod subscription;

pub use presence::{PresenceChange, PresenceState};
pub use registry::{ConversationRegistry, DispatchRequest, RegistryEvent, SourceId};
pub use source::{ConversationSource, NotificationSource, SourceEvent, SourceStatus};
pub use subscription::Subscription;
