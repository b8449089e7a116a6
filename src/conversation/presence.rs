//! Presence tracking for a conversation partner

use crate::markup;
use crate::transport::{Presence, PresenceType};

/// Presence as tracked by a conversation source
///
/// Extended-away folds into `Offline`. `Unknown` is only ever an initial
/// state; transitions into it are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    Available,
    Offline,
    Away,
    Busy,
    Unknown,
}

impl PresenceState {
    /// State a source starts in for the contact's current presence
    pub fn initial(kind: PresenceType) -> Self {
        Self::from_transport(kind).unwrap_or(PresenceState::Unknown)
    }

    /// Fold a transport presence; `None` for presences that are not tracked
    pub fn from_transport(kind: PresenceType) -> Option<Self> {
        match kind {
            PresenceType::Available => Some(PresenceState::Available),
            PresenceType::Offline | PresenceType::ExtendedAway => Some(PresenceState::Offline),
            PresenceType::Away => Some(PresenceState::Away),
            PresenceType::Busy => Some(PresenceState::Busy),
            PresenceType::Unset
            | PresenceType::Hidden
            | PresenceType::Unknown
            | PresenceType::Error => None,
        }
    }
}

/// Outcome of a presence change that must be shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceChange {
    /// New tracked state
    pub state: PresenceState,
    /// Meta line markup
    pub text: String,
    /// Raise attention (and put the line in the title)
    pub notify: bool,
}

/// Compute the visible effect of `presence` arriving while in `current`
///
/// Returns `None` for untracked presences and for no-op transitions.
/// Coming online is only notified after being offline; going offline is
/// notified from any other state.
pub fn transition(current: PresenceState, presence: &Presence, title: &str) -> Option<PresenceChange> {
    let state = PresenceState::from_transport(presence.kind)?;
    if state == current {
        return None;
    }

    let title = markup::escape(title);
    let (mut text, notify) = match state {
        PresenceState::Available => (
            format!("{} is online.", title),
            current == PresenceState::Offline,
        ),
        PresenceState::Offline => (format!("{} is offline.", title), true),
        PresenceState::Away => (format!("{} is away.", title), false),
        PresenceState::Busy => (format!("{} is busy.", title), false),
        PresenceState::Unknown => return None,
    };

    if !presence.message.is_empty() {
        text.push_str(&format!(
            " {}",
            markup::italic(&format!("({})", markup::escape(&presence.message)))
        ));
    }

    Some(PresenceChange {
        state,
        text,
        notify,
    })
}
