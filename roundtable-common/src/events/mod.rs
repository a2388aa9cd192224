//! Event types for the roundtable event system
//!
//! Provides shared event definitions and the EventBus used to fan them out
//! (SSE stream, notification delivery, tests).

mod notification;
mod queue_types;

pub use notification::Notification;
pub use queue_types::{EndReason, SessionState, SubmitMode};

use crate::ids::{ChannelId, GuildId, ParticipantId};
use crate::track::NowPlaying;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Roundtable event types
///
/// Events are broadcast via EventBus and serialized as-is onto the SSE stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RoundtableEvent {
    /// A playback session was created for a guild
    SessionCreated {
        guild_id: GuildId,
        voice_channel_id: ChannelId,
        text_channel_id: ChannelId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An item landed in a queue
    ItemQueued {
        guild_id: GuildId,
        entry_id: Uuid,
        participant_id: ParticipantId,
        title: String,
        mode: SubmitMode,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The scheduler handed a new item to the backend
    NowPlayingChanged {
        guild_id: GuildId,
        now_playing: NowPlaying,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// User-facing message for a text channel
    Notification {
        guild_id: GuildId,
        channel_id: ChannelId,
        payload: Notification,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A session was torn down
    SessionEnded {
        guild_id: GuildId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl RoundtableEvent {
    /// Event name used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            RoundtableEvent::SessionCreated { .. } => "SessionCreated",
            RoundtableEvent::ItemQueued { .. } => "ItemQueued",
            RoundtableEvent::NowPlayingChanged { .. } => "NowPlayingChanged",
            RoundtableEvent::Notification { .. } => "Notification",
            RoundtableEvent::SessionEnded { .. } => "SessionEnded",
        }
    }

    pub fn guild_id(&self) -> GuildId {
        match self {
            RoundtableEvent::SessionCreated { guild_id, .. }
            | RoundtableEvent::ItemQueued { guild_id, .. }
            | RoundtableEvent::NowPlayingChanged { guild_id, .. }
            | RoundtableEvent::Notification { guild_id, .. }
            | RoundtableEvent::SessionEnded { guild_id, .. } => *guild_id,
        }
    }
}

/// Broadcast channel for RoundtableEvent
///
/// Receivers that fall behind by more than `capacity` events lose the oldest
/// ones (tokio broadcast semantics).
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RoundtableEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use roundtable_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<RoundtableEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: RoundtableEvent,
    ) -> Result<usize, broadcast::error::SendError<RoundtableEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: RoundtableEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_fails() {
        let bus = EventBus::new(8);
        let result = bus.emit(RoundtableEvent::SessionEnded {
            guild_id: GuildId::new(1),
            timestamp: chrono::Utc::now(),
        });
        assert!(result.is_err());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.emit_lossy(RoundtableEvent::SessionEnded {
            guild_id: GuildId::new(99),
            timestamp: chrono::Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "SessionEnded");
        assert_eq!(event.guild_id(), GuildId::new(99));
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = RoundtableEvent::Notification {
            guild_id: GuildId::new(5),
            channel_id: ChannelId::new(6),
            payload: Notification::PlaybackFinished,
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Notification");
        assert_eq!(json["guild_id"], "5");
        assert_eq!(json["payload"]["kind"], "playback_finished");
    }
}
