//! Notification delivery over the event bus
//!
//! Chat frontends subscribe to the SSE stream and render
//! `RoundtableEvent::Notification` into channel messages.

use super::NotificationSink;
use crate::error::Result;
use async_trait::async_trait;
use roundtable_common::events::{EventBus, Notification, RoundtableEvent};
use roundtable_common::{ChannelId, GuildId};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    events: EventBus,
}

impl BroadcastNotifier {
    pub fn new(events: EventBus) -> Self {
        Self { events }
    }
}

#[async_trait]
impl NotificationSink for BroadcastNotifier {
    async fn notify(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        notification: Notification,
    ) -> Result<()> {
        info!(%guild_id, %channel_id, "{}", notification.summary());

        let event = RoundtableEvent::Notification {
            guild_id,
            channel_id,
            payload: notification,
            timestamp: chrono::Utc::now(),
        };
        if self.events.emit(event).is_err() {
            warn!(%guild_id, "Notification dropped: no subscribers");
        }
        Ok(())
    }
}
