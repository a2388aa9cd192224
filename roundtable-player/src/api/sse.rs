//! Server-Sent Events (SSE) broadcaster
//!
//! Streams every `RoundtableEvent` to connected clients. Notifications for
//! text channels travel this way too.

use crate::api::server::AppContext;
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use roundtable_common::GuildId;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

#[derive(Debug, Default, Deserialize)]
pub struct EventFilter {
    /// Only stream events for this guild
    #[serde(default)]
    pub guild_id: Option<GuildId>,
}

/// GET /events - SSE event stream
pub async fn event_stream(
    State(ctx): State<AppContext>,
    Query(filter): Query<EventFilter>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!(guild_id = ?filter.guild_id, "New SSE client connected");

    let rx = ctx.events.subscribe();
    let wanted = filter.guild_id;

    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) => {
                if wanted.is_some_and(|guild_id| guild_id != event.guild_id()) {
                    return None;
                }
                match serde_json::to_string(&event) {
                    Ok(json) => Some(Ok(Event::default().event(event.event_type()).data(json))),
                    Err(e) => {
                        warn!("Failed to serialize event: {}", e);
                        None
                    }
                }
            }
            Err(e) => {
                // Lagged receivers lose the oldest events and keep going
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
