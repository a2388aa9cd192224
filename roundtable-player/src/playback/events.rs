//! Lifecycle events reported by the audio node
//!
//! The node pushes these for every player it runs. They are the only way the
//! coordinator learns that a track actually started, ended or failed; `start`
//! requests never block on the outcome.

use roundtable_common::events::EndReason;
use roundtable_common::{GuildId, Track};
use serde::Deserialize;

/// Exception details attached to a failed track
#[derive(Debug, Clone, Deserialize)]
pub struct TrackException {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub cause: Option<String>,
}

impl TrackException {
    pub fn describe(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.cause.clone())
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

/// Player lifecycle event, as posted by the node
///
/// Wire format matches Lavalink v4 `op: "event"` payloads; the `op` field
/// itself is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum BackendEvent {
    /// Rendering of `track` began
    #[serde(rename = "TrackStartEvent", rename_all = "camelCase")]
    TrackStart { guild_id: GuildId, track: Track },

    /// Rendering of `track` stopped
    #[serde(rename = "TrackEndEvent", rename_all = "camelCase")]
    TrackEnd {
        guild_id: GuildId,
        track: Track,
        #[serde(default)]
        reason: EndReason,
    },

    /// `track` could not be rendered
    #[serde(rename = "TrackExceptionEvent", rename_all = "camelCase")]
    TrackException {
        guild_id: GuildId,
        track: Track,
        exception: TrackException,
    },

    /// `track` stopped producing audio
    #[serde(rename = "TrackStuckEvent", rename_all = "camelCase")]
    TrackStuck {
        guild_id: GuildId,
        track: Track,
        #[serde(default)]
        threshold_ms: u64,
    },

    /// The node lost its voice connection for the guild
    #[serde(rename = "WebSocketClosedEvent", rename_all = "camelCase")]
    VoiceClosed {
        guild_id: GuildId,
        code: u16,
        #[serde(default)]
        reason: String,
        #[serde(default)]
        by_remote: bool,
    },
}

impl BackendEvent {
    pub fn guild_id(&self) -> GuildId {
        match self {
            BackendEvent::TrackStart { guild_id, .. }
            | BackendEvent::TrackEnd { guild_id, .. }
            | BackendEvent::TrackException { guild_id, .. }
            | BackendEvent::TrackStuck { guild_id, .. }
            | BackendEvent::VoiceClosed { guild_id, .. } => *guild_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn track_json() -> serde_json::Value {
        json!({
            "encoded": "QAAAjQIAJVJpY2sg",
            "info": {
                "identifier": "dQw4w9WgXcQ",
                "isSeekable": true,
                "author": "RickAstleyVEVO",
                "length": 212000,
                "isStream": false,
                "position": 0,
                "title": "Never Gonna Give You Up",
                "uri": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
                "sourceName": "youtube"
            }
        })
    }

    #[test]
    fn test_track_start_event() {
        let event: BackendEvent = serde_json::from_value(json!({
            "op": "event",
            "type": "TrackStartEvent",
            "guildId": "817327181659111454",
            "track": track_json()
        }))
        .unwrap();

        match event {
            BackendEvent::TrackStart { guild_id, track } => {
                assert_eq!(guild_id, GuildId::new(817327181659111454));
                assert_eq!(track.encoded, "QAAAjQIAJVJpY2sg");
            }
            other => panic!("Expected TrackStart, got {:?}", other),
        }
    }

    #[test]
    fn test_track_end_event_reason() {
        let event: BackendEvent = serde_json::from_value(json!({
            "op": "event",
            "type": "TrackEndEvent",
            "guildId": "1",
            "track": track_json(),
            "reason": "replaced"
        }))
        .unwrap();

        match event {
            BackendEvent::TrackEnd { reason, .. } => assert_eq!(reason, EndReason::Replaced),
            other => panic!("Expected TrackEnd, got {:?}", other),
        }
    }

    #[test]
    fn test_track_exception_event() {
        let event: BackendEvent = serde_json::from_value(json!({
            "op": "event",
            "type": "TrackExceptionEvent",
            "guildId": "2",
            "track": track_json(),
            "exception": {"message": "This video is unavailable", "severity": "common", "cause": "x"}
        }))
        .unwrap();

        assert_eq!(event.guild_id(), GuildId::new(2));
        match event {
            BackendEvent::TrackException { exception, .. } => {
                assert_eq!(exception.describe(), "This video is unavailable");
            }
            other => panic!("Expected TrackException, got {:?}", other),
        }
    }

    #[test]
    fn test_voice_closed_event() {
        let event: BackendEvent = serde_json::from_value(json!({
            "op": "event",
            "type": "WebSocketClosedEvent",
            "guildId": "3",
            "code": 4014,
            "reason": "Disconnected",
            "byRemote": true
        }))
        .unwrap();

        match event {
            BackendEvent::VoiceClosed { code, by_remote, .. } => {
                assert_eq!(code, 4014);
                assert!(by_remote);
            }
            other => panic!("Expected VoiceClosed, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        let result: Result<BackendEvent, _> = serde_json::from_value(json!({
            "type": "PlayerUpdate",
            "guildId": "1"
        }));
        assert!(result.is_err());
    }
}
