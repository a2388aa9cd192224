//! Track and queued item types

use crate::ParticipantId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resolved track metadata
///
/// Field names follow the audio node's JSON so the same type can be
/// deserialized straight from node responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    /// Source-specific identifier (video id, file name, ...)
    pub identifier: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub uri: Option<String>,
    /// Duration in milliseconds (meaningless for streams)
    #[serde(rename = "length", default)]
    pub length_ms: u64,
    #[serde(default)]
    pub is_stream: bool,
}

/// Playable track handle
///
/// `encoded` is the opaque reference the audio backend hands out and later
/// echoes back in its lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub encoded: String,
    pub info: TrackInfo,
}

/// Someone who can submit items to a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Participant {
    pub fn new(id: ParticipantId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            avatar_url: None,
        }
    }
}

/// One submitted track together with the participant who submitted it
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Generated on submission; lets callers refer to this exact entry
    pub entry_id: Uuid,
    pub track: Track,
    pub submitter: Participant,
}

impl Item {
    pub fn new(track: Track, submitter: Participant) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            track,
            submitter,
        }
    }

    pub fn title(&self) -> &str {
        &self.track.info.title
    }
}

/// The item currently handed to the audio backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
    /// Exactly as submitted
    pub item: Item,
    /// Participant credited in "now playing" announcements
    pub submitter: Participant,
    /// Metadata the backend reported once rendering began
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<TrackInfo>,
}

impl NowPlaying {
    pub fn new(item: Item) -> Self {
        Self {
            submitter: item.submitter.clone(),
            item,
            resolved: None,
        }
    }

    /// Metadata to display: resolved if known, else what was submitted
    pub fn info(&self) -> &TrackInfo {
        self.resolved.as_ref().unwrap_or(&self.item.track.info)
    }
}
