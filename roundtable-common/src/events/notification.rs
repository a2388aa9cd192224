//! User-facing notification payloads
//!
//! The coordinator only decides *what* to announce. Rendering (embeds,
//! colours, avatars) belongs to whoever consumes the notification.

use crate::track::{NowPlaying, Participant};
use serde::{Deserialize, Serialize};

/// Payload handed to a notification sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// A track started rendering
    NowPlaying {
        title: String,
        author: String,
        uri: Option<String>,
        submitter: Participant,
    },

    /// Nothing left to play; the session is going away
    PlaybackFinished,

    /// The backend could not render an item
    PlaybackError { title: String },
}

impl Notification {
    pub fn now_playing(now: &NowPlaying) -> Self {
        let info = now.info();
        Notification::NowPlaying {
            title: info.title.clone(),
            author: info.author.clone(),
            uri: info.uri.clone(),
            submitter: now.submitter.clone(),
        }
    }

    pub fn playback_error(title: impl Into<String>) -> Self {
        Notification::PlaybackError {
            title: title.into(),
        }
    }

    /// Short human-readable line, used for logging
    pub fn summary(&self) -> String {
        match self {
            Notification::NowPlaying { title, submitter, .. } => {
                format!("Now Playing: {} (queued by {})", title, submitter.display_name)
            }
            Notification::PlaybackFinished => "Playback Finished".to_string(),
            Notification::PlaybackError { title } => format!("Could not play song {}", title),
        }
    }
}
