//! Queue and submission type definitions

use serde::{Deserialize, Serialize};

/// How a submission is routed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMode {
    /// Appended to the submitter's own queue, played in rotation
    #[default]
    Queue,
    /// Override lane, back of the line; plays after the current item
    PlayNext,
    /// Override lane, front of the line; replaces the current item at once
    PlayNow,
}

impl std::fmt::Display for SubmitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitMode::Queue => write!(f, "queue"),
            SubmitMode::PlayNext => write!(f, "play_next"),
            SubmitMode::PlayNow => write!(f, "play_now"),
        }
    }
}

/// Scheduler state as seen from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Nothing handed to the backend; queues may still hold items
    Idle,
    /// An item is playing
    Playing,
    /// Torn down; no further transitions
    Terminated,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Playing => write!(f, "playing"),
            SessionState::Terminated => write!(f, "terminated"),
        }
    }
}

/// Why the backend stopped rendering a track
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    /// Played to the end
    #[default]
    Finished,
    /// Could not be loaded or decoded
    LoadFailed,
    /// Stopped on request
    Stopped,
    /// Another track was started over it
    Replaced,
    /// Backend cleaned up an abandoned player
    Cleanup,
}

impl EndReason {
    /// Only a natural end moves the rotation forward
    ///
    /// Replaced/Stopped ends are echoes of a transition we already made, and a
    /// failed load leaves the session idle.
    pub fn advances(self) -> bool {
        matches!(self, EndReason::Finished)
    }
}
