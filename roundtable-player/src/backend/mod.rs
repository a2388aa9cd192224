//! External collaborators
//!
//! The coordinator does not implement voice transport, audio rendering,
//! metadata lookup or message rendering. It talks to them through these
//! traits, which keeps the scheduling logic testable with in-memory fakes.

pub mod gateway;
pub mod node;
pub mod notify;
pub mod query;

pub use gateway::GatewayClient;
pub use node::NodeClient;
pub use notify::BroadcastNotifier;
pub use query::TrackQuery;

use crate::error::Result;
use async_trait::async_trait;
use roundtable_common::events::Notification;
use roundtable_common::{ChannelId, GuildId, Track, TrackInfo};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Voice credentials the chat gateway hands out after a join
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceServerState {
    pub session_id: String,
    pub token: String,
    pub endpoint: String,
}

/// Result of a track lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResult {
    /// Direct link to one track
    Track(Track),
    /// Playlist URL; tracks in playlist order
    Playlist { name: String, tracks: Vec<Track> },
    /// Search hits, best match first
    Search(Vec<Track>),
    Empty,
    /// Lookup failed on the node
    Error(String),
}

/// Joins and leaves voice channels
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()>;

    async fn leave(&self, guild_id: GuildId) -> Result<()>;
}

/// Renders audio for a guild
///
/// `start` only hands the track off. Whether rendering actually began comes
/// back later as a lifecycle event.
#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    async fn start(&self, guild_id: GuildId, track: &Track) -> Result<()>;

    async fn stop(&self, guild_id: GuildId) -> Result<()>;

    /// Forward fresh voice credentials for the guild's player
    async fn update_voice(&self, guild_id: GuildId, voice: &VoiceServerState) -> Result<()>;
}

/// Turns the backend's opaque track reference back into metadata
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    async fn resolve(&self, encoded: &str) -> Result<TrackInfo>;
}

/// Resolves free text or URLs into playable tracks
#[async_trait]
pub trait TrackLoader: Send + Sync {
    async fn load(&self, query: &TrackQuery) -> Result<LoadResult>;
}

/// Delivers user-facing messages; fire-and-forget
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        notification: Notification,
    ) -> Result<()>;
}

/// Handles to every collaborator a session controller needs
#[derive(Clone)]
pub struct Collaborators {
    pub voice: Arc<dyn VoiceTransport>,
    pub backend: Arc<dyn PlaybackBackend>,
    pub resolver: Arc<dyn MetadataResolver>,
    pub loader: Arc<dyn TrackLoader>,
    pub notifier: Arc<dyn NotificationSink>,
}
