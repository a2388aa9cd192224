//! Audio node REST client
//!
//! Speaks the Lavalink v4 REST dialect:
//! - `PATCH /v4/sessions/{session}/players/{guild}` to start/stop tracks and
//!   forward voice credentials
//! - `GET /v4/decodetrack` to turn an encoded track back into metadata
//! - `GET /v4/loadtracks` to resolve URLs and searches
//!
//! Lifecycle events arrive separately (see `api::handlers::backend_event`).

use super::{LoadResult, MetadataResolver, PlaybackBackend, TrackLoader, TrackQuery, VoiceServerState};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use roundtable_common::config::NodeConfig;
use roundtable_common::{GuildId, Track, TrackInfo};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// REST client for one audio node session
#[derive(Debug, Clone)]
pub struct NodeClient {
    http: Client,
    base_url: String,
    password: String,
    session_id: String,
}

/// Body of a player update; absent fields are left untouched by the node
#[derive(Debug, Default, Serialize)]
struct PlayerUpdate<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    track: Option<TrackUpdate<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<VoiceUpdate<'a>>,
}

/// `encoded: null` stops the current track
#[derive(Debug, Serialize)]
struct TrackUpdate<'a> {
    encoded: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceUpdate<'a> {
    token: &'a str,
    endpoint: &'a str,
    session_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "loadType", content = "data", rename_all = "lowercase")]
enum NodeLoadResult {
    Track(Track),
    Playlist(NodePlaylist),
    Search(Vec<Track>),
    Empty(IgnoredAny),
    Error(NodeException),
}

#[derive(Debug, Deserialize)]
struct NodePlaylist {
    info: NodePlaylistInfo,
    tracks: Vec<Track>,
}

#[derive(Debug, Deserialize)]
struct NodePlaylistInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct NodeException {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    cause: Option<String>,
}

impl From<NodeLoadResult> for LoadResult {
    fn from(result: NodeLoadResult) -> Self {
        match result {
            NodeLoadResult::Track(track) => LoadResult::Track(track),
            NodeLoadResult::Playlist(playlist) => LoadResult::Playlist {
                name: playlist.info.name,
                tracks: playlist.tracks,
            },
            NodeLoadResult::Search(tracks) => LoadResult::Search(tracks),
            NodeLoadResult::Empty(_) => LoadResult::Empty,
            NodeLoadResult::Error(e) => LoadResult::Error(
                e.message
                    .or(e.cause)
                    .unwrap_or_else(|| "unknown load error".to_string()),
            ),
        }
    }
}

impl NodeClient {
    pub fn new(config: &NodeConfig) -> Result<Self> {
        if config.session_id.trim().is_empty() {
            return Err(Error::Config("node.session_id must be set".to_string()));
        }

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        info!("Audio node client targeting {}", config.base_url);
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            password: config.password.clone(),
            session_id: config.session_id.clone(),
        })
    }

    fn player_url(&self, guild_id: GuildId) -> String {
        format!(
            "{}/v4/sessions/{}/players/{}",
            self.base_url, self.session_id, guild_id
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(reqwest::header::AUTHORIZATION, &self.password)
    }

    async fn update_player(&self, guild_id: GuildId, update: &PlayerUpdate<'_>) -> Result<()> {
        let response = self
            .authorized(self.http.patch(self.player_url(guild_id)))
            .json(update)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Backend(format!("{}: {}", status, body.trim())))
}

#[async_trait]
impl PlaybackBackend for NodeClient {
    async fn start(&self, guild_id: GuildId, track: &Track) -> Result<()> {
        debug!(%guild_id, title = %track.info.title, "Starting track on node");
        self.update_player(
            guild_id,
            &PlayerUpdate {
                track: Some(TrackUpdate {
                    encoded: Some(&track.encoded),
                }),
                voice: None,
            },
        )
        .await
    }

    async fn stop(&self, guild_id: GuildId) -> Result<()> {
        debug!(%guild_id, "Stopping node player");
        self.update_player(
            guild_id,
            &PlayerUpdate {
                track: Some(TrackUpdate { encoded: None }),
                voice: None,
            },
        )
        .await
    }

    async fn update_voice(&self, guild_id: GuildId, voice: &VoiceServerState) -> Result<()> {
        debug!(%guild_id, endpoint = %voice.endpoint, "Forwarding voice state to node");
        self.update_player(
            guild_id,
            &PlayerUpdate {
                track: None,
                voice: Some(VoiceUpdate {
                    token: &voice.token,
                    endpoint: &voice.endpoint,
                    session_id: &voice.session_id,
                }),
            },
        )
        .await
    }
}

#[async_trait]
impl MetadataResolver for NodeClient {
    async fn resolve(&self, encoded: &str) -> Result<TrackInfo> {
        let response = self
            .authorized(self.http.get(format!("{}/v4/decodetrack", self.base_url)))
            .query(&[("encodedTrack", encoded)])
            .send()
            .await?;
        let track: Track = check_status(response).await?.json().await?;
        Ok(track.info)
    }
}

#[async_trait]
impl TrackLoader for NodeClient {
    async fn load(&self, query: &TrackQuery) -> Result<LoadResult> {
        let identifier = query.identifier();
        debug!(%identifier, "Loading tracks");
        let response = self
            .authorized(self.http.get(format!("{}/v4/loadtracks", self.base_url)))
            .query(&[("identifier", identifier.as_str())])
            .send()
            .await?;
        let result: NodeLoadResult = check_status(response).await?.json().await?;
        Ok(result.into())
    }
}
