//! Voice transport via the chat gateway bridge
//!
//! The process holding the chat gateway connection exposes a small HTTP
//! surface; joining is `PUT /guilds/{guild}/voice`, leaving is `DELETE`.
//! Voice credentials come back asynchronously through
//! `POST /sessions/{guild}/voice`.

use super::VoiceTransport;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use roundtable_common::config::GatewayConfig;
use roundtable_common::{ChannelId, GuildId};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct JoinRequest {
    channel_id: ChannelId,
    self_mute: bool,
    self_deaf: bool,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn voice_url(&self, guild_id: GuildId) -> String {
        format!("{}/guilds/{}/voice", self.base_url, guild_id)
    }
}

#[async_trait]
impl VoiceTransport for GatewayClient {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
        debug!(%guild_id, %channel_id, "Requesting voice join");
        let response = self
            .http
            .put(self.voice_url(guild_id))
            .json(&JoinRequest {
                channel_id,
                self_mute: false,
                self_deaf: false,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Gateway(format!("{}: {}", status, body.trim())));
        }
        Ok(())
    }

    async fn leave(&self, guild_id: GuildId) -> Result<()> {
        debug!(%guild_id, "Requesting voice leave");
        let response = self.http.delete(self.voice_url(guild_id)).send().await?;

        let status = response.status();
        // Already gone is fine
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            return Err(Error::Gateway(format!("leave returned {}", status)));
        }
        Ok(())
    }
}
