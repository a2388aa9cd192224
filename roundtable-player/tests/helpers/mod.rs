//! Test helpers for roundtable-player integration tests
//!
//! `FakeCollaborators` implements every collaborator trait in memory and
//! records each call so tests can assert on the exact sequence of effects.

#![allow(dead_code)]

use async_trait::async_trait;
use roundtable_common::events::{EventBus, Notification};
use roundtable_common::{ChannelId, GuildId, Item, Participant, ParticipantId, Track, TrackInfo};
use roundtable_player::backend::{
    Collaborators, LoadResult, MetadataResolver, NotificationSink, PlaybackBackend, TrackLoader,
    TrackQuery, VoiceServerState, VoiceTransport,
};
use roundtable_player::{Error, Result, SessionController};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const GUILD: GuildId = GuildId::new(1000);
pub const VOICE: ChannelId = ChannelId::new(2000);
pub const TEXT: ChannelId = ChannelId::new(3000);

/// One observed collaborator call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Join(GuildId, ChannelId),
    Leave(GuildId),
    Start(GuildId, String),
    Stop(GuildId),
    UpdateVoice(GuildId, String),
    Notify(GuildId, ChannelId, Notification),
}

#[derive(Default)]
pub struct FakeCollaborators {
    calls: Mutex<Vec<Call>>,
    pub fail_join: Mutex<bool>,
    /// Encoded refs whose start request is rejected
    pub fail_start: Mutex<HashSet<String>>,
    /// Metadata returned by the resolver; missing entries fail the lookup
    pub metadata: Mutex<HashMap<String, TrackInfo>>,
    /// Load results keyed by query identifier
    pub loads: Mutex<HashMap<String, LoadResult>>,
    /// When set, `leave` parks until this is notified
    leave_gate: Mutex<Option<Arc<Notify>>>,
    /// Signalled as soon as `leave` is entered
    pub leave_entered: Notify,
}

impl FakeCollaborators {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Make `leave` block; release it with `notify_one` on the returned handle
    pub fn hold_leave(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.leave_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Encoded refs handed to `start`, in order
    pub fn started(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Start(_, encoded) => Some(encoded),
                _ => None,
            })
            .collect()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Notify(_, _, notification) => Some(notification),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl VoiceTransport for FakeCollaborators {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<()> {
        self.record(Call::Join(guild_id, channel_id));
        if *self.fail_join.lock().unwrap() {
            return Err(Error::Gateway("missing permissions".to_string()));
        }
        Ok(())
    }

    async fn leave(&self, guild_id: GuildId) -> Result<()> {
        self.record(Call::Leave(guild_id));
        self.leave_entered.notify_one();
        let gate = self.leave_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(())
    }
}

#[async_trait]
impl PlaybackBackend for FakeCollaborators {
    async fn start(&self, guild_id: GuildId, track: &Track) -> Result<()> {
        self.record(Call::Start(guild_id, track.encoded.clone()));
        if self.fail_start.lock().unwrap().contains(&track.encoded) {
            return Err(Error::Backend("unplayable".to_string()));
        }
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) -> Result<()> {
        self.record(Call::Stop(guild_id));
        Ok(())
    }

    async fn update_voice(&self, guild_id: GuildId, voice: &VoiceServerState) -> Result<()> {
        self.record(Call::UpdateVoice(guild_id, voice.token.clone()));
        Ok(())
    }
}

#[async_trait]
impl MetadataResolver for FakeCollaborators {
    async fn resolve(&self, encoded: &str) -> Result<TrackInfo> {
        self.metadata
            .lock()
            .unwrap()
            .get(encoded)
            .cloned()
            .ok_or_else(|| Error::Backend(format!("cannot decode {}", encoded)))
    }
}

#[async_trait]
impl TrackLoader for FakeCollaborators {
    async fn load(&self, query: &TrackQuery) -> Result<LoadResult> {
        Ok(self
            .loads
            .lock()
            .unwrap()
            .get(&query.identifier())
            .cloned()
            .unwrap_or(LoadResult::Empty))
    }
}

#[async_trait]
impl NotificationSink for FakeCollaborators {
    async fn notify(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        notification: Notification,
    ) -> Result<()> {
        self.record(Call::Notify(guild_id, channel_id, notification));
        Ok(())
    }
}

/// Controller wired entirely to one fake
pub fn controller() -> (Arc<SessionController>, Arc<FakeCollaborators>) {
    let fake = Arc::new(FakeCollaborators::default());
    let collaborators = Collaborators {
        voice: fake.clone(),
        backend: fake.clone(),
        resolver: fake.clone(),
        loader: fake.clone(),
        notifier: fake.clone(),
    };
    let controller = Arc::new(SessionController::new(collaborators, EventBus::new(64)));
    (controller, fake)
}

pub fn track(name: &str) -> Track {
    Track {
        encoded: format!("enc:{}", name),
        info: TrackInfo {
            identifier: name.to_string(),
            title: name.to_string(),
            author: "artist".to_string(),
            uri: Some(format!("https://example.com/{}", name)),
            length_ms: 180_000,
            is_stream: false,
        },
    }
}

pub fn participant(id: u64, name: &str) -> Participant {
    Participant::new(ParticipantId::new(id), name)
}

pub fn item(name: &str, submitter: &Participant) -> Item {
    Item::new(track(name), submitter.clone())
}

pub fn enc(name: &str) -> String {
    format!("enc:{}", name)
}
