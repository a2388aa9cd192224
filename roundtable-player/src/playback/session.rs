//! Session registry and lifecycle
//!
//! `SessionController` is the entry point for both kinds of callers:
//! submissions from users and lifecycle events from the audio node. Each
//! session's scheduler sits behind one lock; a transition is computed while
//! holding it and the resulting backend/voice/notification calls are made
//! after it is released.

use super::events::BackendEvent;
use super::scheduler::{PlaybackScheduler, QueueSnapshot, Transition};
use crate::backend::{Collaborators, LoadResult, TrackQuery, VoiceServerState};
use crate::error::{Error, Result};
use roundtable_common::events::{EndReason, EventBus, Notification, RoundtableEvent, SubmitMode};
use roundtable_common::{ChannelId, GuildId, Item, Participant, ParticipantId, Track};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Where an override submission lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideMode {
    /// After the current item finishes
    PlayNext,
    /// Immediately, abandoning the current item
    PlayNow,
}

/// One guild's playback context
#[derive(Debug)]
pub struct Session {
    guild_id: GuildId,
    voice_channel_id: ChannelId,
    /// Where user-facing notifications go
    text_channel_id: ChannelId,
    scheduler: Mutex<PlaybackScheduler>,
    start_gate: StartGate,
}

impl Session {
    fn new(guild_id: GuildId, voice_channel_id: ChannelId, text_channel_id: ChannelId) -> Self {
        Self {
            guild_id,
            voice_channel_id,
            text_channel_id,
            scheduler: Mutex::new(PlaybackScheduler::new()),
            start_gate: StartGate::default(),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn voice_channel_id(&self) -> ChannelId {
        self.voice_channel_id
    }

    pub fn text_channel_id(&self) -> ChannelId {
        self.text_channel_id
    }
}

/// Orders `start` requests issued outside the scheduler lock
///
/// Each `Play` transition carries the scheduler's play sequence number. A
/// start whose number is older than one already issued is dropped, so the
/// backend always ends up rendering the newest NowPlaying.
#[derive(Debug, Default)]
struct StartGate {
    last_issued: Mutex<u64>,
}

impl StartGate {
    /// Hold the returned guard until the start request has been sent
    async fn admit(&self, seq: u64) -> Option<MutexGuard<'_, u64>> {
        let mut last_issued = self.last_issued.lock().await;
        if seq < *last_issued {
            return None;
        }
        *last_issued = seq;
        Some(last_issued)
    }
}

#[derive(Debug, Default)]
struct Registry {
    active: HashMap<GuildId, Arc<Session>>,
    /// Guilds with a voice join in flight
    joining: HashSet<GuildId>,
}

/// Owns every live session and the handles to external collaborators
pub struct SessionController {
    sessions: RwLock<Registry>,
    /// Latest voice credentials per guild, kept across sessions
    voice_states: RwLock<HashMap<GuildId, VoiceServerState>>,
    collaborators: Collaborators,
    events: EventBus,
}

impl SessionController {
    pub fn new(collaborators: Collaborators, events: EventBus) -> Self {
        Self {
            sessions: RwLock::new(Registry::default()),
            voice_states: RwLock::new(HashMap::new()),
            collaborators,
            events,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Join voice and register an empty session
    ///
    /// Fails with `AlreadyActive` if the guild has a session (or a join in
    /// progress) and with `TransportJoinFailed` if the join is refused, in
    /// which case nothing is registered.
    pub async fn create_session(
        &self,
        guild_id: GuildId,
        voice_channel_id: ChannelId,
        text_channel_id: ChannelId,
    ) -> Result<()> {
        {
            let mut registry = self.sessions.write().await;
            if registry.active.contains_key(&guild_id) || registry.joining.contains(&guild_id) {
                return Err(Error::AlreadyActive(guild_id));
            }
            registry.joining.insert(guild_id);
        }

        if let Err(e) = self.collaborators.voice.join(guild_id, voice_channel_id).await {
            self.sessions.write().await.joining.remove(&guild_id);
            error!(%guild_id, %voice_channel_id, "Voice join failed: {}", e);
            return Err(Error::TransportJoinFailed {
                guild_id,
                reason: e.to_string(),
            });
        }

        let session = Arc::new(Session::new(guild_id, voice_channel_id, text_channel_id));
        {
            let mut registry = self.sessions.write().await;
            registry.joining.remove(&guild_id);
            registry.active.insert(guild_id, session);
        }

        let cached = self.voice_states.read().await.get(&guild_id).cloned();
        if let Some(voice) = cached {
            if let Err(e) = self.collaborators.backend.update_voice(guild_id, &voice).await {
                warn!(%guild_id, "Failed to forward cached voice state: {}", e);
            }
        }

        info!(%guild_id, %voice_channel_id, %text_channel_id, "Session created");
        self.events.emit_lossy(RoundtableEvent::SessionCreated {
            guild_id,
            voice_channel_id,
            text_channel_id,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    pub async fn get_session(&self, guild_id: GuildId) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .await
            .active
            .get(&guild_id)
            .cloned()
            .ok_or(Error::NoSuchSession(guild_id))
    }

    pub async fn active_sessions(&self) -> Vec<GuildId> {
        let mut guilds: Vec<_> = self.sessions.read().await.active.keys().copied().collect();
        guilds.sort();
        guilds
    }

    /// Add an item to its submitter's rotation queue
    ///
    /// Starts playback if the session is idle.
    pub async fn submit(&self, guild_id: GuildId, item: Item) -> Result<Uuid> {
        let ids = self.submit_batch(guild_id, vec![item], SubmitMode::Queue).await?;
        Ok(ids[0])
    }

    /// Add an item to the override lane
    pub async fn submit_override(
        &self,
        guild_id: GuildId,
        item: Item,
        mode: OverrideMode,
    ) -> Result<Uuid> {
        let mode = match mode {
            OverrideMode::PlayNext => SubmitMode::PlayNext,
            OverrideMode::PlayNow => SubmitMode::PlayNow,
        };
        let ids = self.submit_batch(guild_id, vec![item], mode).await?;
        Ok(ids[0])
    }

    /// Resolve a URL or search text and submit the result
    ///
    /// A single track or the first search hit is submitted alone; a playlist
    /// is submitted whole, in playlist order.
    pub async fn submit_query(
        &self,
        guild_id: GuildId,
        participant: Participant,
        query: &str,
        mode: SubmitMode,
    ) -> Result<Vec<Uuid>> {
        if query.trim().is_empty() {
            return Err(Error::BadRequest("query must not be empty".to_string()));
        }
        // Fail fast before hitting the node
        self.get_session(guild_id).await?;

        let query = TrackQuery::parse(query);
        let tracks = match self.collaborators.loader.load(&query).await? {
            LoadResult::Track(track) => vec![track],
            LoadResult::Playlist { name, tracks } => {
                info!(%guild_id, playlist = %name, count = tracks.len(), "Loaded playlist");
                tracks
            }
            LoadResult::Search(tracks) => tracks.into_iter().take(1).collect(),
            LoadResult::Empty => Vec::new(),
            LoadResult::Error(message) => return Err(Error::LoadFailed(message)),
        };
        if tracks.is_empty() {
            return Err(Error::NoMatches(query.to_string()));
        }

        let items = tracks
            .into_iter()
            .map(|track: Track| Item::new(track, participant.clone()))
            .collect();
        self.submit_batch(guild_id, items, mode).await
    }

    async fn submit_batch(
        &self,
        guild_id: GuildId,
        items: Vec<Item>,
        mode: SubmitMode,
    ) -> Result<Vec<Uuid>> {
        let session = self.get_session(guild_id).await?;
        let queued: Vec<(Uuid, ParticipantId, String)> = items
            .iter()
            .map(|i| (i.entry_id, i.submitter.id, i.title().to_string()))
            .collect();

        let transition = {
            let mut scheduler = session.scheduler.lock().await;
            // Teardown in progress; the session is about to leave the registry
            if scheduler.is_terminated() {
                return Err(Error::NoSuchSession(guild_id));
            }
            match mode {
                SubmitMode::Queue => items.into_iter().for_each(|i| scheduler.enqueue(i)),
                SubmitMode::PlayNext => items.into_iter().for_each(|i| scheduler.play_next(i)),
                // Reversed so a batch keeps its order at the front of the lane
                SubmitMode::PlayNow => items.into_iter().rev().for_each(|i| scheduler.play_now(i)),
            }

            if mode == SubmitMode::PlayNow || scheduler.is_idle() {
                let transition = scheduler.advance();
                Some((transition, scheduler.play_seq()))
            } else {
                None
            }
        };

        for (entry_id, participant_id, title) in &queued {
            debug!(%guild_id, %participant_id, %mode, title = %title, "Item queued");
            self.events.emit_lossy(RoundtableEvent::ItemQueued {
                guild_id,
                entry_id: *entry_id,
                participant_id: *participant_id,
                title: title.clone(),
                mode,
                timestamp: chrono::Utc::now(),
            });
        }

        if let Some((transition, seq)) = transition {
            self.apply(&session, transition, seq).await;
        }
        Ok(queued.into_iter().map(|(id, _, _)| id).collect())
    }

    /// Abandon the current item and move on
    pub async fn skip(&self, guild_id: GuildId) -> Result<()> {
        let session = self.get_session(guild_id).await?;
        info!(%guild_id, "Skip requested");
        let (transition, seq) = {
            let mut scheduler = session.scheduler.lock().await;
            if scheduler.is_terminated() {
                return Err(Error::NoSuchSession(guild_id));
            }
            let transition = scheduler.advance();
            (transition, scheduler.play_seq())
        };
        self.apply(&session, transition, seq).await;
        Ok(())
    }

    /// Remove a participant's pending items from the rotation
    pub async fn clear_participant(
        &self,
        guild_id: GuildId,
        participant_id: ParticipantId,
    ) -> Result<usize> {
        let session = self.get_session(guild_id).await?;
        let removed = {
            let mut scheduler = session.scheduler.lock().await;
            if scheduler.is_terminated() {
                return Err(Error::NoSuchSession(guild_id));
            }
            scheduler.clear_participant(participant_id)
        };
        info!(%guild_id, %participant_id, removed, "Cleared participant queue");
        Ok(removed)
    }

    pub async fn snapshot(&self, guild_id: GuildId) -> Result<QueueSnapshot> {
        let session = self.get_session(guild_id).await?;
        let snapshot = session.scheduler.lock().await.snapshot();
        Ok(snapshot)
    }

    /// Record fresh voice credentials and hand them to the backend
    pub async fn update_voice(&self, guild_id: GuildId, voice: VoiceServerState) -> Result<()> {
        self.voice_states
            .write()
            .await
            .insert(guild_id, voice.clone());

        let active = self.sessions.read().await.active.contains_key(&guild_id);
        if active {
            self.collaborators.backend.update_voice(guild_id, &voice).await?;
            debug!(%guild_id, "Voice state forwarded");
        } else {
            debug!(%guild_id, "Voice state cached for later");
        }
        Ok(())
    }

    /// Forced stop; idempotent
    pub async fn destroy(&self, guild_id: GuildId) -> Result<()> {
        let Ok(session) = self.get_session(guild_id).await else {
            debug!(%guild_id, "Destroy on inactive session ignored");
            return Ok(());
        };

        let first = session.scheduler.lock().await.terminate();
        if first {
            info!(%guild_id, "Session destroyed");
            self.teardown(&session).await;
        }
        Ok(())
    }

    /// The backend began rendering `encoded`
    ///
    /// Only refreshes metadata and announces; never changes scheduling state.
    pub async fn on_track_start(&self, guild_id: GuildId, encoded: &str) -> Result<()> {
        let Some(session) = self.lookup_for_event(guild_id).await else {
            return Ok(());
        };

        let resolved = match self.collaborators.resolver.resolve(encoded).await {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(%guild_id, "Metadata lookup failed, announcing with queued metadata: {}", e);
                None
            }
        };

        let now = {
            let mut scheduler = session.scheduler.lock().await;
            let is_current = scheduler
                .now_playing()
                .is_some_and(|now| now.item.track.encoded == encoded);
            if !is_current {
                None
            } else if let Some(info) = resolved {
                scheduler.refresh_now_playing(info)
            } else {
                scheduler.now_playing().cloned()
            }
        };

        match now {
            Some(now) => {
                self.notify(&session, Notification::now_playing(&now)).await;
                Ok(())
            }
            None => {
                debug!(%guild_id, "Start event for a track that is no longer current");
                Ok(())
            }
        }
    }

    /// The backend stopped rendering the current track
    pub async fn on_track_end(&self, guild_id: GuildId, reason: EndReason) -> Result<()> {
        let Some(session) = self.lookup_for_event(guild_id).await else {
            return Ok(());
        };

        if !reason.advances() {
            debug!(%guild_id, ?reason, "Track end does not advance");
            return Ok(());
        }
        self.advance(&session).await;
        Ok(())
    }

    /// The backend could not render `encoded`
    ///
    /// Notifies and stops; the remaining queue is left waiting.
    pub async fn on_track_exception(
        &self,
        guild_id: GuildId,
        encoded: &str,
        reason: &str,
    ) -> Result<()> {
        let Some(session) = self.lookup_for_event(guild_id).await else {
            return Ok(());
        };

        let entry_id = {
            let scheduler = session.scheduler.lock().await;
            scheduler
                .now_playing()
                .filter(|now| now.item.track.encoded == encoded)
                .map(|now| now.item.entry_id)
        };

        match entry_id {
            Some(entry_id) => self.start_failed(&session, entry_id, reason).await,
            None => debug!(%guild_id, "Exception for a track that is no longer current"),
        }
        Ok(())
    }

    /// Dispatch a lifecycle event posted by the audio node
    pub async fn handle_backend_event(&self, event: BackendEvent) -> Result<()> {
        match event {
            BackendEvent::TrackStart { guild_id, track } => {
                self.on_track_start(guild_id, &track.encoded).await
            }
            BackendEvent::TrackEnd {
                guild_id, reason, ..
            } => self.on_track_end(guild_id, reason).await,
            BackendEvent::TrackException {
                guild_id,
                track,
                exception,
            } => {
                self.on_track_exception(guild_id, &track.encoded, &exception.describe())
                    .await
            }
            BackendEvent::TrackStuck {
                guild_id,
                track,
                threshold_ms,
            } => {
                let reason = format!("no audio for {} ms", threshold_ms);
                self.on_track_exception(guild_id, &track.encoded, &reason).await
            }
            BackendEvent::VoiceClosed {
                guild_id,
                code,
                reason,
                by_remote,
            } => {
                warn!(%guild_id, code, %reason, by_remote, "Voice connection closed");
                self.destroy(guild_id).await
            }
        }
    }

    /// Lifecycle events may race with teardown; a missing session is not an error
    async fn lookup_for_event(&self, guild_id: GuildId) -> Option<Arc<Session>> {
        let session = self.sessions.read().await.active.get(&guild_id).cloned();
        if session.is_none() {
            debug!(%guild_id, "Ignoring backend event for inactive session");
        }
        session
    }

    async fn advance(&self, session: &Arc<Session>) {
        let (transition, seq) = {
            let mut scheduler = session.scheduler.lock().await;
            let transition = scheduler.advance();
            (transition, scheduler.play_seq())
        };
        self.apply(session, transition, seq).await;
    }

    /// Act on a transition; `seq` is the play sequence it was computed at
    async fn apply(&self, session: &Arc<Session>, transition: Transition, seq: u64) {
        let guild_id = session.guild_id;
        match transition {
            Transition::Play(now) => {
                let Some(issued) = session.start_gate.admit(seq).await else {
                    debug!(%guild_id, title = now.item.title(), "Start superseded by a newer one");
                    return;
                };

                info!(
                    %guild_id,
                    title = now.item.title(),
                    submitter = %now.submitter.display_name,
                    "Starting playback"
                );
                self.events.emit_lossy(RoundtableEvent::NowPlayingChanged {
                    guild_id,
                    now_playing: now.clone(),
                    timestamp: chrono::Utc::now(),
                });

                let started = self.collaborators.backend.start(guild_id, &now.item.track).await;
                drop(issued);
                if let Err(e) = started {
                    self.start_failed(session, now.item.entry_id, &e.to_string()).await;
                }
            }
            Transition::Terminate => {
                info!(%guild_id, "Queue exhausted");
                self.teardown(session).await;
            }
            Transition::Ignored => {
                debug!(%guild_id, "Advance on terminated session ignored");
            }
        }
    }

    async fn start_failed(&self, session: &Arc<Session>, entry_id: Uuid, reason: &str) {
        let guild_id = session.guild_id;
        let failed = session.scheduler.lock().await.fail_entry(entry_id);
        let Some(failed) = failed else {
            return;
        };

        let err = Error::PlaybackStartFailed {
            title: failed.item.title().to_string(),
            reason: reason.to_string(),
        };
        error!(%guild_id, "{}", err);

        self.notify(session, Notification::playback_error(failed.item.title()))
            .await;
        if let Err(e) = self.collaborators.backend.stop(guild_id).await {
            warn!(%guild_id, "Stop after failed start also failed: {}", e);
        }
    }

    /// Stop, announce, leave voice and unregister
    ///
    /// Callers guarantee this runs once per session (the scheduler's
    /// terminate transition is the gate).
    async fn teardown(&self, session: &Arc<Session>) {
        let guild_id = session.guild_id;

        if let Err(e) = self.collaborators.backend.stop(guild_id).await {
            warn!(%guild_id, "Failed to stop backend player: {}", e);
        }
        self.notify(session, Notification::PlaybackFinished).await;
        if let Err(e) = self.collaborators.voice.leave(guild_id).await {
            warn!(%guild_id, "Failed to leave voice: {}", e);
        }

        {
            let mut registry = self.sessions.write().await;
            if registry
                .active
                .get(&guild_id)
                .is_some_and(|current| Arc::ptr_eq(current, session))
            {
                registry.active.remove(&guild_id);
            }
        }

        info!(%guild_id, "Session ended");
        self.events.emit_lossy(RoundtableEvent::SessionEnded {
            guild_id,
            timestamp: chrono::Utc::now(),
        });
    }

    async fn notify(&self, session: &Session, notification: Notification) {
        if let Err(e) = self
            .collaborators
            .notifier
            .notify(session.guild_id, session.text_channel_id, notification)
            .await
        {
            warn!(guild_id = %session.guild_id, "Notification delivery failed: {}", e);
        }
    }
}
