//! Playback scheduler
//!
//! Decides what plays next for one session. Pure state: it never talks to the
//! audio backend itself, it returns a [`Transition`] and the session
//! controller acts on it after releasing the session lock.
//!
//! Ordering rules:
//! - The override lane always wins.
//! - Otherwise participants take turns in the order they first submitted.
//!   A participant who submits again joins their existing queue, never a
//!   second rotation slot.
//! - A queue leaves the rotation the moment its last item is popped.

use super::queue::{EmptyQueue, OverrideChannel, UserQueue};
use roundtable_common::events::SessionState;
use roundtable_common::{Item, NowPlaying, Participant, ParticipantId, TrackInfo};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

/// Outcome of an advance request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Hand this item to the audio backend
    Play(NowPlaying),
    /// Nothing left anywhere; the session must be torn down
    Terminate,
    /// Scheduler already terminated, nothing to do
    Ignored,
}

/// One participant's slot in the rotation, for display
#[derive(Debug, Clone, Serialize)]
pub struct RotationEntry {
    pub participant: Participant,
    pub items: Vec<Item>,
}

/// Read-only view of the scheduler
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub state: SessionState,
    pub now_playing: Option<NowPlaying>,
    pub override_items: Vec<Item>,
    pub rotation: Vec<RotationEntry>,
    /// Index into `rotation` of whose turn is next
    pub next_turn: Option<usize>,
}

/// Round-robin scheduler for one session
#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    /// Participant queues in first-submission order
    rotation: Vec<UserQueue>,

    /// Priority lane
    override_lane: OverrideChannel,

    /// Index of the queue whose turn is next
    ///
    /// Kept in `0..rotation.len()` whenever the rotation is non-empty.
    next_turn: usize,

    now_playing: Option<NowPlaying>,

    /// Bumped on every `Play` transition
    play_seq: u64,

    terminated: bool,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        if self.terminated {
            SessionState::Terminated
        } else if self.now_playing.is_some() {
            SessionState::Playing
        } else {
            SessionState::Idle
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state() == SessionState::Idle
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Sequence number of the most recent `Play` transition
    pub fn play_seq(&self) -> u64 {
        self.play_seq
    }

    pub fn now_playing(&self) -> Option<&NowPlaying> {
        self.now_playing.as_ref()
    }

    /// Number of participants currently in the rotation
    pub fn rotation_len(&self) -> usize {
        self.rotation.len()
    }

    pub fn override_len(&self) -> usize {
        self.override_lane.len()
    }

    /// Items waiting anywhere (override lane plus every participant queue)
    pub fn pending_len(&self) -> usize {
        self.override_lane.len() + self.rotation.iter().map(UserQueue::len).sum::<usize>()
    }

    /// Route a submission to its participant's queue
    ///
    /// Creates the queue (at the end of the rotation) if this participant has
    /// nothing pending. Never starts playback.
    pub fn enqueue(&mut self, item: Item) {
        let participant = item.submitter.id;
        match self.rotation.iter().position(|q| q.owner_id() == participant) {
            Some(slot) => {
                let queue = &mut self.rotation[slot];
                queue.enqueue(item);
                debug!(%participant, depth = queue.len(), "Appended to existing queue");
            }
            None => {
                let mut queue = UserQueue::new(item.submitter.clone());
                queue.enqueue(item);
                self.rotation.push(queue);
                debug!(
                    %participant,
                    slot = self.rotation.len() - 1,
                    "New participant joined rotation"
                );
            }
        }
    }

    /// Override lane, behind other priority items
    pub fn play_next(&mut self, item: Item) {
        self.override_lane.push_back(item);
    }

    /// Override lane, ahead of everything
    ///
    /// The caller is expected to advance right away.
    pub fn play_now(&mut self, item: Item) {
        self.override_lane.push_front(item);
    }

    /// Pick the next item
    ///
    /// Whatever is currently playing is dropped, never requeued.
    pub fn advance(&mut self) -> Transition {
        if self.terminated {
            return Transition::Ignored;
        }

        if let Ok(item) = self.override_lane.pop_front() {
            debug!(title = item.title(), "Advancing from override lane");
            return self.start(item);
        }

        while !self.rotation.is_empty() {
            self.clamp_cursor();
            let slot = self.next_turn;

            match self.rotation[slot].pop_front() {
                Ok(item) => {
                    if self.rotation[slot].is_empty() {
                        // The following queue slides into `slot` and is next.
                        self.rotation.remove(slot);
                    } else {
                        self.next_turn = slot + 1;
                    }
                    self.clamp_cursor();
                    debug!(
                        slot,
                        title = item.title(),
                        participant = %item.submitter.id,
                        "Advancing rotation"
                    );
                    return self.start(item);
                }
                Err(EmptyQueue) => {
                    self.rotation.remove(slot);
                }
            }
        }

        debug!("Nothing left to play");
        self.terminated = true;
        self.now_playing = None;
        Transition::Terminate
    }

    /// Clear NowPlaying after the backend rejected `entry_id`
    ///
    /// Returns the failed item, or None if something else is current by now.
    /// The session stays Idle; queued items are not advanced to.
    pub fn fail_entry(&mut self, entry_id: Uuid) -> Option<NowPlaying> {
        match &self.now_playing {
            Some(current) if current.item.entry_id == entry_id => self.now_playing.take(),
            _ => None,
        }
    }

    /// Record the metadata the backend resolved for the current item
    ///
    /// The item itself is left as submitted.
    pub fn refresh_now_playing(&mut self, info: TrackInfo) -> Option<NowPlaying> {
        let current = self.now_playing.as_mut()?;
        current.resolved = Some(info);
        Some(current.clone())
    }

    /// Drop a participant's whole queue
    ///
    /// The turn order of the remaining participants is unchanged. Returns the
    /// number of items removed.
    pub fn clear_participant(&mut self, participant: ParticipantId) -> usize {
        let Some(slot) = self.rotation.iter().position(|q| q.owner_id() == participant) else {
            return 0;
        };

        let removed = self.rotation.remove(slot);
        if slot < self.next_turn {
            self.next_turn -= 1;
        }
        self.clamp_cursor();
        removed.len()
    }

    /// Move to Terminated, dropping all queued state
    ///
    /// Returns true only for the call that actually made the transition.
    pub fn terminate(&mut self) -> bool {
        if self.terminated {
            return false;
        }
        self.terminated = true;
        self.now_playing = None;
        self.rotation.clear();
        self.override_lane = OverrideChannel::new();
        self.next_turn = 0;
        true
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            state: self.state(),
            now_playing: self.now_playing.clone(),
            override_items: self.override_lane.items().cloned().collect(),
            rotation: self
                .rotation
                .iter()
                .map(|q| RotationEntry {
                    participant: q.owner().clone(),
                    items: q.items().cloned().collect(),
                })
                .collect(),
            next_turn: (!self.rotation.is_empty()).then_some(self.next_turn),
        }
    }

    fn start(&mut self, item: Item) -> Transition {
        let now = NowPlaying::new(item);
        self.play_seq += 1;
        self.now_playing = Some(now.clone());
        Transition::Play(now)
    }

    fn clamp_cursor(&mut self) {
        if self.next_turn >= self.rotation.len() {
            self.next_turn = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundtable_common::Track;

    fn create_test_item(title: &str, who: u64) -> Item {
        Item::new(
            Track {
                encoded: format!("enc-{}", title),
                info: TrackInfo {
                    identifier: title.to_string(),
                    title: title.to_string(),
                    author: "artist".to_string(),
                    uri: None,
                    length_ms: 180_000,
                    is_stream: false,
                },
            },
            Participant::new(ParticipantId::new(who), format!("user{}", who)),
        )
    }

    fn played_title(transition: Transition) -> String {
        match transition {
            Transition::Play(now) => now.item.title().to_string(),
            other => panic!("Expected Play, got {:?}", other),
        }
    }

    #[test]
    fn test_new_scheduler_is_idle() {
        let scheduler = PlaybackScheduler::new();
        assert_eq!(scheduler.state(), SessionState::Idle);
        assert!(scheduler.now_playing().is_none());
        assert_eq!(scheduler.snapshot().next_turn, None);
    }

    #[test]
    fn test_two_submissions_share_one_queue() {
        let mut scheduler = PlaybackScheduler::new();
        scheduler.enqueue(create_test_item("a1", 1));
        scheduler.enqueue(create_test_item("a2", 1));

        assert_eq!(scheduler.rotation_len(), 1);
        let snapshot = scheduler.snapshot();
        let titles: Vec<_> = snapshot.rotation[0].items.iter().map(|i| i.title()).collect();
        assert_eq!(titles, vec!["a1", "a2"]);
    }

    #[test]
    fn test_enqueue_does_not_start_playback() {
        let mut scheduler = PlaybackScheduler::new();
        scheduler.enqueue(create_test_item("a1", 1));
        assert_eq!(scheduler.state(), SessionState::Idle);
    }

    #[test]
    fn test_round_robin_scenario() {
        // A: a1, a2 then B: b1 -> a1, b1, a2, terminate
        let mut scheduler = PlaybackScheduler::new();
        scheduler.enqueue(create_test_item("a1", 1));
        scheduler.enqueue(create_test_item("a2", 1));
        scheduler.enqueue(create_test_item("b1", 2));

        assert_eq!(played_title(scheduler.advance()), "a1");
        assert_eq!(scheduler.snapshot().next_turn, Some(1));

        assert_eq!(played_title(scheduler.advance()), "b1");
        // B drained and removed, cursor wraps back to A
        assert_eq!(scheduler.rotation_len(), 1);
        assert_eq!(scheduler.snapshot().next_turn, Some(0));

        assert_eq!(played_title(scheduler.advance()), "a2");
        assert_eq!(scheduler.rotation_len(), 0);

        assert_eq!(scheduler.advance(), Transition::Terminate);
        assert_eq!(scheduler.state(), SessionState::Terminated);
    }

    #[test]
    fn test_fairness_across_three_participants() {
        let mut scheduler = PlaybackScheduler::new();
        // Participant 1 floods the queue before anyone else shows up
        for n in 0..4 {
            scheduler.enqueue(create_test_item(&format!("p1-{}", n), 1));
        }
        scheduler.enqueue(create_test_item("p2-0", 2));
        scheduler.enqueue(create_test_item("p2-1", 2));
        scheduler.enqueue(create_test_item("p3-0", 3));

        let mut order = Vec::new();
        while let Transition::Play(now) = scheduler.advance() {
            order.push(now.item.title().to_string());
        }

        assert_eq!(
            order,
            vec!["p1-0", "p2-0", "p3-0", "p1-1", "p2-1", "p1-2", "p1-3"]
        );
    }

    #[test]
    fn test_drained_participant_rejoins_at_the_end() {
        let mut scheduler = PlaybackScheduler::new();
        scheduler.enqueue(create_test_item("a1", 1));
        scheduler.enqueue(create_test_item("b1", 2));
        scheduler.enqueue(create_test_item("b2", 2));

        assert_eq!(played_title(scheduler.advance()), "a1");
        assert_eq!(scheduler.rotation_len(), 1);

        // A comes back after draining: new slot behind B
        scheduler.enqueue(create_test_item("a2", 1));
        let snapshot = scheduler.snapshot();
        assert_eq!(snapshot.rotation[0].participant.id, ParticipantId::new(2));
        assert_eq!(snapshot.rotation[1].participant.id, ParticipantId::new(1));

        assert_eq!(played_title(scheduler.advance()), "b1");
        assert_eq!(played_title(scheduler.advance()), "a2");
        assert_eq!(played_title(scheduler.advance()), "b2");
    }

    #[test]
    fn test_override_lane_takes_precedence() {
        let mut scheduler = PlaybackScheduler::new();
        scheduler.enqueue(create_test_item("a1", 1));
        scheduler.enqueue(create_test_item("a2", 1));
        scheduler.enqueue(create_test_item("b1", 2));

        assert_eq!(played_title(scheduler.advance()), "a1");
        let cursor_before = scheduler.snapshot().next_turn;

        scheduler.play_next(create_test_item("o1", 3));
        scheduler.play_next(create_test_item("o2", 4));

        assert_eq!(played_title(scheduler.advance()), "o1");
        assert_eq!(played_title(scheduler.advance()), "o2");
        assert_eq!(scheduler.snapshot().next_turn, cursor_before);

        assert_eq!(played_title(scheduler.advance()), "b1");
    }

    #[test]
    fn test_play_now_jumps_the_override_lane() {
        let mut scheduler = PlaybackScheduler::new();
        scheduler.play_next(create_test_item("next", 1));
        scheduler.play_now(create_test_item("now", 2));

        assert_eq!(played_title(scheduler.advance()), "now");
        assert_eq!(played_title(scheduler.advance()), "next");
    }

    #[test]
    fn test_play_now_abandons_current_without_requeue() {
        let mut scheduler = PlaybackScheduler::new();
        scheduler.enqueue(create_test_item("a1", 1));
        assert_eq!(played_title(scheduler.advance()), "a1");

        scheduler.play_now(create_test_item("b1", 2));
        let now = match scheduler.advance() {
            Transition::Play(now) => now,
            other => panic!("Expected Play, got {:?}", other),
        };

        assert_eq!(now.item.title(), "b1");
        assert_eq!(now.submitter.id, ParticipantId::new(2));
        assert_eq!(scheduler.pending_len(), 0);
        assert_eq!(scheduler.snapshot().next_turn, None);
    }

    #[test]
    fn test_override_item_credits_its_own_submitter() {
        let mut scheduler = PlaybackScheduler::new();
        scheduler.enqueue(create_test_item("a1", 1));
        scheduler.advance();

        scheduler.play_next(create_test_item("o1", 9));
        match scheduler.advance() {
            Transition::Play(now) => assert_eq!(now.submitter.id, ParticipantId::new(9)),
            other => panic!("Expected Play, got {:?}", other),
        }
    }

    #[test]
    fn test_terminate_is_reported_once() {
        let mut scheduler = PlaybackScheduler::new();
        assert_eq!(scheduler.advance(), Transition::Terminate);
        assert_eq!(scheduler.advance(), Transition::Ignored);
        assert!(!scheduler.terminate());
    }

    #[test]
    fn test_explicit_terminate_drops_queues() {
        let mut scheduler = PlaybackScheduler::new();
        scheduler.enqueue(create_test_item("a1", 1));
        scheduler.play_next(create_test_item("o1", 2));
        scheduler.advance();

        assert!(scheduler.terminate());
        assert_eq!(scheduler.state(), SessionState::Terminated);
        assert_eq!(scheduler.pending_len(), 0);
        assert!(scheduler.now_playing().is_none());
        assert_eq!(scheduler.advance(), Transition::Ignored);
    }

    #[test]
    fn test_fail_entry_leaves_session_idle() {
        let mut scheduler = PlaybackScheduler::new();
        scheduler.enqueue(create_test_item("a1", 1));
        scheduler.enqueue(create_test_item("a2", 1));

        let now = match scheduler.advance() {
            Transition::Play(now) => now,
            other => panic!("Expected Play, got {:?}", other),
        };

        // Unknown entry is ignored
        assert!(scheduler.fail_entry(Uuid::new_v4()).is_none());
        assert_eq!(scheduler.state(), SessionState::Playing);

        let failed = scheduler.fail_entry(now.item.entry_id).unwrap();
        assert_eq!(failed.item.title(), "a1");
        assert_eq!(scheduler.state(), SessionState::Idle);
        // a2 is still waiting
        assert_eq!(scheduler.pending_len(), 1);
    }

    #[test]
    fn test_refresh_now_playing_updates_metadata() {
        let mut scheduler = PlaybackScheduler::new();
        assert!(scheduler
            .refresh_now_playing(create_test_item("x", 1).track.info)
            .is_none());

        scheduler.enqueue(create_test_item("a1", 1));
        scheduler.advance();

        let mut info = create_test_item("resolved", 1).track.info;
        info.uri = Some("https://example.com/resolved".to_string());
        let now = scheduler.refresh_now_playing(info).unwrap();
        assert_eq!(now.info().title, "resolved");
        assert_eq!(now.item.title(), "a1");
        assert_eq!(
            scheduler.now_playing().unwrap().info().uri.as_deref(),
            Some("https://example.com/resolved")
        );
    }

    #[test]
    fn test_play_seq_increases_per_play() {
        let mut scheduler = PlaybackScheduler::new();
        assert_eq!(scheduler.play_seq(), 0);

        scheduler.enqueue(create_test_item("a1", 1));
        scheduler.enqueue(create_test_item("a2", 1));
        scheduler.advance();
        scheduler.advance();
        assert_eq!(scheduler.play_seq(), 2);

        // Terminate is not a play
        scheduler.advance();
        assert_eq!(scheduler.play_seq(), 2);
        assert!(scheduler.is_terminated());
    }

    #[test]
    fn test_clear_participant_keeps_turn_order() {
        let mut scheduler = PlaybackScheduler::new();
        scheduler.enqueue(create_test_item("a1", 1));
        scheduler.enqueue(create_test_item("a2", 1));
        scheduler.enqueue(create_test_item("b1", 2));
        scheduler.enqueue(create_test_item("b2", 2));
        scheduler.enqueue(create_test_item("c1", 3));

        assert_eq!(played_title(scheduler.advance()), "a1");
        assert_eq!(played_title(scheduler.advance()), "b1");
        // C is next; removing A (before the cursor) must not skip C
        assert_eq!(scheduler.clear_participant(ParticipantId::new(1)), 1);
        assert_eq!(played_title(scheduler.advance()), "c1");
        assert_eq!(played_title(scheduler.advance()), "b2");

        assert_eq!(scheduler.clear_participant(ParticipantId::new(42)), 0);
    }

    #[test]
    fn test_clear_last_slot_wraps_cursor() {
        let mut scheduler = PlaybackScheduler::new();
        scheduler.enqueue(create_test_item("a1", 1));
        scheduler.enqueue(create_test_item("a2", 1));
        scheduler.enqueue(create_test_item("b1", 2));

        assert_eq!(played_title(scheduler.advance()), "a1");
        assert_eq!(scheduler.snapshot().next_turn, Some(1));

        scheduler.clear_participant(ParticipantId::new(2));
        assert_eq!(scheduler.snapshot().next_turn, Some(0));
        assert_eq!(played_title(scheduler.advance()), "a2");
    }
}
