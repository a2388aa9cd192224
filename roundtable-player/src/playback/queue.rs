//! Per-participant queues and the override lane
//!
//! Both are plain FIFOs. They carry no lock of their own: the owning
//! scheduler sits behind the session lock, so every mutation of a queue is
//! already serialized with every other change to the session.

use roundtable_common::{Item, Participant, ParticipantId};
use std::collections::VecDeque;
use thiserror::Error;

/// Pop on a queue with nothing in it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("queue is empty")]
pub struct EmptyQueue;

/// Items submitted by one participant, first-submitted first-played
#[derive(Debug, Clone)]
pub struct UserQueue {
    owner: Participant,
    items: VecDeque<Item>,
}

impl UserQueue {
    pub fn new(owner: Participant) -> Self {
        Self {
            owner,
            items: VecDeque::new(),
        }
    }

    pub fn owner(&self) -> &Participant {
        &self.owner
    }

    pub fn owner_id(&self) -> ParticipantId {
        self.owner.id
    }

    /// Append to the end of this participant's queue
    pub fn enqueue(&mut self, item: Item) {
        self.items.push_back(item);
    }

    /// Remove and return the head item
    pub fn pop_front(&mut self) -> Result<Item, EmptyQueue> {
        self.items.pop_front().ok_or(EmptyQueue)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }
}

/// Priority lane checked before the round-robin rotation
///
/// `push_back` is "play next" (queue up behind other priority items),
/// `push_front` is "play now" (jump ahead of everything).
#[derive(Debug, Clone, Default)]
pub struct OverrideChannel {
    items: VecDeque<Item>,
}

impl OverrideChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, item: Item) {
        self.items.push_back(item);
    }

    pub fn push_front(&mut self, item: Item) {
        self.items.push_front(item);
    }

    pub fn pop_front(&mut self) -> Result<Item, EmptyQueue> {
        self.items.pop_front().ok_or(EmptyQueue)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }
}
