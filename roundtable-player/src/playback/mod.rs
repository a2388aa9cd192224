//! Queues, scheduling and session lifecycle

pub mod events;
pub mod queue;
pub mod scheduler;
pub mod session;

pub use events::BackendEvent;
pub use queue::{OverrideChannel, UserQueue};
pub use scheduler::{PlaybackScheduler, QueueSnapshot, Transition};
pub use session::{OverrideMode, SessionController};
