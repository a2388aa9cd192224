//! # Roundtable Common Library
//!
//! Shared code for the roundtable playback coordinator including:
//! - Snowflake identifiers (guilds, channels, participants)
//! - Track and queued item types
//! - Event types (RoundtableEvent enum) and the EventBus
//! - Bootstrap configuration loading

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod track;

pub use error::{Error, Result};
pub use ids::{ChannelId, GuildId, ParticipantId};
pub use track::{Item, NowPlaying, Participant, Track, TrackInfo};
