//! Error types for roundtable-player
//!
//! Caller-facing failures (AlreadyActive, NoSuchSession, TransportJoinFailed)
//! are returned from SessionController operations. Failures that originate
//! in asynchronous backend callbacks are turned into notifications instead.

use roundtable_common::GuildId;
use thiserror::Error;

/// Main error type for roundtable-player
#[derive(Error, Debug)]
pub enum Error {
    /// A session already exists for this guild
    #[error("Session already active for guild {0}")]
    AlreadyActive(GuildId),

    /// Operation referenced a guild with no registered session
    #[error("No session for guild {0}")]
    NoSuchSession(GuildId),

    /// Voice transport refused the join; the session was not registered
    #[error("Voice join failed for guild {guild_id}: {reason}")]
    TransportJoinFailed { guild_id: GuildId, reason: String },

    /// Audio backend rejected an item
    #[error("Could not play '{title}': {reason}")]
    PlaybackStartFailed { title: String, reason: String },

    /// Track lookup returned nothing
    #[error("No matches for '{0}'")]
    NoMatches(String),

    /// Track lookup failed on the node side
    #[error("Track load failed: {0}")]
    LoadFailed(String),

    /// Audio node returned an error status or unusable body
    #[error("Audio backend error: {0}")]
    Backend(String),

    /// Gateway bridge returned an error status
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors from roundtable-common
    #[error(transparent)]
    Common(#[from] roundtable_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using roundtable-player Error
pub type Result<T> = std::result::Result<T, Error>;
