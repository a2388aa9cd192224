//! # Roundtable Player Library (roundtable-player)
//!
//! Per-guild playback coordinator for a shared voice channel.
//!
//! **Purpose:** Keep one queue per participant, play them round-robin with a
//! priority override lane, drive an external audio node through start/stop
//! requests and react to the lifecycle events it reports back.
//!
//! **Architecture:** `SessionController` owns one `PlaybackScheduler` per
//! guild and talks to voice transport, audio backend, metadata lookup and
//! notification delivery through the traits in [`backend`].

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod playback;

pub use error::{Error, Result};
pub use playback::SessionController;
