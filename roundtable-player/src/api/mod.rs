//! HTTP control surface
//!
//! Chat frontends drive sessions through these endpoints, the audio node
//! posts its lifecycle events to `/backend/events`, and everything observable
//! is streamed back over `/events`.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{create_router, run, AppContext};
