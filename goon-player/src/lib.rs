//! # Goon Player Library (goon-player)
//!
//! Per-session playback scheduler for group media playback.
//!
//! **Purpose:** keep one ordered queue per session, play exactly one item at a
//! time, retry flaky media resolution, and publish live progress views.
//!
//! **Architecture:** each `PlaybackSession` owns a driver task that is the
//! only place the advance transition runs; front-end commands and transport
//! completions are funnelled into it. `SessionRegistry` maps session ids to
//! sessions and `monitor` runs the periodic progress sweep.

pub mod console;
pub mod error;
pub mod monitor;
pub mod playback;
pub mod publisher;
pub mod registry;
pub mod resolver;

pub use error::{ResolveError, TransportError};
pub use registry::SessionRegistry;
