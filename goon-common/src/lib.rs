//! # Goon Common Library
//!
//! Shared code for the goon playback scheduler:
//! - Configuration loading (TOML + environment + defaults)
//! - Event types (`PlayerEvent`) and the broadcast `EventBus`
//! - Session views rendered by front ends
//! - Human-readable time formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;

pub use error::{Error, Result};
pub use events::{EventBus, PlaybackState, PlayerEvent};
