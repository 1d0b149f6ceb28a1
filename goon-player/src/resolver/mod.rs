//! Media resolution
//!
//! `MediaResolver` is the external lookup capability turning a query (URL or
//! search text) into a playable `MediaItem`. `RetryingResolver` wraps any
//! resolver with the bounded-attempt retry policy used by sessions.

mod retry;
mod ytdlp;

pub use retry::{RetryPolicy, RetryingResolver};
pub use ytdlp::{parse_ytdlp_json, YtDlpResolver};

use crate::error::ResolveError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Resolved, playable descriptor
///
/// Produced only by a `MediaResolver`; the scheduler never builds one itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub title: String,
    /// Locator handed to the transport (direct stream URL or file path)
    pub stream_locator: String,
    /// Length in whole seconds, 0 = unknown
    pub duration_secs: u64,
    pub thumbnail_url: Option<String>,
}

/// Raw resolver answer
///
/// A playlist-shaped answer to a single-item request comes back as `Entries`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedMedia {
    Item(MediaItem),
    Entries(Vec<MediaItem>),
}

impl ResolvedMedia {
    /// Reduce to a single item: the item itself, or the first entry
    pub fn into_first(self) -> Option<MediaItem> {
        match self {
            ResolvedMedia::Item(item) => Some(item),
            ResolvedMedia::Entries(entries) => entries.into_iter().next(),
        }
    }
}

/// Resolver trait - turns one query into a playable descriptor
///
/// Implementations must not carry mutable state between calls: each call is an
/// independent attempt with a fresh context, so retrying never reuses a stale
/// cache or client.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Resolver identifier for logs (e.g., "yt-dlp")
    fn name(&self) -> &'static str;

    /// Resolve a query
    ///
    /// # Returns
    /// * `Ok(Some(_))` - playable item or list of entries
    /// * `Ok(None)` - lookup succeeded but found nothing usable
    /// * `Err(_)` - lookup failed (retried by `RetryingResolver`)
    async fn resolve(&self, query: &str) -> Result<Option<ResolvedMedia>, ResolveError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str) -> MediaItem {
        MediaItem {
            title: title.to_string(),
            stream_locator: format!("https://cdn.example/{}", title),
            duration_secs: 60,
            thumbnail_url: None,
        }
    }

    #[test]
    fn test_entries_reduce_to_first() {
        let media = ResolvedMedia::Entries(vec![item("first"), item("second")]);
        assert_eq!(media.into_first().unwrap().title, "first");
    }

    #[test]
    fn test_empty_entries_reduce_to_none() {
        assert!(ResolvedMedia::Entries(Vec::new()).into_first().is_none());
    }
}
