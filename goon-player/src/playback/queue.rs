//! Per-session queue of pending queries
//!
//! FIFO with explicit reordering. Position 0 is the next query to play.
//! Unbounded; callers impose a maximum at the boundary.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Unresolved playback request: a URL or free-text search term
///
/// Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl From<String> for Query {
    fn from(text: String) -> Self {
        Self(text)
    }
}

/// Result of a shuffle request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleOutcome {
    /// Entries were permuted
    Shuffled,
    /// Fewer than two entries; order unchanged
    Insufficient,
}

/// Ordered sequence of pending queries
#[derive(Debug, Clone, Default)]
pub struct Queue {
    entries: VecDeque<Query>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at tail
    pub fn enqueue(&mut self, query: Query) {
        self.entries.push_back(query);
    }

    /// Remove and return the head
    pub fn pop_front(&mut self) -> Option<Query> {
        self.entries.pop_front()
    }

    pub fn peek_front(&self) -> Option<&Query> {
        self.entries.front()
    }

    /// Remove every entry, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    /// Uniform random permutation of all entries
    pub fn shuffle(&mut self) -> ShuffleOutcome {
        self.shuffle_with(&mut rand::thread_rng())
    }

    /// Shuffle with a caller-supplied RNG
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> ShuffleOutcome {
        if self.entries.len() < 2 {
            return ShuffleOutcome::Insufficient;
        }
        self.entries.make_contiguous().shuffle(rng);
        ShuffleOutcome::Shuffled
    }

    /// Up to `n` entries from the head, in order
    pub fn window(&self, n: usize) -> Vec<&Query> {
        self.entries.iter().take(n).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Query> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
