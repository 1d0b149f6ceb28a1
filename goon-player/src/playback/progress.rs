//! Progress tracking with pause accounting
//!
//! Elapsed play time is wall time since the item started, minus every paused
//! interval. While paused the value is frozen at the pause instant. Uses
//! `tokio::time::Instant` so paused-clock tests are deterministic.

use std::time::Duration;
use tokio::time::Instant;

/// Play clock for the current item
#[derive(Debug, Clone, Default)]
pub struct ProgressClock {
    started_at: Option<Instant>,
    paused_at: Option<Instant>,
    accumulated_pause: Duration,
}

impl ProgressClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start timing a new item
    pub fn start(&mut self, now: Instant) {
        self.started_at = Some(now);
        self.paused_at = None;
        self.accumulated_pause = Duration::ZERO;
    }

    /// Freeze the clock; ignored if already paused or not started
    pub fn pause(&mut self, now: Instant) {
        if self.started_at.is_some() && self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    /// Unfreeze the clock, adding the paused interval to the pause total
    pub fn resume(&mut self, now: Instant) {
        if let Some(paused_at) = self.paused_at.take() {
            self.accumulated_pause += now.saturating_duration_since(paused_at);
        }
    }

    /// Forget the current item (idle)
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn accumulated_pause(&self) -> Duration {
        self.accumulated_pause
    }

    /// Elapsed play time at `now`, never negative
    ///
    /// - not started: zero
    /// - paused: `paused_at - started_at - accumulated_pause`
    /// - playing: `now - started_at - accumulated_pause`
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        let Some(started_at) = self.started_at else {
            return Duration::ZERO;
        };
        let end = self.paused_at.unwrap_or(now);
        end.saturating_duration_since(started_at)
            .saturating_sub(self.accumulated_pause)
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }
}

/// Fraction of the item played, clamped to `[0, 1]`
///
/// `None` when the duration is unknown (0): render an indeterminate
/// indicator rather than a computed bar.
pub fn progress_fraction(elapsed: Duration, duration_secs: u64) -> Option<f64> {
    if duration_secs == 0 {
        return None;
    }
    Some((elapsed.as_secs_f64() / duration_secs as f64).clamp(0.0, 1.0))
}
