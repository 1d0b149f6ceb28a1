//! Bounded-attempt retry around a MediaResolver
//!
//! Every attempt is a fresh call on the stateless resolver. An attempt fails
//! when the resolver errors or returns nothing playable; after the last
//! failed attempt the error is surfaced as `AllAttemptsFailed` carrying the
//! last cause. Delays between attempts are fixed and cancellable.

use super::{MediaItem, MediaResolver};
use crate::error::ResolveError;
use crate::playback::Query;
use goon_common::config::ResolverConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Retry policy for resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total resolver calls per query (>= 1)
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl From<&ResolverConfig> for RetryPolicy {
    fn from(config: &ResolverConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Resolver wrapper applying `RetryPolicy`
///
/// Knows nothing about queues or sessions.
pub struct RetryingResolver {
    inner: Arc<dyn MediaResolver>,
    policy: RetryPolicy,
}

impl RetryingResolver {
    pub fn new(inner: Arc<dyn MediaResolver>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Resolve a query with retries
    ///
    /// Cancelling `cancel` aborts the in-flight attempt or inter-attempt sleep
    /// and returns `ResolveError::Cancelled`.
    pub async fn resolve(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<MediaItem, ResolveError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = ResolveError::Empty;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }

            if attempt > 1 {
                debug!(
                    resolver = self.inner.name(),
                    query = %query,
                    attempt,
                    "Retrying resolution"
                );
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(ResolveError::Cancelled),
                outcome = self.inner.resolve(query.as_str()) => outcome,
            };

            match outcome {
                Ok(Some(media)) => match media.into_first() {
                    Some(item) => {
                        if attempt > 1 {
                            info!(
                                query = %query,
                                attempt,
                                "Resolution succeeded after retry"
                            );
                        }
                        return Ok(item);
                    }
                    None => last_error = ResolveError::Empty,
                },
                Ok(None) => last_error = ResolveError::Empty,
                Err(e) => last_error = e,
            }

            warn!(
                resolver = self.inner.name(),
                query = %query,
                attempt,
                max_attempts,
                error = %last_error,
                "Resolve attempt failed"
            );

            if attempt < max_attempts {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(ResolveError::Cancelled),
                    _ = tokio::time::sleep(self.policy.delay) => {}
                }
            }
        }

        Err(ResolveError::AllAttemptsFailed {
            attempts: max_attempts,
            cause: Box::new(last_error),
        })
    }
}
