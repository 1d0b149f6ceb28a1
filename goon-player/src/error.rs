//! Error types for goon-player
//!
//! Resolution and transport failures. Neither is fatal to a session: the
//! affected item is dropped and the queue moves on. No-op control outcomes
//! ("nothing to pause") are not errors; see `playback::ControlOutcome`.

use thiserror::Error;

/// Failure to turn a query into a playable item
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Resolver returned an error for one attempt
    #[error("resolver failed: {0}")]
    Failed(String),

    /// Resolver succeeded but returned nothing playable
    #[error("resolver returned no playable item")]
    Empty,

    /// Owning session was stopped or torn down while resolving
    #[error("resolution cancelled")]
    Cancelled,

    /// Every attempt failed; carries the last attempt's cause
    #[error("all {attempts} resolve attempts failed: {cause}")]
    AllAttemptsFailed {
        attempts: u32,
        #[source]
        cause: Box<ResolveError>,
    },
}

/// Errors reported by the streaming transport
#[derive(Error, Debug)]
pub enum TransportError {
    /// Session has no live connection to stream into
    #[error("not connected: {0}")]
    NotConnected(String),

    /// Transport could not start the stream
    #[error("transport error: {0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_attempts_failed_keeps_last_cause() {
        let err = ResolveError::AllAttemptsFailed {
            attempts: 3,
            cause: Box::new(ResolveError::Failed("HTTP 429".to_string())),
        };
        let msg = err.to_string();
        assert!(msg.contains("all 3 resolve attempts failed"));
        assert!(msg.contains("HTTP 429"));

        let source = std::error::Error::source(&err).expect("cause is the source");
        assert_eq!(source.to_string(), "resolver failed: HTTP 429");
    }
}
