//! Streaming transport seam
//!
//! The transport joins the voice channel and streams a resolved item. It is
//! an external collaborator: the scheduler only hands it a `PlayRequest` and a
//! `CompletionHandle`, and asks it to pause, resume, or stop.

use super::session::DriverMsg;
use crate::error::TransportError;
use crate::resolver::MediaItem;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

/// Item handed to the transport for streaming
#[derive(Debug, Clone)]
pub struct PlayRequest {
    pub item: MediaItem,
    /// Output volume (0.0-1.0)
    pub volume: f32,
    /// Opaque stream options (e.g. ffmpeg filter flags)
    pub stream_options: String,
}

/// One-shot completion callback for a started item
///
/// Firing it (or dropping it unfired, see `Drop`) routes the session back
/// into its advance transition. Each handle is bound to the playback
/// generation it was issued for, so late or duplicate completions for an
/// earlier item are ignored.
#[derive(Debug)]
pub struct CompletionHandle {
    session_id: String,
    generation: u64,
    tx: Option<mpsc::UnboundedSender<DriverMsg>>,
}

impl CompletionHandle {
    pub(crate) fn new(
        session_id: String,
        generation: u64,
        tx: mpsc::UnboundedSender<DriverMsg>,
    ) -> Self {
        Self {
            session_id,
            generation,
            tx: Some(tx),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report that playback ended, normally (`None`) or with an error
    pub fn finish(mut self, error: Option<String>) {
        self.send(error);
    }

    fn send(&mut self, error: Option<String>) {
        if let Some(tx) = self.tx.take() {
            if tx
                .send(DriverMsg::Finished {
                    generation: self.generation,
                    error,
                })
                .is_err()
            {
                debug!(session = %self.session_id, "Completion after session closed");
            }
        }
    }
}

impl Drop for CompletionHandle {
    /// A transport that loses the handle without firing it still ends the item
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.send(Some("completion handle dropped by transport".to_string()));
        }
    }
}

/// Transport trait - streams items into one session's voice connection
///
/// Contract:
/// - `play` starts streaming and returns once the stream is running; the
///   handle must fire exactly when that stream ends for any reason
/// - `stop` ends the current stream, which fires its handle
/// - `pause`/`resume`/`stop` on a session with nothing playing are no-ops
#[async_trait]
pub trait Transport: Send + Sync {
    async fn play(
        &self,
        session_id: &str,
        request: PlayRequest,
        done: CompletionHandle,
    ) -> Result<(), TransportError>;

    async fn pause(&self, session_id: &str);

    async fn resume(&self, session_id: &str);

    async fn stop(&self, session_id: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_sends_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = CompletionHandle::new("s".to_string(), 4, tx);
        handle.finish(None);

        match rx.try_recv().unwrap() {
            DriverMsg::Finished { generation, error } => {
                assert_eq!(generation, 4);
                assert!(error.is_none());
            }
            other => panic!("unexpected message: {other:?}"),
        }
        // Exactly one message
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_handle_reports_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        drop(CompletionHandle::new("s".to_string(), 9, tx));

        match rx.try_recv().unwrap() {
            DriverMsg::Finished { generation, error } => {
                assert_eq!(generation, 9);
                assert!(error.is_some());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
