//! Timer-driven transport without audio output
//!
//! Each `play` spawns a stream task that "plays" for the item's duration,
//! suspends its timer while paused, and fires the completion handle when the
//! time runs out or the stream is stopped.

use super::transport::{CompletionHandle, PlayRequest, Transport};
use crate::error::TransportError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamControl {
    Pause,
    Resume,
    Stop,
}

#[derive(Debug)]
struct StreamSlot {
    generation: u64,
    control: mpsc::UnboundedSender<StreamControl>,
}

/// Simulated streaming transport
#[derive(Debug, Clone)]
pub struct SimulatedTransport {
    /// Play time for items with unknown duration (live streams)
    fallback_duration: Duration,
    streams: Arc<Mutex<HashMap<String, StreamSlot>>>,
}

impl SimulatedTransport {
    pub fn new(fallback_duration: Duration) -> Self {
        Self {
            fallback_duration,
            streams: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of sessions with a running stream
    pub async fn active_streams(&self) -> usize {
        self.streams.lock().await.len()
    }

    async fn send(&self, session_id: &str, control: StreamControl) {
        let streams = self.streams.lock().await;
        match streams.get(session_id) {
            Some(slot) => {
                // Receiver gone means the stream already ended
                let _ = slot.control.send(control);
            }
            None => debug!(session = %session_id, ?control, "No stream to control"),
        }
    }
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    async fn play(
        &self,
        session_id: &str,
        request: PlayRequest,
        done: CompletionHandle,
    ) -> Result<(), TransportError> {
        let length = match request.item.duration_secs {
            0 => self.fallback_duration,
            secs => Duration::from_secs(secs),
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let generation = done.generation();

        let previous = self.streams.lock().await.insert(
            session_id.to_string(),
            StreamSlot {
                generation,
                control: tx,
            },
        );
        if let Some(previous) = previous {
            let _ = previous.control.send(StreamControl::Stop);
        }

        info!(
            session = %session_id,
            title = %request.item.title,
            length_secs = length.as_secs(),
            volume = request.volume,
            options = %request.stream_options,
            "Streaming (simulated)"
        );

        tokio::spawn(run_stream(
            session_id.to_string(),
            length,
            rx,
            done,
            self.streams.clone(),
        ));
        Ok(())
    }

    async fn pause(&self, session_id: &str) {
        self.send(session_id, StreamControl::Pause).await;
    }

    async fn resume(&self, session_id: &str) {
        self.send(session_id, StreamControl::Resume).await;
    }

    async fn stop(&self, session_id: &str) {
        self.send(session_id, StreamControl::Stop).await;
    }
}

async fn run_stream(
    session_id: String,
    length: Duration,
    mut control: mpsc::UnboundedReceiver<StreamControl>,
    done: CompletionHandle,
    streams: Arc<Mutex<HashMap<String, StreamSlot>>>,
) {
    let mut remaining = length;
    let mut paused = false;

    loop {
        if paused {
            match control.recv().await {
                Some(StreamControl::Resume) => paused = false,
                Some(StreamControl::Pause) => {}
                Some(StreamControl::Stop) | None => break,
            }
            continue;
        }

        let segment_start = Instant::now();
        tokio::select! {
            _ = tokio::time::sleep(remaining) => {
                remaining = Duration::ZERO;
                break;
            }
            cmd = control.recv() => {
                remaining = remaining.saturating_sub(segment_start.elapsed());
                match cmd {
                    Some(StreamControl::Pause) => paused = true,
                    Some(StreamControl::Resume) => {}
                    Some(StreamControl::Stop) | None => break,
                }
            }
        }
    }

    {
        let mut streams = streams.lock().await;
        if streams
            .get(&session_id)
            .is_some_and(|slot| slot.generation == done.generation())
        {
            streams.remove(&session_id);
        }
    }

    debug!(
        session = %session_id,
        remaining_secs = remaining.as_secs(),
        "Simulated stream ended"
    );
    done.finish(None);
}
