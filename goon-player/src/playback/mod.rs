//! Per-session playback scheduling
//!
//! Queue, play clock, session state machine, and the transport seam the
//! session hands resolved items to.

mod progress;
mod queue;
mod session;
mod simulated;
mod transport;

pub use progress::{progress_fraction, ProgressClock};
pub use queue::{Query, Queue, ShuffleOutcome};
pub use session::{
    ControlOutcome, EnqueueOutcome, NoOpReason, PlaybackSession, SessionDeps, SessionSettings,
};
pub use simulated::SimulatedTransport;
pub use transport::{CompletionHandle, PlayRequest, Transport};
