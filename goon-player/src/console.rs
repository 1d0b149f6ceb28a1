//! Line-oriented console front end
//!
//! Parses `<session> <command> [args]` lines into registry calls and renders
//! player events as text. Command names follow the `goon` chat command group.

use crate::playback::{ControlOutcome, EnqueueOutcome, NoOpReason, Query, ShuffleOutcome};
use crate::registry::SessionRegistry;
use goon_common::events::{PlaybackState, PlayerEvent, PlayerView, QueueSnapshot};
use goon_common::human_time::{format_position, progress_bar, DEFAULT_BAR_WIDTH};
use thiserror::Error;

pub const USAGE: &str = "\
Commands:
  <session> play <link or query>   queue a song (starts playing if idle)
  <session> pause                  pause the current song
  <session> resume                 resume the paused song
  <session> skip                   skip the current song
  <session> stop                   stop and clear the queue
  <session> shuffle                shuffle the queue
  <session> queue                  show upcoming songs
  <session> now                    show what is playing
  <session> leave                  leave and discard the session
  sessions                         list live sessions
  help                             show this help
  quit                             exit";

/// Per-session command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play(Query),
    Pause,
    Resume,
    Skip,
    Stop,
    Shuffle,
    Queue,
    Now,
    Leave,
}

/// One parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Session { session_id: String, command: Command },
    Sessions,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty line")]
    Empty,

    #[error("Missing command for session {0}. Type `help` for usage.")]
    MissingCommand(String),

    #[error("Please provide a YouTube link or search query. Usage: `<session> play <Link or Query>`")]
    MissingQuery,

    #[error("Unknown command `{0}`. Type `help` for usage.")]
    UnknownCommand(String),
}

/// Parse one input line
pub fn parse_command(line: &str) -> Result<Input, ParseError> {
    let line = line.trim();
    let (first, rest) = split_word(line);

    match first.to_ascii_lowercase().as_str() {
        "" => return Err(ParseError::Empty),
        "sessions" if rest.is_empty() => return Ok(Input::Sessions),
        "help" | "?" if rest.is_empty() => return Ok(Input::Help),
        "quit" | "exit" if rest.is_empty() => return Ok(Input::Quit),
        _ => {}
    }

    let session_id = first.to_string();
    let (word, args) = split_word(rest);

    let command = match word.to_ascii_lowercase().as_str() {
        "" => return Err(ParseError::MissingCommand(session_id)),
        "play" | "p" => {
            if args.is_empty() {
                return Err(ParseError::MissingQuery);
            }
            Command::Play(Query::new(args))
        }
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "skip" => Command::Skip,
        "stop" => Command::Stop,
        "shuffle" => Command::Shuffle,
        "queue" | "q" => Command::Queue,
        "now" | "np" => Command::Now,
        "leave" => Command::Leave,
        _ => return Err(ParseError::UnknownCommand(word.to_string())),
    };

    Ok(Input::Session {
        session_id,
        command,
    })
}

fn split_word(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    }
}

/// Run a session command and return the reply text
pub async fn execute(
    registry: &SessionRegistry,
    session_id: &str,
    command: Command,
    queue_limit: usize,
) -> String {
    match command {
        Command::Play(query) => {
            let text = query.to_string();
            match registry.enqueue(session_id, query).await {
                EnqueueOutcome::NowPlaying => format!("Looking up `{}`...", text),
                EnqueueOutcome::Queued { position } => {
                    format!("Queued `{}` at position {}.", text, position + 1)
                }
                EnqueueOutcome::Rejected { limit } => {
                    format!("The queue is full ({} songs). Try again later.", limit)
                }
                EnqueueOutcome::Closed => "The session is shutting down.".to_string(),
            }
        }
        Command::Pause => control_reply(registry.pause(session_id).await, "Paused."),
        Command::Resume => control_reply(registry.resume(session_id).await, "Resumed."),
        Command::Skip => control_reply(
            registry.skip(session_id).await,
            "Skipped the current song.",
        ),
        Command::Stop => control_reply(
            registry.stop(session_id).await,
            "Stopped playback and cleared the queue.",
        ),
        Command::Shuffle => match registry.shuffle(session_id).await {
            ShuffleOutcome::Shuffled => "Shuffled the queue.".to_string(),
            ShuffleOutcome::Insufficient => "Not enough songs in the queue to shuffle.".to_string(),
        },
        Command::Queue => render_queue(&registry.queue_snapshot(session_id, queue_limit).await),
        Command::Now => render_view(&registry.current_view(session_id).await),
        Command::Leave => {
            if registry.remove(session_id).await {
                "Left the voice channel.".to_string()
            } else {
                NoOpReason::NoSession.to_string()
            }
        }
    }
}

fn control_reply(outcome: ControlOutcome, applied: &str) -> String {
    match outcome {
        ControlOutcome::Applied => applied.to_string(),
        ControlOutcome::NoOp(reason) => reason.to_string(),
    }
}

pub fn render_queue(snapshot: &QueueSnapshot) -> String {
    if snapshot.entries.is_empty() {
        return "The queue is empty.".to_string();
    }

    let mut lines: Vec<String> = snapshot
        .entries
        .iter()
        .map(|entry| {
            let label = entry.title.as_deref().unwrap_or(&entry.query);
            format!("{}. {}", entry.position + 1, label)
        })
        .collect();

    let hidden = snapshot.total.saturating_sub(snapshot.entries.len());
    if hidden > 0 {
        lines.push(format!("...and {} more", hidden));
    }
    lines.join("\n")
}

pub fn render_view(view: &PlayerView) -> String {
    let Some(title) = view.title.as_deref() else {
        return match &view.pending {
            Some(query) => format!("Nothing is playing. Looking up `{}`...", query),
            None => "Nothing is playing.".to_string(),
        };
    };

    let status = match view.state {
        PlaybackState::Paused => "Paused",
        _ => "Now playing",
    };
    format!(
        "{}: {}\n{} {}",
        status,
        title,
        progress_bar(view.progress, DEFAULT_BAR_WIDTH),
        format_position(view.elapsed_secs, view.duration.secs()),
    )
}

/// Text line for a published event; `None` for events not shown
pub fn render_event(event: &PlayerEvent) -> Option<String> {
    let line = match event {
        PlayerEvent::SessionOpened { session_id, .. } => format!("[{}] joined", session_id),
        PlayerEvent::NowPlaying { session_id, view, .. } => format!(
            "[{}] Now playing: {}",
            session_id,
            view.title.as_deref().unwrap_or_default()
        ),
        PlayerEvent::StateChanged {
            session_id,
            new_state: PlaybackState::Idle,
            ..
        } => format!("[{}] Queue finished.", session_id),
        PlayerEvent::StateChanged { .. } => return None,
        PlayerEvent::Progress { session_id, view, .. } => format!(
            "[{}] {} {} {}",
            session_id,
            progress_bar(view.progress, DEFAULT_BAR_WIDTH),
            format_position(view.elapsed_secs, view.duration.secs()),
            view.title.as_deref().unwrap_or_default()
        ),
        PlayerEvent::ItemFailed {
            session_id,
            query,
            reason,
            ..
        } => format!(
            "[{}] An error occurred while processing `{}`, skipping it. ({})",
            session_id, query, reason
        ),
        PlayerEvent::QueueChanged { .. } => return None,
        PlayerEvent::SessionClosed { session_id, .. } => format!("[{}] left", session_id),
    };
    Some(line)
}
