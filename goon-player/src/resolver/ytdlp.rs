//! yt-dlp backed resolver
//!
//! Spawns one `yt-dlp --dump-single-json` process per call, so every attempt
//! starts from a clean extractor with no cached state. The process is killed
//! if the call is dropped (cancelled session).

use super::{MediaItem, MediaResolver, ResolvedMedia};
use crate::error::ResolveError;
use async_trait::async_trait;
use goon_common::config::ResolverConfig;
use serde_json::Value;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Longest stderr excerpt carried in an error message
const STDERR_EXCERPT_CHARS: usize = 300;

/// Resolver running the yt-dlp executable
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    program: String,
    format: String,
    default_search: String,
    no_playlist: bool,
}

impl YtDlpResolver {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            program: config.ytdlp_path.clone(),
            format: config.format.clone(),
            default_search: config.default_search.clone(),
            no_playlist: config.no_playlist,
        }
    }

    /// Command-line arguments for one lookup
    pub fn args(&self, query: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "--no-check-certificates".to_string(),
            "--force-ipv4".to_string(),
            "-f".to_string(),
            self.format.clone(),
            "--default-search".to_string(),
            self.default_search.clone(),
        ];
        if self.no_playlist {
            args.push("--no-playlist".to_string());
        }
        args.push("--".to_string());
        args.push(query.to_string());
        args
    }
}

#[async_trait]
impl MediaResolver for YtDlpResolver {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn resolve(&self, query: &str) -> Result<Option<ResolvedMedia>, ResolveError> {
        debug!(program = %self.program, query, "Spawning yt-dlp");

        let output = Command::new(&self.program)
            .args(self.args(query))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ResolveError::Failed(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT_CHARS).collect();
            return Err(ResolveError::Failed(format!(
                "yt-dlp exited with {}: {}",
                output.status, excerpt
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_ytdlp_json(&stdout)
    }
}

/// Parse `--dump-single-json` output
///
/// * top-level `entries` array -> `ResolvedMedia::Entries` (null or unusable
///   entries skipped)
/// * otherwise a single item, or `None` when no stream locator is present
pub fn parse_ytdlp_json(json: &str) -> Result<Option<ResolvedMedia>, ResolveError> {
    let value: Value = serde_json::from_str(json.trim())
        .map_err(|e| ResolveError::Failed(format!("invalid yt-dlp output: {}", e)))?;

    if let Some(entries) = value.get("entries").and_then(Value::as_array) {
        let items: Vec<MediaItem> = entries.iter().filter_map(item_from_json).collect();
        return Ok(Some(ResolvedMedia::Entries(items)));
    }

    Ok(item_from_json(&value).map(ResolvedMedia::Item))
}

fn item_from_json(value: &Value) -> Option<MediaItem> {
    let stream_locator = value
        .get("url")
        .and_then(Value::as_str)
        .or_else(|| value.get("webpage_url").and_then(Value::as_str))?
        .to_string();

    let title = value
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("Unknown title")
        .to_string();

    // yt-dlp reports fractional seconds; absent or negative means unknown
    let duration_secs = value
        .get("duration")
        .and_then(Value::as_f64)
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(|d| d.round() as u64)
        .unwrap_or(0);

    let thumbnail_url = value
        .get("thumbnail")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(MediaItem {
        title,
        stream_locator,
        duration_secs,
        thumbnail_url,
    })
}
