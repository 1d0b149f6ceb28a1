//! Configuration loading
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables (`GOON_CONFIG`, `GOON_LOG_LEVEL`)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! A missing TOML file never stops startup: a warning is logged and the
//! built-in defaults apply. A file that exists but does not parse is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "GOON_CONFIG";

/// Environment variable overriding the log level
pub const LOG_LEVEL_ENV_VAR: &str = "GOON_LOG_LEVEL";

/// Lower bound for the delay between resolve attempts
pub const MIN_RETRY_DELAY_MS: u64 = 1000;

/// Complete TOML configuration
///
/// Every section and key is optional; omitted values take built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub resolver: ResolverConfig,
    pub playback: PlaybackConfig,
    pub logging: LoggingConfig,
}

/// Media resolution and retry policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Resolver calls per query before giving up
    pub max_attempts: u32,
    /// Fixed delay between attempts (milliseconds)
    pub retry_delay_ms: u64,
    /// yt-dlp executable (name on PATH or absolute path)
    pub ytdlp_path: String,
    /// yt-dlp format selector
    pub format: String,
    /// Search prefix applied to queries that are not URLs
    pub default_search: String,
    /// Resolve a single video even when the URL names a playlist
    pub no_playlist: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: MIN_RETRY_DELAY_MS,
            ytdlp_path: "yt-dlp".to_string(),
            format: "bestaudio/best".to_string(),
            default_search: "auto".to_string(),
            no_playlist: true,
        }
    }
}

/// Session playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Interval of the progress refresh sweep (milliseconds)
    pub progress_interval_ms: u64,
    /// Number of queue entries shown by default
    pub queue_display_limit: usize,
    /// Optional cap on queue length, enforced when enqueueing
    pub max_queue_len: Option<usize>,
    /// Output volume handed to the transport (0.0-1.0)
    pub volume: f32,
    /// Opaque stream options handed to the transport with each item
    pub stream_options: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: 2000,
            queue_display_limit: 5,
            max_queue_len: None,
            volume: 0.5,
            stream_options: "-vn -b:a 192k -af loudnorm".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log file path (logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl TomlConfig {
    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validated()
    }

    /// Load configuration from a file
    ///
    /// Missing file: warning + defaults. Unreadable or invalid file: error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file {:?} not found, using built-in defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded TOML configuration from {:?}", path);
        Ok(config)
    }

    /// Resolve the config path and load it, falling back to defaults
    pub fn load_resolved(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path) {
            Some(path) => Self::load(&path),
            None => {
                warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    fn validated(mut self) -> Result<Self> {
        if self.resolver.max_attempts == 0 {
            return Err(Error::Config(
                "resolver.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.resolver.retry_delay_ms < MIN_RETRY_DELAY_MS {
            warn!(
                "resolver.retry_delay_ms = {} is below the {}ms minimum, clamping",
                self.resolver.retry_delay_ms, MIN_RETRY_DELAY_MS
            );
            self.resolver.retry_delay_ms = MIN_RETRY_DELAY_MS;
        }
        if self.playback.progress_interval_ms == 0 {
            return Err(Error::Config(
                "playback.progress_interval_ms must be positive".to_string(),
            ));
        }
        if self.playback.max_queue_len == Some(0) {
            return Err(Error::Config(
                "playback.max_queue_len must be positive when set".to_string(),
            ));
        }
        self.playback.volume = self.playback.volume.clamp(0.0, 1.0);
        Ok(self)
    }
}

/// Resolve the configuration file path
///
/// Priority: CLI argument > `GOON_CONFIG` > `<config dir>/goon/config.toml`
/// (only when that file exists).
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|p| p.exists())
}

/// Platform config location (`~/.config/goon/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("goon").join("config.toml"))
}

/// Resolve the log level
///
/// Priority: CLI argument > `GOON_LOG_LEVEL` > TOML `[logging] level`.
pub fn resolve_log_level(cli_level: Option<&str>, logging: &LoggingConfig) -> String {
    if let Some(level) = cli_level {
        return level.to_string();
    }
    match std::env::var(LOG_LEVEL_ENV_VAR) {
        Ok(level) if !level.trim().is_empty() => level,
        _ => logging.level.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.resolver.max_attempts, 3);
        assert_eq!(config.resolver.retry_delay_ms, 1000);
        assert_eq!(config.playback.progress_interval_ms, 2000);
        assert_eq!(config.playback.queue_display_limit, 5);
        assert_eq!(config.playback.max_queue_len, None);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            [resolver]
            max_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.resolver.max_attempts, 5);
        assert_eq!(config.resolver.retry_delay_ms, 1000);
        assert_eq!(config.resolver.format, "bestaudio/best");
    }

    #[test]
    fn test_retry_delay_clamped_to_minimum() {
        let config = TomlConfig::from_toml_str("[resolver]\nretry_delay_ms = 10\n").unwrap();
        assert_eq!(config.resolver.retry_delay_ms, MIN_RETRY_DELAY_MS);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let result = TomlConfig::from_toml_str("[resolver]\nmax_attempts = 0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_volume_clamped() {
        let config = TomlConfig::from_toml_str("[playback]\nvolume = 3.0\n").unwrap();
        assert_eq!(config.playback.volume, 1.0);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(TomlConfig::from_toml_str("[resolver\nmax_attempts = ").is_err());
    }

    #[test]
    fn test_cli_level_wins() {
        let logging = LoggingConfig::default();
        assert_eq!(resolve_log_level(Some("trace"), &logging), "trace");
    }
}
