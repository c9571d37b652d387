//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\playlist-minder\config.toml
//! - macOS: ~/Library/Application Support/playlist-minder/config.toml
//! - Linux: ~/.config/playlist-minder/config.toml
//!
//! The config file is human-readable and editable. Every section is optional;
//! anything missing falls back to its default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::{CaptureConfig, DEFAULT_QUEUE_LIMIT, DEFAULT_SENTINEL_ID};
use crate::service::MAX_ITEMS_PER_WRITE;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API credentials (keep separate for potential future encryption)
    pub credentials: Credentials,

    /// Queue capture timings
    pub capture: CaptureSettings,

    /// Playlist naming and writing
    pub playlists: PlaylistSettings,

    /// Preview cache
    pub cache: CacheSettings,
}

/// API credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Spotify Web API bearer token
    pub access_token: Option<String>,
}

/// Queue capture settings. Durations are in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Track used to mark the end of the queue
    pub sentinel_id: String,

    pub queue_limit: usize,

    /// Cooldown starts this many tracks before the limit
    pub cooldown_margin: usize,

    pub cooldown_ms: u64,

    pub settle_delay_ms: u64,

    pub poll_interval_ms: u64,

    pub step_deadline_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            sentinel_id: DEFAULT_SENTINEL_ID.to_string(),
            queue_limit: DEFAULT_QUEUE_LIMIT,
            cooldown_margin: 7,
            cooldown_ms: 10_000,
            settle_delay_ms: 250,
            poll_interval_ms: 100,
            step_deadline_ms: 1250,
        }
    }
}

impl CaptureSettings {
    pub fn to_capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sentinel_id: self.sentinel_id.clone(),
            queue_limit: self.queue_limit,
            cooldown_margin: self.cooldown_margin,
            cooldown: Duration::from_millis(self.cooldown_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            step_deadline: Duration::from_millis(self.step_deadline_ms),
        }
    }
}

/// Playlist naming and write settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistSettings {
    /// Name for captured queues
    pub queue_name: String,

    /// Name for the liked-tracks mirror
    pub liked_name: String,

    /// Leftover playlist of an artist split
    pub others_name: String,

    /// Artists with more tracks than this get their own playlist
    pub artist_split_threshold: usize,

    /// Items per write call (capped at the service limit)
    pub write_batch_size: usize,

    /// How far back `listened` looks in the listening history
    pub listened_window_hours: u32,
}

impl Default for PlaylistSettings {
    fn default() -> Self {
        Self {
            queue_name: "Saved queue".to_string(),
            liked_name: "Liked songs as playlist".to_string(),
            others_name: "smaller others".to_string(),
            artist_split_threshold: 7,
            write_batch_size: MAX_ITEMS_PER_WRITE,
            listened_window_hours: 24,
        }
    }
}

/// Preview cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub capacity: usize,

    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: 32,
            ttl_secs: 15 * 60,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("playlist-minder"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };
    load_from(&path)
}

/// Load configuration from a specific file, with the same fallbacks as [`load`].
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::debug!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to disk
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)
}

/// Save configuration to a specific file.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),

    #[error("Unknown config key '{0}'")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

// ============================================================================
// Key access for the `config` command
// ============================================================================

impl Config {
    /// Keys accepted by [`Config::get`] and [`Config::set`].
    pub const KEYS: &'static [&'static str] = &[
        "credentials.access_token",
        "capture.sentinel_id",
        "capture.queue_limit",
        "capture.cooldown_margin",
        "capture.cooldown_ms",
        "capture.settle_delay_ms",
        "capture.poll_interval_ms",
        "capture.step_deadline_ms",
        "playlists.queue_name",
        "playlists.liked_name",
        "playlists.others_name",
        "playlists.artist_split_threshold",
        "playlists.write_batch_size",
        "playlists.listened_window_hours",
        "cache.capacity",
        "cache.ttl_secs",
    ];

    /// Current value of a dotted key, as text.
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        let value = match key {
            "credentials.access_token" => self
                .credentials
                .access_token
                .as_deref()
                .map(|_| "<set>".to_string())
                .unwrap_or_default(),
            "capture.sentinel_id" => self.capture.sentinel_id.clone(),
            "capture.queue_limit" => self.capture.queue_limit.to_string(),
            "capture.cooldown_margin" => self.capture.cooldown_margin.to_string(),
            "capture.cooldown_ms" => self.capture.cooldown_ms.to_string(),
            "capture.settle_delay_ms" => self.capture.settle_delay_ms.to_string(),
            "capture.poll_interval_ms" => self.capture.poll_interval_ms.to_string(),
            "capture.step_deadline_ms" => self.capture.step_deadline_ms.to_string(),
            "playlists.queue_name" => self.playlists.queue_name.clone(),
            "playlists.liked_name" => self.playlists.liked_name.clone(),
            "playlists.others_name" => self.playlists.others_name.clone(),
            "playlists.artist_split_threshold" => {
                self.playlists.artist_split_threshold.to_string()
            }
            "playlists.write_batch_size" => self.playlists.write_batch_size.to_string(),
            "playlists.listened_window_hours" => {
                self.playlists.listened_window_hours.to_string()
            }
            "cache.capacity" => self.cache.capacity.to_string(),
            "cache.ttl_secs" => self.cache.ttl_secs.to_string(),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    /// Set a dotted key from text.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "credentials.access_token" => {
                self.credentials.access_token = (!value.is_empty()).then(|| value.to_string());
            }
            "capture.sentinel_id" => self.capture.sentinel_id = value.to_string(),
            "capture.queue_limit" => self.capture.queue_limit = parse(key, value)?,
            "capture.cooldown_margin" => self.capture.cooldown_margin = parse(key, value)?,
            "capture.cooldown_ms" => self.capture.cooldown_ms = parse(key, value)?,
            "capture.settle_delay_ms" => self.capture.settle_delay_ms = parse(key, value)?,
            "capture.poll_interval_ms" => self.capture.poll_interval_ms = parse(key, value)?,
            "capture.step_deadline_ms" => self.capture.step_deadline_ms = parse(key, value)?,
            "playlists.queue_name" => self.playlists.queue_name = value.to_string(),
            "playlists.liked_name" => self.playlists.liked_name = value.to_string(),
            "playlists.others_name" => self.playlists.others_name = value.to_string(),
            "playlists.artist_split_threshold" => {
                self.playlists.artist_split_threshold = parse(key, value)?
            }
            "playlists.write_batch_size" => {
                let size: usize = parse(key, value)?;
                if size == 0 || size > MAX_ITEMS_PER_WRITE {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: format!("must be between 1 and {MAX_ITEMS_PER_WRITE}"),
                    });
                }
                self.playlists.write_batch_size = size;
            }
            "playlists.listened_window_hours" => {
                self.playlists.listened_window_hours = parse(key, value)?
            }
            "cache.capacity" => self.cache.capacity = parse(key, value)?,
            "cache.ttl_secs" => self.cache.ttl_secs = parse(key, value)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[credentials]"));
        assert!(toml.contains("[capture]"));
        assert!(toml.contains("[playlists]"));
        assert!(toml.contains("[cache]"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.credentials.access_token = Some("token-123".to_string());
        config.capture.step_deadline_ms = 2000;
        config.playlists.queue_name = "Queue backup".to_string();

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert_eq!(parsed.credentials.access_token, Some("token-123".to_string()));
        assert_eq!(parsed.capture.step_deadline_ms, 2000);
        assert_eq!(parsed.playlists.queue_name, "Queue backup");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        // Config with only some fields
        let toml = r#"
[capture]
queue_limit = 50
"#;
        let config: Config = toml::from_str(toml).unwrap();

        // Specified field is set
        assert_eq!(config.capture.queue_limit, 50);

        // Other fields use defaults
        assert_eq!(config.capture.sentinel_id, DEFAULT_SENTINEL_ID);
        assert_eq!(config.playlists.others_name, "smaller others");
        assert!(config.credentials.access_token.is_none());
    }

    #[test]
    fn test_capture_settings_convert() {
        let capture = CaptureSettings::default().to_capture_config();
        assert_eq!(capture, CaptureConfig::default());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.cache.capacity = 4;
        save_to(&config, &path).unwrap();

        assert!(!path.with_extension("toml.tmp").exists());
        assert_eq!(load_from(&path).cache.capacity, 4);
    }

    #[test]
    fn test_broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is [not toml").unwrap();

        assert_eq!(load_from(&path).capture, CaptureSettings::default());
        assert_eq!(load_from(&dir.path().join("missing.toml")).cache.capacity, 32);
    }

    #[test]
    fn test_get_and_set_keys() {
        let mut config = Config::default();
        config.set("capture.queue_limit", "80").unwrap();
        assert_eq!(config.get("capture.queue_limit").unwrap(), "80");

        config.set("credentials.access_token", "secret").unwrap();
        assert_eq!(config.get("credentials.access_token").unwrap(), "<set>");

        assert!(matches!(
            config.set("capture.queue_limit", "lots"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set("playlists.write_batch_size", "500"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(config.get("nope"), Err(ConfigError::UnknownKey(_))));

        for key in Config::KEYS {
            assert!(config.get(key).is_ok(), "{key}");
        }
    }
}
