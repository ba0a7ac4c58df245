//! Configuration: a JSON file with environment-variable fallback.
//!
//! The file is tried first; when it does not exist the environment supplies
//! the same settings (`DISCORD_TOKEN`, `GUILD_ID`, `LIVE_STATUS_CHANNEL_ID`,
//! `NOTIFICATION_CHANNEL_ID`, `COUNTER_CHANNEL_ID`). An explicitly present
//! but unreadable or invalid file is an error, since silent fallback would mask a
//! typo in the one file operators actually edit. A missing token is the one
//! unconditionally fatal condition.

use crate::sched::TaskIntervals;
use crate::source::MONITOR_WINDOW;
use serde::Deserialize;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the config file lives unless overridden on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "/opt/bot-config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no bot token configured; set discord_token in the config file or DISCORD_TOKEN")]
    MissingToken,
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("config {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("environment variable {name} is not a valid integer")]
    InvalidEnv { name: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bot token for the chat platform. Required.
    #[serde(default)]
    pub discord_token: String,

    /// Target guild. Recorded for the assembly layer; channel operations
    /// address channels directly.
    #[serde(default)]
    pub guild_id: u64,

    /// Channel carrying the pinned live-status display.
    #[serde(default)]
    pub live_status_channel_id: u64,

    /// Channel for join/leave notifications; the notification task is not
    /// started without one.
    #[serde(default)]
    pub notification_channel_id: Option<u64>,

    /// Channel renamed to carry the user count; the counter task is not
    /// started without one.
    #[serde(default)]
    pub counter_channel_id: Option<u64>,

    /// systemd unit of the monitored server.
    #[serde(default = "default_unit")]
    pub service_unit: String,

    /// TCP port of the monitored server, for connection counting.
    #[serde(default = "default_port")]
    pub service_port: u16,

    /// Where the persisted state lives.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Log lines fetched per monitoring poll.
    #[serde(default = "default_window")]
    pub log_window: usize,

    #[serde(default)]
    pub display_interval_secs: Option<u64>,
    #[serde(default)]
    pub presence_interval_secs: Option<u64>,
    #[serde(default)]
    pub notify_interval_secs: Option<u64>,
    #[serde(default)]
    pub counter_interval_secs: Option<u64>,
}

fn default_unit() -> String {
    "aooserver".to_string()
}

fn default_port() -> u16 {
    10998
}

fn default_state_path() -> PathBuf {
    PathBuf::from("/opt/bot_state.json")
}

fn default_window() -> usize {
    MONITOR_WINDOW
}

impl Config {
    /// Load from `path`, falling back to the environment when the file does
    /// not exist.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingToken`] when neither source supplies a token;
    /// I/O and parse errors when the file exists but cannot be used.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => {
                let config: Config =
                    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                        path: path.to_path_buf(),
                        source,
                    })?;
                config.validated()
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::from_env(),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Build a config purely from process environment variables.
    pub fn from_env() -> Result<Config, ConfigError> {
        Self::from_env_with(|name| env::var(name).ok())
    }

    /// Environment loading with an injectable lookup, so tests don't have
    /// to mutate process globals.
    pub fn from_env_with(get: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        fn parse_id(
            get: &impl Fn(&str) -> Option<String>,
            name: &'static str,
        ) -> Result<Option<u64>, ConfigError> {
            match get(name) {
                None => Ok(None),
                Some(raw) => raw
                    .parse()
                    .map(Some)
                    .map_err(|_| ConfigError::InvalidEnv { name }),
            }
        }

        let config = Config {
            discord_token: get("DISCORD_TOKEN").unwrap_or_default(),
            guild_id: parse_id(&get, "GUILD_ID")?.unwrap_or(0),
            live_status_channel_id: parse_id(&get, "LIVE_STATUS_CHANNEL_ID")?.unwrap_or(0),
            notification_channel_id: parse_id(&get, "NOTIFICATION_CHANNEL_ID")?,
            counter_channel_id: parse_id(&get, "COUNTER_CHANNEL_ID")?,
            service_unit: default_unit(),
            service_port: default_port(),
            state_path: default_state_path(),
            log_window: default_window(),
            display_interval_secs: None,
            presence_interval_secs: None,
            notify_interval_secs: None,
            counter_interval_secs: None,
        };
        config.validated()
    }

    fn validated(self) -> Result<Config, ConfigError> {
        if self.discord_token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        Ok(self)
    }

    /// Task periods, with any per-task overrides applied over the defaults.
    pub fn intervals(&self) -> TaskIntervals {
        let defaults = TaskIntervals::default();
        let pick = |secs: Option<u64>, default: Duration| {
            secs.map(Duration::from_secs).unwrap_or(default)
        };
        TaskIntervals {
            display: pick(self.display_interval_secs, defaults.display),
            presence: pick(self.presence_interval_secs, defaults.presence),
            notify: pick(self.notify_interval_secs, defaults.notify),
            counter: pick(self.counter_interval_secs, defaults.counter),
        }
    }
}
