use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace directory - computed from home, not serialized
    #[serde(skip)]
    pub workspace_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub telegram: Option<TelegramConfig>,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub sessions: SessionConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_dir: PathBuf::from("."),
            config_path: PathBuf::from("config.toml"),
            telegram: None,
            storage: StorageConfig::default(),
            sessions: SessionConfig::default(),
            reliability: ReliabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.max_image_bytes == 0 {
            return Err(ConfigError::Validation(
                "storage.max_image_bytes must be greater than zero".into(),
            ));
        }
        let name = self.sessions.document_name.trim();
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(ConfigError::Validation(format!(
                "sessions.document_name {name:?} is not a plain file name"
            )));
        }
        if self.sessions.idle_ttl_secs > 0 && self.sessions.sweep_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "sessions.sweep_interval_secs must be greater than zero when idle_ttl_secs is set"
                    .into(),
            ));
        }
        if self.sessions.lane_idle_secs == 0 {
            return Err(ConfigError::Validation(
                "sessions.lane_idle_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Telegram settings, required to run the bot.
    pub fn require_telegram(&self) -> Result<&TelegramConfig, ConfigError> {
        match &self.telegram {
            Some(telegram) if !telegram.bot_token.trim().is_empty() => Ok(telegram),
            _ => Err(ConfigError::Validation(format!(
                "telegram.bot_token is not set; add it to {} or export TELEGRAM_BOT_TOKEN",
                self.config_path.display()
            ))),
        }
    }

    /// Directory holding per-conversation namespaces.
    #[must_use]
    pub fn storage_dir(&self) -> PathBuf {
        self.storage.resolve_dir(&self.workspace_dir)
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    #[serde(default = "default_allowed_users")]
    pub allowed_users: Vec<String>,
    /// Bot API server, defaults to `https://api.telegram.org`.
    #[serde(default)]
    pub api_base: Option<String>,
}

fn default_allowed_users() -> Vec<String> {
    vec!["*".into()]
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            allowed_users: default_allowed_users(),
            api_base: None,
        }
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("allowed_users", &self.allowed_users)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root for staged files; defaults to `<workspace>/temp`.
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
    /// Delete namespaces left over from a previous run at startup.
    #[serde(default = "default_true")]
    pub purge_on_start: bool,
}

fn default_max_image_bytes() -> u64 {
    DEFAULT_MAX_IMAGE_BYTES
}

fn default_true() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            max_image_bytes: default_max_image_bytes(),
            purge_on_start: true,
        }
    }
}

impl StorageConfig {
    #[must_use]
    pub fn resolve_dir(&self, workspace_dir: &Path) -> PathBuf {
        match self.dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => workspace_dir.join("temp"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Expire sessions idle for this long. `0` keeps sessions until
    /// generated or cancelled.
    #[serde(default)]
    pub idle_ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// How long a conversation's dispatch lane stays alive without events.
    #[serde(default = "default_lane_idle_secs")]
    pub lane_idle_secs: u64,
    #[serde(default = "default_document_name")]
    pub document_name: String,
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_lane_idle_secs() -> u64 {
    300
}

fn default_document_name() -> String {
    "images.pdf".into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: 0,
            sweep_interval_secs: default_sweep_interval_secs(),
            lane_idle_secs: default_lane_idle_secs(),
            document_name: default_document_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    #[serde(default = "default_channel_backoff_secs")]
    pub channel_initial_backoff_secs: u64,
    #[serde(default = "default_channel_backoff_max_secs")]
    pub channel_max_backoff_secs: u64,
}

fn default_channel_backoff_secs() -> u64 {
    2
}

fn default_channel_backoff_max_secs() -> u64 {
    60
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            channel_initial_backoff_secs: default_channel_backoff_secs(),
            channel_max_backoff_secs: default_channel_backoff_max_secs(),
        }
    }
}
