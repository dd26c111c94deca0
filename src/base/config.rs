//! Load configuration via the `config` crate, persisting defaults on first run.

use std::{ops::Deref, path::Path, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::types::{ChatId, Res, Void};

/// Default path of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Default bot token placeholder.
fn default_token() -> String {
    "TOKEN_TG_BOT".to_string()
}

/// Default staff group chat id.
fn default_chat_id() -> i64 {
    1
}

/// Default greeting sent to a customer on first contact.
fn default_first_message() -> String {
    "Hello! Your message has been passed to our support team, we will reply here shortly.".to_string()
}

/// Default reply to the `/start` command.
fn default_start_message() -> String {
    "Please tell us your nickname and describe what you need help with.".to_string()
}

/// Default ticket inactivity threshold, in days.
fn default_expiry_day() -> u32 {
    15
}

/// Default path of the ticket database.
fn default_db_path() -> String {
    "tickets.db".to_string()
}

/// Default delay before the first expiry sweep, in seconds.
fn default_sweep_delay_secs() -> u64 {
    60
}

/// Default interval between expiry sweeps, in seconds.
fn default_sweep_interval_secs() -> u64 {
    6 * 60 * 60
}

/// Configuration for the support relay.
///
/// This is trivially cloneable and can be passed around without the need for `Mutex`.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConfigInner {
    /// Telegram bot token (`token`).
    #[serde(default = "default_token")]
    pub token: String,
    /// Chat id of the forum-enabled staff group (`chat_id`).
    #[serde(default = "default_chat_id")]
    pub chat_id: i64,
    /// Greeting sent to a customer when their ticket is opened (`first_message`).
    #[serde(default = "default_first_message")]
    pub first_message: String,
    /// Reply to the `/start` command (`start_message`).
    #[serde(default = "default_start_message")]
    pub start_message: String,
    /// Days of inactivity after which a ticket is expired (`expiry_day`).
    #[serde(default = "default_expiry_day")]
    pub expiry_day: u32,
    /// Path of the ticket database (`db_path`).
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Delay before the first expiry sweep, in seconds (`sweep_delay_secs`).
    #[serde(default = "default_sweep_delay_secs")]
    pub sweep_delay_secs: u64,
    /// Interval between expiry sweeps, in seconds (`sweep_interval_secs`).
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            token: default_token(),
            chat_id: default_chat_id(),
            first_message: default_first_message(),
            start_message: default_start_message(),
            expiry_day: default_expiry_day(),
            db_path: default_db_path(),
            sweep_delay_secs: default_sweep_delay_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl ConfigInner {
    /// The staff group as a chat identity.
    pub fn staff_chat_id(&self) -> ChatId {
        ChatId(self.chat_id)
    }

    pub fn sweep_delay(&self) -> Duration {
        Duration::from_secs(self.sweep_delay_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Config {
    /// Loads the configuration from a JSON file.
    ///
    /// A missing or unparseable file is not fatal: the defaults are written to
    /// `path` and used instead. Values that parse but make no sense are an error.
    pub fn load(explicit_path: Option<&Path>) -> Res<Self> {
        let path = explicit_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));

        let inner = match Self::read(path) {
            Ok(inner) => {
                info!("Loaded configuration from `{}`.", path.display());
                inner
            }
            Err(err) => {
                warn!("Could not load configuration from `{}`, using defaults: {}", path.display(), err);

                let inner = ConfigInner::default();
                if let Err(err) = Self::save(path, &inner) {
                    warn!("Could not write default configuration to `{}`: {}", path.display(), err);
                }
                inner
            }
        };

        let result = Config::from(inner);

        if result.expiry_day < 1 {
            return Err(anyhow::anyhow!("Ticket expiry must be at least one day."));
        }

        if result.sweep_interval_secs < 1 {
            return Err(anyhow::anyhow!("Sweep interval must be at least one second."));
        }

        Ok(result)
    }

    fn read(path: &Path) -> Res<ConfigInner> {
        let cfg = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Json).required(true))
            .build()?;

        Ok(cfg.try_deserialize()?)
    }

    fn save(path: &Path, inner: &ConfigInner) -> Void {
        let data = serde_json::to_string_pretty(inner)?;
        std::fs::write(path, data)?;

        Ok(())
    }
}

// Tests.
