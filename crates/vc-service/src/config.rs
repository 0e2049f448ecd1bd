//! Voice lifecycle service configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use common::secret::SecretString;
use common::types::{CategoryId, RoomId};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address (health, metrics and dashboard API).
pub const DEFAULT_HTTP_BIND_ADDRESS: &str = "0.0.0.0:8081";

/// Default delay between a room emptying and the empty-room warning.
pub const DEFAULT_FIRST_EMPTY_NOTICE_SECONDS: u64 = 10;

/// Default delay between the empty-room warning and room deletion.
pub const DEFAULT_FINAL_DELETE_SECONDS: u64 = 20;

/// Default session history database.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://vc_sessions.db?mode=rwc";

/// Default text command prefix (`!team`).
pub const DEFAULT_COMMAND_PREFIX: &str = "!";

/// Service configuration.
///
/// Loaded from environment variables with sensible defaults.
/// Sensitive fields are redacted in Debug output.
#[derive(Clone)]
pub struct Config {
    /// Gateway bot token.
    /// Protected by `SecretString` to prevent accidental logging.
    pub bot_token: SecretString,

    /// Entry-point room whose joins trigger personal room provisioning.
    pub base_room_id: RoomId,

    /// Category whose rooms (except the base room) are lifecycle-managed.
    pub category_id: CategoryId,

    /// Text channel receiving session start/end notices.
    pub notice_channel_id: u64,

    /// Seconds an empty room waits before the warning notice (default: 10).
    pub first_empty_notice_seconds: u64,

    /// Seconds between the warning notice and deletion (default: 20).
    pub final_delete_seconds: u64,

    /// Session history database URL (default: "sqlite://vc_sessions.db?mode=rwc").
    pub database_url: String,

    /// HTTP bind address for health, metrics and dashboard (default: "0.0.0.0:8081").
    pub http_bind_address: String,

    /// Prefix for text commands (default: "!").
    pub command_prefix: String,

    /// Emit logs as JSON lines.
    pub log_json: bool,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"[REDACTED]")
            .field("base_room_id", &self.base_room_id)
            .field("category_id", &self.category_id)
            .field("notice_channel_id", &self.notice_channel_id)
            .field(
                "first_empty_notice_seconds",
                &self.first_empty_notice_seconds,
            )
            .field("final_delete_seconds", &self.final_delete_seconds)
            .field("database_url", &self.database_url)
            .field("http_bind_address", &self.http_bind_address)
            .field("command_prefix", &self.command_prefix)
            .field("log_json", &self.log_json)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bot_token = SecretString::from(
            vars.get("VC_BOT_TOKEN")
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar("VC_BOT_TOKEN".to_string()))?
                .clone(),
        );

        let base_room_id = RoomId::new(required_id(vars, "VC_BASE_ROOM_ID")?);
        let category_id = CategoryId::new(required_id(vars, "VC_CATEGORY_ID")?);
        let notice_channel_id = required_id(vars, "VC_NOTICE_CHANNEL_ID")?;

        let first_empty_notice_seconds = vars
            .get("VC_FIRST_EMPTY_NOTICE_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_FIRST_EMPTY_NOTICE_SECONDS);

        let final_delete_seconds = vars
            .get("VC_FINAL_DELETE_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_FINAL_DELETE_SECONDS);

        let database_url = vars
            .get("VC_DATABASE_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let http_bind_address = vars
            .get("VC_HTTP_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HTTP_BIND_ADDRESS.to_string());

        let command_prefix = vars
            .get("VC_COMMAND_PREFIX")
            .filter(|p| !p.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string());

        let log_json = vars
            .get("VC_LOG_JSON")
            .is_some_and(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"));

        Ok(Config {
            bot_token,
            base_room_id,
            category_id,
            notice_channel_id,
            first_empty_notice_seconds,
            final_delete_seconds,
            database_url,
            http_bind_address,
            command_prefix,
            log_json,
        })
    }

    /// Delay before the empty-room warning.
    #[must_use]
    pub fn first_empty_notice(&self) -> Duration {
        Duration::from_secs(self.first_empty_notice_seconds)
    }

    /// Delay between the warning and deletion.
    #[must_use]
    pub fn final_delete(&self) -> Duration {
        Duration::from_secs(self.final_delete_seconds)
    }
}

/// Snowflake ids must be present and non-zero.
fn required_id(vars: &HashMap<String, String>, key: &str) -> Result<u64, ConfigError> {
    let raw = vars
        .get(key)
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;

    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidValue(format!(
            "{key} must be a non-zero numeric id"
        ))),
        Ok(id) => Ok(id),
    }
}
