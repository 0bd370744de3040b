pub mod env;
pub mod error;

use env::EnvManager;
use error::SettingsError;
use model::execution::connection::ConnectionSettings;
use serde::{Deserialize, Serialize};
use std::{path::Path, str::FromStr, time::Duration};
use tracing::debug;

pub const ENV_DB_HOST: &str = "XMLMIG_DB_HOST";
pub const ENV_DB_PORT: &str = "XMLMIG_DB_PORT";
pub const ENV_DB_NAME: &str = "XMLMIG_DB_NAME";
pub const ENV_DB_USER: &str = "XMLMIG_DB_USER";
pub const ENV_DB_PASSWORD: &str = "XMLMIG_DB_PASSWORD";
pub const ENV_DB_TRUST_CERT: &str = "XMLMIG_DB_TRUST_CERT";
pub const ENV_WORKERS: &str = "XMLMIG_WORKERS";

/// Run-time knobs for one migration run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub workers: usize,
    pub item_timeout_secs: u64,
    pub queue_capacity: usize,
    /// Stop after this many source records.
    pub limit: Option<usize>,
    /// Resume point for keyset pagination.
    pub start_after_app_id: Option<i64>,
    pub source_page_size: usize,
    /// Log progress every N completed items.
    pub progress_interval: usize,
    /// How many failed identifiers the summary lists.
    pub max_failed_listed: usize,
    pub dry_run: bool,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub connection: ConnectionSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workers: 4,
            item_timeout_secs: 120,
            queue_capacity: 256,
            limit: None,
            start_after_app_id: None,
            source_page_size: 500,
            progress_interval: 100,
            max_failed_listed: 50,
            dry_run: false,
            retry_attempts: 3,
            retry_base_delay_ms: 200,
            connection: ConnectionSettings::default(),
        }
    }
}

impl Settings {
    /// Reads the JSON file (or starts from defaults), applies environment
    /// overrides and validates the result.
    pub fn load(path: Option<&Path>, env: &EnvManager) -> Result<Self, SettingsError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(env)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn apply_env(&mut self, env: &EnvManager) -> Result<(), SettingsError> {
        let conn = &mut self.connection;
        override_string(env, ENV_DB_HOST, &mut conn.host);
        override_parsed(env, ENV_DB_PORT, &mut conn.port)?;
        override_string(env, ENV_DB_NAME, &mut conn.database);
        override_string(env, ENV_DB_USER, &mut conn.user);
        override_string(env, ENV_DB_PASSWORD, &mut conn.password);
        override_parsed(env, ENV_DB_TRUST_CERT, &mut conn.trust_cert)?;
        override_parsed(env, ENV_WORKERS, &mut self.workers)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.workers == 0 {
            return Err(SettingsError::Invalid("workers must be at least 1".into()));
        }
        if self.item_timeout_secs == 0 {
            return Err(SettingsError::Invalid("item_timeout_secs must be positive".into()));
        }
        if self.source_page_size == 0 {
            return Err(SettingsError::Invalid("source_page_size must be positive".into()));
        }
        if self.queue_capacity == 0 {
            return Err(SettingsError::Invalid("queue_capacity must be positive".into()));
        }
        Ok(())
    }

    pub fn item_timeout(&self) -> Duration {
        Duration::from_secs(self.item_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

fn override_string(env: &EnvManager, key: &str, target: &mut String) {
    if let Some(value) = env.get(key) {
        debug!(key, value = %env.display_value(key), "Applying environment override");
        *target = value.to_string();
    }
}

fn override_parsed<T: FromStr>(
    env: &EnvManager,
    key: &str,
    target: &mut T,
) -> Result<(), SettingsError> {
    if let Some(value) = env.get(key) {
        *target = value.trim().parse().map_err(|_| SettingsError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
        })?;
        debug!(key, value, "Applying environment override");
    }
    Ok(())
}
