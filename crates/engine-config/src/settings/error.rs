use thiserror::Error;

/// Errors raised when loading or validating run settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A `.env` file line is not `KEY=VALUE`.
    #[error("Invalid env file: {0}")]
    EnvFile(String),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidEnv { key: String, value: String },

    #[error("Invalid setting: {0}")]
    Invalid(String),
}
