//! Error types for Parley

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("config error: {0}")]
    ConfigError(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("missing api key for {provider} (set {env_var})")]
    MissingApiKey { provider: String, env_var: String },

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("toml parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    pub fn missing_api_key(provider: impl Into<String>, env_var: impl Into<String>) -> Self {
        Self::MissingApiKey {
            provider: provider.into(),
            env_var: env_var.into(),
        }
    }
}
