//! Error types for option loading and validation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("you need both a certificate and a key in order to use TLS")]
    TlsPairIncomplete,

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("bundle id must not be empty")]
    EmptyBundleId,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::InvalidValue(err.to_string())
    }
}
