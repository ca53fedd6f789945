use std::io;

use thiserror::Error;

/// Why an upstream fetch produced no usable payload.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Upstream returned status {0}")]
    Status(u16),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Response superseded by a newer request")]
    Superseded,

    #[error("Upstream error: {0}")]
    Api(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Transport(e)
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Decode(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid dashboard config: {0}")]
    Toml(#[from] toml::de::Error),
}
