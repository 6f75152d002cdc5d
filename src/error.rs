//! Unified error type.

use thiserror::Error;

/// The error type returned by strata's fallible operations.
///
/// Application-level failures (404, 500, timeouts) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: loading configuration, binding to a port or
/// accepting a connection.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{0}`")]
    InvalidAddress(String),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),

    #[error("asset manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}
