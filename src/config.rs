//! Server configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! bind_address = "0.0.0.0:8080"
//! request_timeout_ms = 4000
//! read_timeout_secs = 240
//! write_timeout_secs = 240
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Settings owned by the [`Server`](crate::Server).
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// Listen address, e.g. `"0.0.0.0:8080"`.
    pub bind_address: String,

    /// Ceiling for the whole handling chain of one request. Applied to every
    /// route alike.
    pub request_timeout_ms: u64,

    /// Limit for reading one request: the head and then the whole body must
    /// each arrive within it, however slowly the client trickles bytes. Also
    /// bounds how long an idle connection may wait for its next request.
    pub read_timeout_secs: u64,

    /// How long a pending write to the client may stall.
    pub write_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_owned(),
            request_timeout_ms: 4_000,
            read_timeout_secs: 4 * 60,
            write_timeout_secs: 4 * 60,
        }
    }
}

impl Config {
    /// Parses and validates a TOML document.
    pub fn from_toml(src: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let src = std::fs::read_to_string(path)?;
        Self::from_toml(&src)
    }

    /// Semantic checks serde cannot express.
    pub fn validate(&self) -> Result<(), Error> {
        self.socket_addr()?;
        if self.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig("request_timeout_ms must be greater than zero"));
        }
        if self.read_timeout_secs == 0 || self.write_timeout_secs == 0 {
            return Err(Error::InvalidConfig("connection timeouts must be greater than zero"));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, Error> {
        self.bind_address
            .parse()
            .map_err(|_| Error::InvalidAddress(self.bind_address.clone()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}
