//! TOML-based settings for the diagnostic binary.
//!
//! The library itself takes a [`BridgeConfig`](crate::transport::BridgeConfig)
//! by construction; this module only maps a small settings file onto it for
//! the `adbtree` binary:
//!
//! ```toml
//! server_address = "127.0.0.1:5037"
//! log_level = "info"
//! ```
//!
//! Missing fields fall back to serde defaults, and a missing file yields the
//! defaults wholesale, so the binary works on first run without any setup.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::{BridgeConfig, DEFAULT_SERVER_ADDR};

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings could not be serialized to TOML.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The configured daemon address is not a valid socket address.
    #[error("invalid server address {address:?}: {source}")]
    BadServerAddress {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Settings stored on disk for the diagnostic binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Address of the bridge daemon's smart socket.
    #[serde(default = "default_server_address")]
    pub server_address: String,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_address: default_server_address(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Loads settings from a TOML file, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unreadable files or malformed TOML.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Ok(toml::from_str(&text)?)
    }

    /// Writes these settings as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if serialization or the write fails.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Builds the transport configuration from these settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BadServerAddress`] if the configured address
    /// does not parse.
    pub fn bridge_config(&self) -> Result<BridgeConfig, ConfigError> {
        let server_addr: SocketAddr =
            self.server_address
                .parse()
                .map_err(|source| ConfigError::BadServerAddress {
                    address: self.server_address.clone(),
                    source,
                })?;
        Ok(BridgeConfig { server_addr })
    }
}

fn default_server_address() -> String {
    DEFAULT_SERVER_ADDR.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
