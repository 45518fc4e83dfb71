//! Typed error enums for each fallible subsystem.

use thiserror::Error;

/// Errors raised by the merge engine's public contract.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MergeError {
    #[error("port {0} has no free source slot and no matching key to refresh")]
    Full(u8),
    #[error("port {0} is not configured (expected 1 or 2)")]
    InvalidPort(u8),
}

/// Errors raised while loading or validating a [`crate::config::BridgeConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("timeout_ms must be > 0")]
    InvalidTimeout,
}

/// Errors raised by the stand-in [`crate::dmx_sink::DmxSink`] implementations.
#[derive(Debug, Error)]
pub enum DmxSinkError {
    #[error("dmx sink I/O error on port {port}: {source}")]
    Io {
        port: u8,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error type for the binary's `main`.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
