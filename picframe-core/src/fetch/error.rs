//! Fetch pipeline error types with distinguishable failure classes

use std::path::PathBuf;
use thiserror::Error;

/// Coarse grouping used to pick the message shown on the appliance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorCategory {
    /// Connection or read failure (usually Wi-Fi)
    Network,
    /// The server answered, but not with a usable response
    Server,
    /// The body did not match what the server declared
    Integrity,
    /// Local memory or storage could not hold the result
    Storage,
}

/// Every way a fetch can fail. No variant leaves a partial artifact behind.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection, TLS or read failure
    #[error("Transport error while fetching {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response
    #[error("Server returned HTTP {status} for {url}")]
    BadStatus { url: String, status: u16 },

    /// The digest header is absent
    #[error("Response from {url} has no {header} header; refusing unverifiable content")]
    MissingIntegrityHeader { url: String, header: String },

    /// The digest header is not 64 hex characters
    #[error("Malformed {header} header: expected 64 hex characters, got {value:?}")]
    MalformedIntegrityHeader { header: String, value: String },

    /// Declared Content-Length differs from the bytes received
    #[error("Size mismatch: server declared {declared} bytes but {received} were received")]
    SizeMismatch { declared: u64, received: u64 },

    /// Body digest differs from the declared digest
    #[error("Integrity verification failed!\nExpected: sha256:{expected}\nActual:   sha256:{actual}")]
    IntegrityMismatch { expected: String, actual: String },

    /// The memory sink could not grow
    #[error("Out of memory while buffering {requested} bytes")]
    OutOfMemory { requested: usize },

    /// The body is larger than the configured cap
    #[error("Response body exceeds the configured limit of {limit} bytes")]
    BodyTooLarge { limit: u64 },

    /// Local write, flush or rename failure
    #[error("Local I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn category(&self) -> FetchErrorCategory {
        match self {
            FetchError::Transport { .. } => FetchErrorCategory::Network,
            FetchError::BadStatus { .. }
            | FetchError::MissingIntegrityHeader { .. }
            | FetchError::MalformedIntegrityHeader { .. } => FetchErrorCategory::Server,
            FetchError::SizeMismatch { .. } | FetchError::IntegrityMismatch { .. } => {
                FetchErrorCategory::Integrity
            }
            FetchError::OutOfMemory { .. }
            | FetchError::BodyTooLarge { .. }
            | FetchError::Io { .. } => FetchErrorCategory::Storage,
        }
    }

    /// Short message for the appliance's error screen
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Transport { .. } => "Network error: check the Wi-Fi connection".to_string(),
            FetchError::BadStatus { status, .. } => format!("Server error (HTTP {status})"),
            FetchError::MissingIntegrityHeader { .. }
            | FetchError::MalformedIntegrityHeader { .. } => {
                "Server sent no valid checksum".to_string()
            }
            FetchError::SizeMismatch { .. } => "Download incomplete".to_string(),
            FetchError::IntegrityMismatch { .. } => "Download corrupted (checksum mismatch)".to_string(),
            FetchError::OutOfMemory { .. } => "Out of memory".to_string(),
            FetchError::BodyTooLarge { .. } => "Image too large".to_string(),
            FetchError::Io { .. } => "Storage write error".to_string(),
        }
    }

    /// Log integrity failures on the dedicated `integrity` target
    pub fn log_if_integrity_failure(&self) {
        if self.category() == FetchErrorCategory::Integrity {
            tracing::error!(target: "integrity", "DOWNLOAD REJECTED: {}", self);
        }
    }
}
