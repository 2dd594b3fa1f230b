//! Fetch configuration types
//!
//! Lives under the `fetch:` section of the picframe config file:
//!
//! ```yaml
//! fetch:
//!   remote_url: https://photos.example.org/frame/latest.png
//!   network_url: http://192.168.1.20:8080/latest.png
//!   download_dir: /sdcard/downloads
//!   digest_header: X-Content-SHA256
//!   timeout_seconds: 30
//!   max_body_bytes: 33554432
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Header carrying the hex SHA-256 of the body unless configured otherwise
pub const DEFAULT_DIGEST_HEADER: &str = "X-Content-SHA256";

/// Shortest HTTP timeout accepted; smaller values are raised to this
pub const MIN_TIMEOUT_SECONDS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Endpoint used by the "remote" source button
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Endpoint used by the "network" source button
    #[serde(default)]
    pub network_url: Option<String>,

    /// Directory downloads are written to and then browsed from
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Response header holding the expected digest
    #[serde(default = "default_digest_header")]
    pub digest_header: String,

    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Largest body accepted; `null` disables the cap
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: Option<u64>,

    /// Skip TLS certificate verification (self-signed LAN servers)
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            network_url: None,
            download_dir: default_download_dir(),
            digest_header: default_digest_header(),
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            max_body_bytes: default_max_body_bytes(),
            accept_invalid_certs: false,
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_digest_header() -> String {
    DEFAULT_DIGEST_HEADER.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("picframe/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_body_bytes() -> Option<u64> {
    Some(32 * 1024 * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: FetchConfig =
            serde_yaml_ng::from_str("remote_url: https://example.org/a.png\nmax_body_bytes: null\n")
                .unwrap();

        assert_eq!(config.remote_url.as_deref(), Some("https://example.org/a.png"));
        assert_eq!(config.max_body_bytes, None);
        assert_eq!(config.digest_header, DEFAULT_DIGEST_HEADER);
        assert_eq!(config.timeout_seconds, 30);
        assert!(config.user_agent.starts_with("picframe/"));
        assert!(!config.accept_invalid_certs);
    }
}
