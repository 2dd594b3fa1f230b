//! Upload server configuration
//!
//! Lives under the `upload:` section of the picframe config file:
//!
//! ```yaml
//! upload:
//!   listen: 0.0.0.0:8080
//!   upload_dir: /sdcard/upload
//!   auth_token_sha256: 9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08
//!   max_bytes: 4194304
//!   content_types: [image/bmp]
//!   extensions: [bmp]
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::ExtensionFilter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Socket address the server binds to
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Where accepted files land; `<media_root>/upload` when unset
    #[serde(default)]
    pub upload_dir: Option<PathBuf>,

    /// Hex SHA-256 of the expected `Authorization` header value.
    /// When unset every upload is accepted.
    #[serde(default)]
    pub auth_token_sha256: Option<String>,

    /// Largest body accepted, in bytes
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,

    /// Accepted `Content-Type` values, compared case-insensitively
    #[serde(default = "default_content_types")]
    pub content_types: Vec<String>,

    /// Accepted file name extensions
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Time allowed for one request, head and body included
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            upload_dir: None,
            auth_token_sha256: None,
            max_bytes: default_max_bytes(),
            content_types: default_content_types(),
            extensions: default_extensions(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl UploadConfig {
    pub fn filter(&self) -> ExtensionFilter {
        ExtensionFilter::new(&self.extensions)
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_bytes() -> u64 {
    4 * 1024 * 1024
}

fn default_content_types() -> Vec<String> {
    vec!["image/bmp".to_string()]
}

fn default_extensions() -> Vec<String> {
    vec!["bmp".to_string()]
}

fn default_request_timeout() -> u64 {
    30
}
