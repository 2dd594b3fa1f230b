//! picframe configuration
//!
//! ## Configuration Sources (in precedence order)
//!
//! 1. An explicit path (`--config`)
//! 2. The `PICFRAME_CONFIG` environment variable
//! 3. `.picframe/config.yaml` - Project-level config
//! 4. `~/.config/picframe/config.yaml` - Global config (platform dependent)
//! 5. Built-in defaults
//!
//! The first source found wins; sections are not merged across files.
//! Explicit paths must parse. A discovered file that fails to parse is
//! reported and replaced by the defaults.
//!
//! ```yaml
//! display:
//!   width: 1024
//!   height: 600
//!   orientation: landscape
//! catalog:
//!   media_root: /sdcard
//!   page_size: 20
//! gestures:
//!   multi_touch: exit
//! upload:
//!   listen: 0.0.0.0:8080
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::catalog::{ExtensionFilter, DEFAULT_EXTENSIONS};
use crate::catalog::folders::DEFAULT_EXCLUDED_FOLDERS;
use crate::fetch::{FetchConfig, Sha256Digest};
use crate::navigation::gesture::GestureConfig;
use crate::navigation::input::DEFAULT_QUEUE_CAPACITY;
use crate::navigation::layout::Orientation;
use crate::upload::UploadConfig;

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "PICFRAME_CONFIG";

/// Project-level config file, relative to the working directory
pub const PROJECT_CONFIG_PATH: &str = ".picframe/config.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PicframeConfig {
    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub gestures: GestureConfig,

    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub upload: UploadConfig,
}

/// Panel size and margins in native landscape terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_width")]
    pub width: u16,

    #[serde(default = "default_height")]
    pub height: u16,

    #[serde(default = "default_side_margin")]
    pub margin_left: u16,

    #[serde(default = "default_side_margin")]
    pub margin_right: u16,

    #[serde(default)]
    pub margin_top: u16,

    #[serde(default)]
    pub margin_bottom: u16,

    /// Orientation at startup
    #[serde(default)]
    pub orientation: Orientation,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            margin_left: default_side_margin(),
            margin_right: default_side_margin(),
            margin_top: 0,
            margin_bottom: 0,
            orientation: Orientation::default(),
        }
    }
}

fn default_width() -> u16 {
    1024
}

fn default_height() -> u16 {
    600
}

fn default_side_margin() -> u16 {
    120
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Mount point holding one sub-directory per image folder
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,

    /// Extensions listed by the catalog, matched case-insensitively
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Entries held in memory at once
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Folders never offered on the folder screen
    #[serde(default = "default_excluded_folders")]
    pub excluded_folders: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            media_root: default_media_root(),
            extensions: default_extensions(),
            page_size: default_page_size(),
            excluded_folders: default_excluded_folders(),
        }
    }
}

impl CatalogConfig {
    pub fn filter(&self) -> ExtensionFilter {
        ExtensionFilter::new(&self.extensions)
    }
}

fn default_media_root() -> PathBuf {
    PathBuf::from("/sdcard")
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_page_size() -> usize {
    20
}

fn default_excluded_folders() -> Vec<String> {
    DEFAULT_EXCLUDED_FOLDERS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Contact reports buffered between capture and navigation
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How long the navigation loop waits for input per iteration
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_poll_interval_ms() -> u64 {
    50
}

impl PicframeConfig {
    /// Load from the first available source
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        Self::load_with(
            explicit,
            env_path.as_deref(),
            Path::new(PROJECT_CONFIG_PATH),
            global_config_path().as_deref(),
        )
    }

    /// [`load`](Self::load) with every source location supplied by the caller
    pub fn load_with(
        explicit: Option<&Path>,
        env_path: Option<&Path>,
        project_path: &Path,
        global_path: Option<&Path>,
    ) -> Result<Self> {
        if let Some(path) = explicit {
            tracing::debug!("Loading config from --config {}", path.display());
            return Self::from_file(path);
        }

        if let Some(path) = env_path {
            tracing::debug!("Loading config from {} {}", CONFIG_ENV_VAR, path.display());
            return Self::from_file(path)
                .with_context(|| format!("Invalid config named by {CONFIG_ENV_VAR}"));
        }

        let discovered = std::iter::once(project_path)
            .chain(global_path)
            .find(|path| path.is_file());

        let Some(path) = discovered else {
            tracing::debug!("No config file found, using defaults");
            return Ok(Self::default());
        };

        match Self::from_file(path) {
            Ok(config) => {
                tracing::debug!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) => {
                tracing::warn!("Ignoring config {}: {:#}", path.display(), e);
                Ok(Self::default())
            }
        }
    }

    /// Read, parse and validate one YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document means "all defaults"
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml_ng::from_str(content).context("Invalid YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.catalog.page_size == 0 {
            anyhow::bail!("catalog.page_size must be at least 1");
        }
        if self.catalog.filter().is_empty() {
            anyhow::bail!("catalog.extensions must name at least one extension");
        }
        if self.input.queue_capacity == 0 {
            anyhow::bail!("input.queue_capacity must be at least 1");
        }
        if self.input.poll_interval_ms == 0 {
            anyhow::bail!("input.poll_interval_ms must be at least 1");
        }
        if !(self.gestures.pinch_threshold > 0.0) {
            anyhow::bail!("gestures.pinch_threshold must be positive");
        }
        if !(self.gestures.pan_threshold > 0.0) {
            anyhow::bail!("gestures.pan_threshold must be positive");
        }
        if self.display.width == 0 || self.display.height == 0 {
            anyhow::bail!("display.width and display.height must be non-zero");
        }
        if self.fetch.digest_header.trim().is_empty() {
            anyhow::bail!("fetch.digest_header must not be empty");
        }
        if let Some(token) = &self.upload.auth_token_sha256 {
            if Sha256Digest::parse_hex(token).is_none() {
                anyhow::bail!("upload.auth_token_sha256 must be 64 hex characters");
            }
        }
        if self.upload.max_bytes == 0 {
            anyhow::bail!("upload.max_bytes must be at least 1");
        }
        if self.upload.filter().is_empty() || self.upload.content_types.is_empty() {
            anyhow::bail!("upload.extensions and upload.content_types must not be empty");
        }
        Ok(())
    }

    /// Upload destination, defaulting to `<media_root>/upload`
    pub fn upload_dir(&self) -> PathBuf {
        self.upload
            .upload_dir
            .clone()
            .unwrap_or_else(|| self.catalog.media_root.join("upload"))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml_ng::to_string(self).context("Failed to serialize config")
    }
}

/// Platform config file, e.g. `~/.config/picframe/config.yaml` on Linux
pub fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "picframe", "picframe")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
}
