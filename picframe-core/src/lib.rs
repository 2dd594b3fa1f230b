//! picframe Core - catalog, fetch and navigation for a touch-screen photo frame
//!
//! - [`catalog`]: bounded, sorted, resumable directory listings
//! - [`fetch`]: streaming HTTP downloads verified against a SHA-256 header
//! - [`navigation`]: the state machine turning touch input into paging,
//!   downloads and display commands
//! - [`upload`]: a small HTTP server storing posted images in the upload folder
//! - [`config`]: YAML configuration shared by all of the above

pub mod catalog;
pub mod config;
pub mod fetch;
pub mod navigation;
pub mod upload;

pub use catalog::{Catalog, CatalogEntry, CatalogError, CatalogPage, ExtensionFilter};
pub use config::PicframeConfig;
pub use fetch::{FetchConfig, FetchError, FetchPipeline};
pub use navigation::{NavigationController, NavigationError, NavigationState};
pub use upload::{UploadConfig, UploadError, UploadServer};
