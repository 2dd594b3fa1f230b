//! Catalog error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by catalog listing and paging
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The directory could not be opened (missing, not a directory, no permission)
    #[error("Cannot open image directory: {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Enumeration failed part way through the directory
    #[error("Failed to read image directory: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `next_page` was called without a live cursor
    #[error("No open directory cursor; the catalog is exhausted or was never listed")]
    NoCursor,

    /// Not even a single entry could be reserved for the page
    #[error("Out of memory while building a catalog page")]
    OutOfMemory,
}

impl CatalogError {
    /// Short message suitable for the appliance's error screen
    pub fn user_message(&self) -> String {
        match self {
            CatalogError::Open { path, .. } => {
                format!("Cannot open folder {}", path.display())
            }
            CatalogError::Read { path, .. } => {
                format!("Storage read error in {}", path.display())
            }
            CatalogError::NoCursor => "No more images".to_string(),
            CatalogError::OutOfMemory => "Out of memory".to_string(),
        }
    }
}
