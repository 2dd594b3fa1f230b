use std::path::PathBuf;
use thiserror::Error;

use super::ImageSource;
use crate::catalog::CatalogError;
use crate::fetch::{FetchError, FetchErrorCategory};

/// Failures that move the controller into its error screen
#[derive(Error, Debug)]
pub enum NavigationError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Network connection failed: {message}")]
    Network { message: String },

    #[error("No {kind} endpoint is configured")]
    MissingEndpoint { kind: ImageSource },

    #[error("No images found in {path}")]
    EmptyListing { path: PathBuf },

    #[error("No image folders found under {path}")]
    NoFolders { path: PathBuf },
}

impl NavigationError {
    /// Text for the error screen
    pub fn user_message(&self) -> String {
        match self {
            NavigationError::Catalog(e) => e.user_message(),
            NavigationError::Fetch(e) => match e.category() {
                FetchErrorCategory::Network => "Wi-Fi error: cannot reach the server".to_string(),
                _ => e.user_message(),
            },
            NavigationError::Network { .. } => "Wi-Fi connection failed".to_string(),
            NavigationError::MissingEndpoint { kind } => format!("No {kind} source configured"),
            NavigationError::EmptyListing { .. } => "No images in this folder".to_string(),
            NavigationError::NoFolders { .. } => "No image folders on the card".to_string(),
        }
    }
}
