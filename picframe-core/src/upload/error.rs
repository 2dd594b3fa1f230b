//! Upload rejections and the HTTP status each one maps to

use thiserror::Error;

use crate::fetch::FetchError;

#[derive(Error, Debug)]
pub enum UploadError {
    /// The request head could not be parsed
    #[error("Malformed request: {reason}")]
    MalformedRequest { reason: String },

    /// No route for this method and path
    #[error("No handler for {method} {path}")]
    NotFound { method: String, path: String },

    #[error("Filename required")]
    MissingFileName,

    /// Missing or wrong `Authorization` header
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Content-Type must be one of: {expected}")]
    UnsupportedContentType { expected: String },

    /// No `Content-Length`; chunked bodies are not accepted
    #[error("Content-Length required")]
    LengthRequired,

    #[error("Payload too large: {declared} bytes exceeds the limit of {limit}")]
    PayloadTooLarge { declared: u64, limit: u64 },

    /// Nothing usable survived file name cleaning
    #[error("Invalid filename")]
    InvalidFileName,

    #[error("Only {expected} files allowed, got {name}")]
    DisallowedExtension { name: String, expected: String },

    /// The client stopped sending before the declared length
    #[error("Incomplete body: expected {declared} bytes, received {received}")]
    IncompleteBody { declared: u64, received: u64 },

    /// Writing or renaming the file failed
    #[error("Failed to store upload")]
    Storage {
        #[source]
        source: FetchError,
    },

    /// The socket failed while reading the request
    #[error("Connection error")]
    Connection {
        #[source]
        source: std::io::Error,
    },

    #[error("Request timed out")]
    Timeout,
}

impl UploadError {
    /// Status code sent back for this rejection
    pub fn status(&self) -> u16 {
        match self {
            UploadError::MalformedRequest { .. }
            | UploadError::MissingFileName
            | UploadError::UnsupportedContentType { .. }
            | UploadError::InvalidFileName
            | UploadError::DisallowedExtension { .. }
            | UploadError::IncompleteBody { .. } => 400,
            UploadError::Unauthorized => 401,
            UploadError::NotFound { .. } => 404,
            UploadError::Timeout => 408,
            UploadError::LengthRequired => 411,
            UploadError::PayloadTooLarge { .. } => 413,
            UploadError::Storage { .. } | UploadError::Connection { .. } => 500,
        }
    }
}
