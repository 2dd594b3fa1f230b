//! picframe Fetch - integrity-checked HTTP downloads
//!
//! Streams one HTTP GET into a file or a memory buffer while hashing it.
//!
//! # Contract
//!
//! - The response must be 2xx and carry the configured digest header
//!   (64 hex characters, optionally prefixed `sha256:`)
//! - The body is hashed chunk by chunk as it arrives
//! - A declared `Content-Length` must match the bytes received
//! - Only a body whose SHA-256 equals the declared digest is kept
//!
//! File downloads go to a temporary file beside the destination and are
//! renamed into place after verification. After any failure the destination
//! path does not exist.

mod config;
mod digest;
mod error;
mod sink;

pub use config::{FetchConfig, DEFAULT_DIGEST_HEADER, MIN_TIMEOUT_SECONDS};
pub use digest::{verify, DigestAccumulator, Sha256Digest, DIGEST_LEN};
pub use error::{FetchError, FetchErrorCategory};
pub use sink::{FileSink, GrowableBuffer};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name used when a URL has no usable last path segment
pub const FALLBACK_FILE_NAME: &str = "download.png";

/// Where a fetched body ends up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchDestination {
    File(PathBuf),
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub destination: FetchDestination,
}

impl FetchRequest {
    pub fn to_file(url: impl Into<String>, dest_path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: FetchDestination::File(dest_path.into()),
        }
    }

    pub fn to_memory(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            destination: FetchDestination::Memory,
        }
    }
}

/// A verified download committed to storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFetch {
    pub path: PathBuf,
    pub bytes_written: u64,
    /// Digest of the stored bytes, equal to the declared one
    pub digest: Sha256Digest,
}

/// A verified download held in memory. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBuffer {
    pub data: Vec<u8>,
    pub digest: Sha256Digest,
}

impl FetchedBuffer {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Stored(StoredFetch),
    Buffered(FetchedBuffer),
}

impl FetchResult {
    /// Bytes written to storage or held in memory
    pub fn len(&self) -> u64 {
        match self {
            FetchResult::Stored(stored) => stored.bytes_written,
            FetchResult::Buffered(buffer) => buffer.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn digest(&self) -> &Sha256Digest {
        match self {
            FetchResult::Stored(stored) => &stored.digest,
            FetchResult::Buffered(buffer) => &buffer.digest,
        }
    }
}

/// A 2xx response whose digest header has been parsed
struct OpenedResponse {
    response: reqwest::Response,
    expected: Sha256Digest,
    declared: Option<u64>,
}

/// HTTP client plus the fetch settings it was built from
#[derive(Debug, Clone)]
pub struct FetchPipeline {
    client: reqwest::Client,
    config: FetchConfig,
}

impl FetchPipeline {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let timeout_seconds = if config.timeout_seconds < MIN_TIMEOUT_SECONDS {
            tracing::warn!(
                "Fetch timeout of {}s is too short, using {}s",
                config.timeout_seconds,
                MIN_TIMEOUT_SECONDS
            );
            MIN_TIMEOUT_SECONDS
        } else {
            config.timeout_seconds
        };

        if config.accept_invalid_certs {
            tracing::warn!("TLS certificate verification is disabled for downloads");
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(timeout_seconds))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Run `request` against the sink it names
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, FetchError> {
        match &request.destination {
            FetchDestination::File(dest_path) => self
                .fetch_to_storage(&request.url, dest_path)
                .await
                .map(FetchResult::Stored),
            FetchDestination::Memory => self
                .fetch_to_memory(&request.url)
                .await
                .map(FetchResult::Buffered),
        }
    }

    /// Download `url` into `dest_path`, replacing it only after verification.
    ///
    /// On failure any previous file at `dest_path` is removed as well.
    pub async fn fetch_to_storage(
        &self,
        url: &str,
        dest_path: &Path,
    ) -> Result<StoredFetch, FetchError> {
        let result = self.stream_to_file(url, dest_path).await;
        if let Err(e) = &result {
            e.log_if_integrity_failure();
            tracing::warn!("Fetch of {} into {} failed: {}", url, dest_path.display(), e);
            sink::remove_stale(dest_path).await;
        }
        result
    }

    /// Download `url` into a buffer owned by the caller
    pub async fn fetch_to_memory(&self, url: &str) -> Result<FetchedBuffer, FetchError> {
        let result = self.stream_to_memory(url).await;
        if let Err(e) = &result {
            e.log_if_integrity_failure();
            tracing::warn!("Fetch of {} into memory failed: {}", url, e);
        }
        result
    }

    async fn stream_to_file(&self, url: &str, dest_path: &Path) -> Result<StoredFetch, FetchError> {
        let mut opened = self.open(url).await?;
        let mut sink = FileSink::create(dest_path).await?;
        let mut hasher = DigestAccumulator::new();

        loop {
            let received = hasher.bytes();
            let chunk = opened
                .response
                .chunk()
                .await
                .map_err(|source| body_error(url, opened.declared, received, source))?;
            let Some(chunk) = chunk else { break };

            self.check_limit(received + chunk.len() as u64)?;
            hasher.update(&chunk);
            sink.write_chunk(&chunk).await?;
        }

        let digest = finish(&opened, hasher)?;
        let bytes_written = sink.commit().await?;

        tracing::info!(
            "Downloaded {} bytes from {} to {} ({})",
            bytes_written,
            url,
            dest_path.display(),
            digest
        );

        Ok(StoredFetch {
            path: dest_path.to_path_buf(),
            bytes_written,
            digest,
        })
    }

    async fn stream_to_memory(&self, url: &str) -> Result<FetchedBuffer, FetchError> {
        let mut opened = self.open(url).await?;
        let mut buffer = match opened.declared {
            Some(declared) => {
                let hint = usize::try_from(declared)
                    .map_err(|_| FetchError::OutOfMemory { requested: usize::MAX })?;
                GrowableBuffer::with_capacity_hint(hint)?
            }
            None => GrowableBuffer::new(),
        };
        let mut hasher = DigestAccumulator::new();

        loop {
            let received = hasher.bytes();
            let chunk = opened
                .response
                .chunk()
                .await
                .map_err(|source| body_error(url, opened.declared, received, source))?;
            let Some(chunk) = chunk else { break };

            self.check_limit(received + chunk.len() as u64)?;
            hasher.update(&chunk);
            buffer.extend(&chunk)?;
        }

        let digest = finish(&opened, hasher)?;
        tracing::info!("Downloaded {} bytes from {} ({})", buffer.len(), url, digest);

        Ok(FetchedBuffer {
            data: buffer.into_vec(),
            digest,
        })
    }

    /// Send the request and validate status and headers. Nothing is written yet.
    async fn open(&self, url: &str) -> Result<OpenedResponse, FetchError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let header = self.config.digest_header.as_str();
        let raw = response.headers().get(header).ok_or_else(|| {
            FetchError::MissingIntegrityHeader {
                url: url.to_string(),
                header: header.to_string(),
            }
        })?;
        let value = raw
            .to_str()
            .map_err(|_| FetchError::MalformedIntegrityHeader {
                header: header.to_string(),
                value: String::from_utf8_lossy(raw.as_bytes()).into_owned(),
            })?;
        let expected = Sha256Digest::from_header(header, value)?;

        let declared = response.content_length();
        if let Some(declared) = declared {
            self.check_limit(declared)?;
        }

        Ok(OpenedResponse {
            response,
            expected,
            declared,
        })
    }

    fn check_limit(&self, total: u64) -> Result<(), FetchError> {
        match self.config.max_body_bytes {
            Some(limit) if total > limit => Err(FetchError::BodyTooLarge { limit }),
            _ => Ok(()),
        }
    }
}

/// A body that breaks off before its declared length is a size mismatch
fn body_error(url: &str, declared: Option<u64>, received: u64, source: reqwest::Error) -> FetchError {
    match declared {
        Some(declared) if received < declared && !source.is_timeout() => {
            FetchError::SizeMismatch { declared, received }
        }
        _ => FetchError::Transport {
            url: url.to_string(),
            source,
        },
    }
}

fn finish(opened: &OpenedResponse, hasher: DigestAccumulator) -> Result<Sha256Digest, FetchError> {
    let received = hasher.bytes();
    if let Some(declared) = opened.declared {
        if declared != received {
            return Err(FetchError::SizeMismatch { declared, received });
        }
    }

    let actual = hasher.finalize();
    verify(&opened.expected, &actual)?;
    Ok(actual)
}

/// Local path a download of `url` is stored at inside `download_dir`
pub fn destination_for(download_dir: &Path, url: &str) -> PathBuf {
    let name = reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_owned))
        })
        .filter(|name| name != "." && name != "..")
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());

    download_dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_for_uses_last_segment() {
        let dir = Path::new("/sdcard/downloads");
        assert_eq!(
            destination_for(dir, "https://photos.example.org/frame/latest.png?size=800"),
            dir.join("latest.png")
        );
        assert_eq!(
            destination_for(dir, "http://10.0.0.2:8080/gallery/"),
            dir.join("gallery")
        );
        assert_eq!(
            destination_for(dir, "http://10.0.0.2:8080/"),
            dir.join(FALLBACK_FILE_NAME)
        );
        assert_eq!(destination_for(dir, "not a url"), dir.join(FALLBACK_FILE_NAME));
    }

    #[test]
    fn test_fetch_result_accessors() {
        let buffer = FetchedBuffer {
            data: b"abc".to_vec(),
            digest: Sha256Digest::of(b"abc"),
        };
        let result = FetchResult::Buffered(buffer);
        assert_eq!(result.len(), 3);
        assert_eq!(result.digest(), &Sha256Digest::of(b"abc"));

        let request = FetchRequest::to_file("http://a/b.png", "/tmp/b.png");
        assert_eq!(
            request.destination,
            FetchDestination::File(PathBuf::from("/tmp/b.png"))
        );
    }

    #[test]
    fn test_pipeline_builds_with_short_timeout() {
        let config = FetchConfig {
            timeout_seconds: 1,
            ..Default::default()
        };
        let pipeline = FetchPipeline::new(config).unwrap();
        assert_eq!(pipeline.config().timeout_seconds, 1);
    }
}
