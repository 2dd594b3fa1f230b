//! picframe Upload - receive images over the local network
//!
//! A small HTTP server that serves an upload page and stores posted images
//! in the upload folder, where the catalog picks them up like any other
//! image folder.
//!
//! ```text
//! GET  /                 upload page
//! POST /upload/<name>    store the body as <upload_dir>/<clean name>
//! ```
//!
//! Checks run in this order and stop at the first failure:
//!
//! | Check                                   | Status |
//! |-----------------------------------------|--------|
//! | file name present in the path           | 400    |
//! | `Authorization` hashes to the token     | 401    |
//! | `Content-Type` is accepted              | 400    |
//! | `Content-Length` present                | 411    |
//! | declared length within `max_bytes`      | 413    |
//! | cleaned name not empty                  | 400    |
//! | cleaned name has an accepted extension  | 400    |
//!
//! The body is streamed into a temporary file beside the destination and
//! renamed into place once every byte has arrived, so a failed upload never
//! leaves a partial file behind.

mod config;
mod error;
pub mod http;

pub use config::UploadConfig;
pub use error::UploadError;
pub use http::{read_request_head, RequestHead, Response};

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::catalog::ExtensionFilter;
use crate::config::PicframeConfig;
use crate::fetch::{FileSink, Sha256Digest};

/// Path prefix of the upload route
pub const UPLOAD_ROUTE: &str = "/upload/";

/// Longest file name kept after cleaning
pub const MAX_FILE_NAME_LEN: usize = 63;

/// Most unread body bytes discarded after a rejection
const DRAIN_LIMIT: u64 = 64 * 1024;

const COPY_CHUNK: usize = 8 * 1024;

/// Served at `/`
pub const UPLOAD_PAGE: &str = r#"<!DOCTYPE html>
<html><body><h2>Upload to picframe</h2>
<input id="file" type="file"><button onclick="u()">Upload</button>
<p id="status"></p>
<script>
function u() {
  var f = document.getElementById('file').files[0];
  if (!f) { alert('No file'); return; }
  var x = new XMLHttpRequest();
  x.onload = function () { document.getElementById('status').textContent = x.status + ' ' + x.responseText; };
  x.open('POST', '/upload/' + encodeURIComponent(f.name), true);
  x.setRequestHeader('Content-Type', f.type || 'application/octet-stream');
  x.send(f);
}
</script></body></html>
"#;

/// Keep ASCII letters, digits, `_`, `-` and `.`; drop path separators and
/// every `..` pair. The result is cut to [`MAX_FILE_NAME_LEN`] characters.
pub fn sanitize_file_name(raw: &str) -> String {
    let mut clean = String::with_capacity(raw.len().min(MAX_FILE_NAME_LEN));
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if clean.len() == MAX_FILE_NAME_LEN {
            break;
        }
        match c {
            '/' | '\\' => {}
            '.' if chars.peek() == Some(&'.') => {
                chars.next();
            }
            c if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') => clean.push(c),
            _ => {}
        }
    }

    clean
}

/// A file stored by a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// Validates and stores one request at a time; shared by every connection
#[derive(Debug)]
pub struct UploadHandler {
    upload_dir: PathBuf,
    token_digest: Option<Sha256Digest>,
    max_bytes: u64,
    content_types: Vec<String>,
    filter: ExtensionFilter,
}

impl UploadHandler {
    pub fn new(config: &UploadConfig, upload_dir: impl Into<PathBuf>) -> Result<Self> {
        let token_digest = config
            .auth_token_sha256
            .as_deref()
            .map(|hex| {
                Sha256Digest::parse_hex(hex)
                    .context("upload.auth_token_sha256 must be 64 hex characters")
            })
            .transpose()?;

        Ok(Self {
            upload_dir: upload_dir.into(),
            token_digest,
            max_bytes: config.max_bytes,
            content_types: config.content_types.clone(),
            filter: config.filter(),
        })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Compare the SHA-256 of the `Authorization` value with the configured
    /// token digest. Without a configured digest everything passes.
    pub fn authorize(&self, authorization: Option<&str>) -> Result<(), UploadError> {
        let Some(expected) = &self.token_digest else {
            return Ok(());
        };
        match authorization {
            Some(value) if Sha256Digest::of(value.as_bytes()) == *expected => Ok(()),
            _ => Err(UploadError::Unauthorized),
        }
    }

    /// Route one request and turn the outcome into a response.
    ///
    /// `body` is positioned just after the request head.
    pub async fn respond<R>(&self, head: &RequestHead, body: &mut R) -> Response
    where
        R: AsyncBufRead + Unpin,
    {
        let result = match (head.method.as_str(), head.path.as_str()) {
            ("GET", "/") => return Response::html(UPLOAD_PAGE),
            ("POST", path) if path.starts_with(UPLOAD_ROUTE) => {
                self.receive(head, &path[UPLOAD_ROUTE.len()..], body).await
            }
            (method, path) => Err(UploadError::NotFound {
                method: method.to_string(),
                path: path.to_string(),
            }),
        };

        match result {
            Ok(stored) => {
                info!(
                    "Stored upload {} ({} bytes)",
                    stored.path.display(),
                    stored.bytes_written
                );
                Response::text(200, "OK")
            }
            Err(e) => {
                warn!("Rejected {} {}: {}", head.method, head.path, e);
                Response::from_error(&e)
            }
        }
    }

    /// Run every check, then stream the body to disk
    async fn receive<R>(
        &self,
        head: &RequestHead,
        raw_name: &str,
        body: &mut R,
    ) -> Result<StoredUpload, UploadError>
    where
        R: AsyncBufRead + Unpin,
    {
        let declared = head.content_length()?;
        let mut limited = body.take(declared.unwrap_or(0));

        let result = self.check_and_store(head, raw_name, declared, &mut limited).await;
        if result.is_err() && limited.limit() > 0 {
            let mut rest = (&mut limited).take(DRAIN_LIMIT);
            let drained = tokio::io::copy(&mut rest, &mut tokio::io::sink())
                .await
                .unwrap_or(0);
            debug!("Discarded {} unread body bytes", drained);
        }
        result
    }

    async fn check_and_store<R>(
        &self,
        head: &RequestHead,
        raw_name: &str,
        declared: Option<u64>,
        body: &mut R,
    ) -> Result<StoredUpload, UploadError>
    where
        R: AsyncRead + Unpin,
    {
        // Query strings are not part of the name
        let raw_name = raw_name.split('?').next().unwrap_or_default();
        if raw_name.is_empty() {
            return Err(UploadError::MissingFileName);
        }

        self.authorize(head.header("Authorization"))?;

        let content_type = head
            .header("Content-Type")
            .and_then(|value| value.split(';').next())
            .map(str::trim)
            .unwrap_or_default();
        if !self
            .content_types
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(content_type))
        {
            return Err(UploadError::UnsupportedContentType {
                expected: self.content_types.join(", "),
            });
        }

        let declared = declared.ok_or(UploadError::LengthRequired)?;
        if declared > self.max_bytes {
            return Err(UploadError::PayloadTooLarge {
                declared,
                limit: self.max_bytes,
            });
        }

        let name = sanitize_file_name(raw_name);
        if name.is_empty() {
            return Err(UploadError::InvalidFileName);
        }
        if !self.filter.matches(&name) {
            return Err(UploadError::DisallowedExtension {
                name,
                expected: self.filter.extensions().join(", "),
            });
        }

        let dest = self.upload_dir.join(&name);
        let bytes_written = store(body, &dest, declared).await?;
        Ok(StoredUpload {
            path: dest,
            bytes_written,
        })
    }
}

/// Copy exactly `declared` bytes from `body` into `dest`
async fn store<R>(body: &mut R, dest: &Path, declared: u64) -> Result<u64, UploadError>
where
    R: AsyncRead + Unpin,
{
    let mut sink = FileSink::create(dest)
        .await
        .map_err(|source| UploadError::Storage { source })?;
    let mut buf = vec![0u8; COPY_CHUNK];

    while sink.bytes_written() < declared {
        let read = body
            .read(&mut buf)
            .await
            .map_err(|source| UploadError::Connection { source })?;
        if read == 0 {
            // Dropping the sink removes the temporary file
            return Err(UploadError::IncompleteBody {
                declared,
                received: sink.bytes_written(),
            });
        }
        sink.write_chunk(&buf[..read])
            .await
            .map_err(|source| UploadError::Storage { source })?;
    }

    sink.commit()
        .await
        .map_err(|source| UploadError::Storage { source })
}

/// Accept loop around an [`UploadHandler`]
pub struct UploadServer {
    listener: TcpListener,
    handler: Arc<UploadHandler>,
    request_timeout: Duration,
}

impl UploadServer {
    /// Bind `config.upload.listen`. Uploads go to `upload.upload_dir`, or
    /// `<media_root>/upload` when that is unset.
    pub async fn bind(config: &PicframeConfig) -> Result<Self> {
        let handler = UploadHandler::new(&config.upload, config.upload_dir())?;
        let listener = TcpListener::bind(&config.upload.listen)
            .await
            .with_context(|| format!("Failed to listen on {}", config.upload.listen))?;

        if handler.token_digest.is_none() {
            warn!("Upload server accepts unauthenticated uploads");
        }
        info!(
            "Upload server on {} storing into {}",
            listener.local_addr()?,
            handler.upload_dir.display()
        );

        Ok(Self {
            listener,
            handler: Arc::new(handler),
            request_timeout: Duration::from_secs(config.upload.request_timeout_seconds.max(1)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read listening address")
    }

    pub fn handler(&self) -> &UploadHandler {
        &self.handler
    }

    /// Serve until the listener fails
    pub async fn run(self) -> Result<()> {
        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .context("Failed to accept connection")?;
            let handler = Arc::clone(&self.handler);
            let request_timeout = self.request_timeout;

            tokio::spawn(async move {
                if let Err(e) = serve_connection(&handler, stream, request_timeout).await {
                    debug!("Connection from {} ended: {:#}", peer, e);
                }
            });
        }
    }
}

/// Handle the single request on `stream` and close it
async fn serve_connection(
    handler: &UploadHandler,
    stream: TcpStream,
    request_timeout: Duration,
) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let exchange = async {
        match read_request_head(&mut reader).await {
            Ok(Some(head)) => {
                debug!("{} {}", head.method, head.path);
                Some(handler.respond(&head, &mut reader).await)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Bad request: {}", e);
                Some(Response::from_error(&e))
            }
        }
    };

    let response = match tokio::time::timeout(request_timeout, exchange).await {
        Ok(Some(response)) => response,
        Ok(None) => return Ok(()),
        Err(_) => Response::from_error(&UploadError::Timeout),
    };

    write_half.write_all(&response.to_bytes()).await?;
    write_half.shutdown().await?;
    Ok(())
}
