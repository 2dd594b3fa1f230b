//! Just enough HTTP/1.1 for the upload page: one request per connection,
//! `Content-Length` bodies only.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use super::UploadError;

/// Upper bound on the request line plus headers
pub const MAX_HEAD_BYTES: u64 = 8 * 1024;

/// Parsed request line and headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    /// First header named `name`, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Declared body length. Chunked transfer is treated as absent.
    pub fn content_length(&self) -> Result<Option<u64>, UploadError> {
        if self
            .header("Transfer-Encoding")
            .is_some_and(|value| !value.trim().eq_ignore_ascii_case("identity"))
        {
            return Ok(None);
        }
        self.header("Content-Length")
            .map(|value| {
                value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| UploadError::MalformedRequest {
                        reason: format!("bad Content-Length {value:?}"),
                    })
            })
            .transpose()
    }
}

/// Read the request head. `Ok(None)` means the peer closed before sending
/// anything.
pub async fn read_request_head<R>(reader: &mut R) -> Result<Option<RequestHead>, UploadError>
where
    R: AsyncBufRead + Unpin,
{
    let mut limited = reader.take(MAX_HEAD_BYTES);
    let mut lines = Vec::new();

    loop {
        let mut line = String::new();
        let read = limited
            .read_line(&mut line)
            .await
            .map_err(|source| UploadError::Connection { source })?;
        if read == 0 {
            if lines.is_empty() && line.is_empty() {
                return Ok(None);
            }
            return Err(UploadError::MalformedRequest {
                reason: "request head truncated or too large".to_string(),
            });
        }

        let line = line.trim_end_matches(['\r', '\n']).to_string();
        if line.is_empty() {
            if lines.is_empty() {
                // Tolerate stray blank lines before the request line
                continue;
            }
            break;
        }
        lines.push(line);
    }

    let mut lines = lines.into_iter();
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(path), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(UploadError::MalformedRequest {
            reason: format!("bad request line {request_line:?}"),
        });
    };
    if !version.starts_with("HTTP/1.") {
        return Err(UploadError::MalformedRequest {
            reason: format!("unsupported version {version}"),
        });
    }

    let headers = lines
        .map(|line| {
            line.split_once(':')
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
                .ok_or_else(|| UploadError::MalformedRequest {
                    reason: format!("bad header line {line:?}"),
                })
        })
        .collect::<Result<_, _>>()?;

    Ok(Some(RequestHead {
        method: method.to_string(),
        path: path.to_string(),
        headers,
    }))
}

/// A complete response; the connection closes after it is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.into().into_bytes(),
        }
    }

    pub fn html(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn from_error(error: &UploadError) -> Self {
        Self::text(error.status(), error.to_string())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status,
            reason_phrase(self.status),
            self.content_type,
            self.body.len()
        )
        .into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        408 => "Request Timeout",
        411 => "Length Required",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
