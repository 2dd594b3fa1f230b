//! Test helper functions for integration tests
//!
//! Shared across the test files using the tests/common/ pattern. Not every
//! test binary uses every helper.
#![allow(dead_code)]

use picframe_core::fetch::Sha256Digest;
use picframe_core::navigation::{
    Display, FolderLayout, NavLayout, Network, NetworkStatus, Orientation, Power, SourceLayout,
};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Initialize logging for tests (only once per test run)
static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Create empty-ish image files in `dir`
pub fn create_images(dir: &Path, names: &[&str]) {
    std::fs::create_dir_all(dir).unwrap();
    for name in names {
        std::fs::write(dir.join(name), b"image").unwrap();
    }
}

// ---------------------------------------------------------------------------
// HTTP responder
// ---------------------------------------------------------------------------

/// One canned HTTP response, served to every connection
#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Content-Length to announce; the real body length when `None`
    pub declared_length: Option<usize>,
}

impl CannedResponse {
    /// 200 with a correct `X-Content-SHA256` header
    pub fn verified(body: &[u8]) -> Self {
        Self::unsigned(body).with_header("X-Content-SHA256", &Sha256Digest::of(body).to_hex())
    }

    /// 200 without any digest header
    pub fn unsigned(body: &[u8]) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.to_vec(),
            declared_length: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_declared_length(mut self, length: usize) -> Self {
        self.declared_length = Some(length);
        self
    }

    fn to_bytes(&self) -> Vec<u8> {
        let reason = if self.status == 200 { "OK" } else { "Status" };
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, reason);
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            self.declared_length.unwrap_or(self.body.len())
        ));

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

/// Serve `response` on an ephemeral localhost port; returns the base URL
pub async fn serve(response: CannedResponse) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let payload = response.to_bytes();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let payload = payload.clone();
            tokio::spawn(async move {
                // Drain the request head before answering
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = socket.write_all(&payload).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}

/// A URL on a port nothing listens on
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/photo.png")
}

// ---------------------------------------------------------------------------
// Collaborator fakes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayCall {
    Show(PathBuf),
    Clear,
    Chrome,
    SourceMenu,
    FolderMenu(Vec<String>),
    Filename(String),
    Message(String),
    Zoom(f32),
    Pan(i32, i32),
    Orientation(Orientation),
}

/// Records every call in order
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub calls: Vec<DisplayCall>,
}

impl RecordingDisplay {
    /// File names passed to `show_filename`, in order
    pub fn filenames(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DisplayCall::Filename(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_filename(&self) -> Option<String> {
        self.filenames().pop()
    }

    pub fn last_message(&self) -> Option<String> {
        self.calls.iter().rev().find_map(|call| match call {
            DisplayCall::Message(message) => Some(message.clone()),
            _ => None,
        })
    }

    pub fn count(&self, wanted: &DisplayCall) -> usize {
        self.calls.iter().filter(|call| *call == wanted).count()
    }
}

impl Display for RecordingDisplay {
    fn show(&mut self, image: &Path) {
        self.calls.push(DisplayCall::Show(image.to_path_buf()));
    }

    fn clear(&mut self) {
        self.calls.push(DisplayCall::Clear);
    }

    fn draw_chrome(&mut self, _layout: &NavLayout) {
        self.calls.push(DisplayCall::Chrome);
    }

    fn draw_source_menu(&mut self, _layout: &SourceLayout) {
        self.calls.push(DisplayCall::SourceMenu);
    }

    fn draw_folder_menu(&mut self, _layout: &FolderLayout, folders: &[String]) {
        self.calls.push(DisplayCall::FolderMenu(folders.to_vec()));
    }

    fn show_filename(&mut self, name: &str) {
        self.calls.push(DisplayCall::Filename(name.to_string()));
    }

    fn show_message(&mut self, message: &str) {
        self.calls.push(DisplayCall::Message(message.to_string()));
    }

    fn zoom(&mut self, scale: f32) {
        self.calls.push(DisplayCall::Zoom(scale));
    }

    fn pan(&mut self, dx: i32, dy: i32) {
        self.calls.push(DisplayCall::Pan(dx, dy));
    }

    fn set_orientation(&mut self, orientation: Orientation) {
        self.calls.push(DisplayCall::Orientation(orientation));
    }
}

#[derive(Debug, Default)]
pub struct CountingPower {
    pub activity: usize,
}

impl Power for CountingPower {
    fn notify_activity(&mut self) {
        self.activity += 1;
    }
}

/// Network link that can be told to fail
#[derive(Debug, Default)]
pub struct ScriptedNetwork {
    pub fail: bool,
    pub connects: usize,
}

impl ScriptedNetwork {
    pub fn failing() -> Self {
        Self {
            fail: true,
            connects: 0,
        }
    }
}

#[async_trait::async_trait]
impl Network for ScriptedNetwork {
    async fn connect(&mut self) -> anyhow::Result<()> {
        self.connects += 1;
        if self.fail {
            anyhow::bail!("association with access point timed out");
        }
        Ok(())
    }

    fn status(&self) -> NetworkStatus {
        if self.connects > 0 && !self.fail {
            NetworkStatus::Connected
        } else {
            NetworkStatus::Disconnected
        }
    }
}
