//! Hardware-facing collaborators driven by the navigation controller
//!
//! The controller only talks to the panel, the power manager and the network
//! link through these traits, so the same state machine runs on the device,
//! in the terminal and under test.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

use super::layout::{FolderLayout, NavLayout, Orientation, SourceLayout};

/// Drawing surface
pub trait Display: Send {
    /// Decode and show a full-screen image
    fn show(&mut self, image: &Path);

    fn clear(&mut self);

    /// Arrows and the rotate, home and exit buttons
    fn draw_chrome(&mut self, layout: &NavLayout);

    fn draw_source_menu(&mut self, layout: &SourceLayout);

    fn draw_folder_menu(&mut self, layout: &FolderLayout, folders: &[String]);

    /// File name bar along the bottom edge
    fn show_filename(&mut self, name: &str);

    /// Status or error text
    fn show_message(&mut self, message: &str);

    fn zoom(&mut self, scale: f32);

    fn pan(&mut self, dx: i32, dy: i32);

    fn set_orientation(&mut self, orientation: Orientation);
}

/// Backlight and sleep management
pub trait Power: Send {
    /// Any touch counts as user activity
    fn notify_activity(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Network link (Wi-Fi on the device)
#[async_trait]
pub trait Network: Send + Sync {
    /// Bring the link up; a no-op when already connected
    async fn connect(&mut self) -> Result<()>;

    fn status(&self) -> NetworkStatus;
}

/// Power collaborator for hosts without a backlight to manage
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPower;

impl Power for NoopPower {
    fn notify_activity(&mut self) {}
}

/// Network collaborator for hosts whose link is managed by the OS
#[derive(Debug, Default, Clone, Copy)]
pub struct HostNetwork {
    connected: bool,
}

#[async_trait]
impl Network for HostNetwork {
    async fn connect(&mut self) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    fn status(&self) -> NetworkStatus {
        if self.connected {
            NetworkStatus::Connected
        } else {
            NetworkStatus::Disconnected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_host_network_connects() {
        let mut network = HostNetwork::default();
        assert_eq!(network.status(), NetworkStatus::Disconnected);
        network.connect().await.unwrap();
        assert_eq!(network.status(), NetworkStatus::Connected);
    }
}
