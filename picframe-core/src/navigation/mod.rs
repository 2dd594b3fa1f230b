//! picframe Navigation - the touch-driven state machine
//!
//! ```text
//!                 ┌──────── home ─────────┐
//!                 ▼                       │
//!        ┌─► SourceSelection ──local──► FolderSelection
//!        │        │                       │ folder
//!        │        │ remote / network      ▼
//!        │        └──────────────────► Navigating ──┐ prev / next / rotate
//!        │                                 ▲        │
//!        │                                 └────────┘
//!   any failure ──► Error (terminal)
//!   2+ contacts or exit button ──► Exit
//! ```
//!
//! The controller owns the [`Catalog`] and a [`FetchPipeline`], consumes
//! [`GestureEvent`]s from a bounded queue and drives the [`Display`],
//! [`Power`] and [`Network`] collaborators.

pub mod collaborators;
mod error;
pub mod gesture;
pub mod input;
pub mod layout;

pub use collaborators::{Display, HostNetwork, Network, NetworkStatus, NoopPower, Power};
pub use error::NavigationError;
pub use gesture::{Gesture, GestureConfig, GestureEvent, GestureInterpreter, MultiTouchMode, TouchPoint};
pub use input::{input_channel, InputReceiver, InputSender, Received};
pub use layout::{DisplayGeometry, FolderLayout, NavCommand, NavLayout, Orientation, Rect, SourceLayout};

use anyhow::Result;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::catalog::{discover_folders, Catalog, CatalogEntry};
use crate::config::PicframeConfig;
use crate::fetch::{destination_for, FetchPipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationState {
    SourceSelection,
    FolderSelection,
    Navigating,
    /// Terminal until a multi-contact exit
    Error,
    Exit,
}

/// Where images come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Folders on the media root
    Local,
    /// The configured `remote_url`
    Remote,
    /// The configured `network_url`
    Network,
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Local => write!(f, "local"),
            ImageSource::Remote => write!(f, "remote"),
            ImageSource::Network => write!(f, "network"),
        }
    }
}

/// Navigation state machine bound to its collaborators
pub struct NavigationController<D, P, N> {
    config: PicframeConfig,
    catalog: Catalog,
    fetch: FetchPipeline,
    display: D,
    power: P,
    network: N,
    interpreter: GestureInterpreter,
    geometry: DisplayGeometry,
    state: NavigationState,
    /// Position of the shown image within the current page
    index: usize,
    folders: Vec<String>,
    last_error: Option<String>,
}

impl<D: Display, P: Power, N: Network> NavigationController<D, P, N> {
    /// Build the controller. Fails only if the HTTP client cannot be created.
    pub fn new(config: PicframeConfig, display: D, power: P, network: N) -> Result<Self> {
        let catalog = Catalog::new(config.catalog.filter());
        let fetch = FetchPipeline::new(config.fetch.clone())?;
        let interpreter = GestureInterpreter::new(config.gestures.clone());
        let geometry = DisplayGeometry::from_config(&config.display);

        Ok(Self {
            config,
            catalog,
            fetch,
            display,
            power,
            network,
            interpreter,
            geometry,
            state: NavigationState::SourceSelection,
            index: 0,
            folders: Vec::new(),
            last_error: None,
        })
    }

    /// Draw the source menu
    pub fn start(&mut self) {
        info!("Starting navigation ({:?})", self.geometry.orientation);
        self.display.set_orientation(self.geometry.orientation);
        self.enter_source_selection();
    }

    /// Consume input until the session exits or the input queue closes
    pub async fn run(&mut self, mut input: InputReceiver) -> NavigationState {
        self.start();
        let poll_interval = Duration::from_millis(self.config.input.poll_interval_ms);

        while self.state != NavigationState::Exit {
            match input.recv_timeout(poll_interval).await {
                Received::Event(event) => self.handle_event(&event).await,
                Received::Timeout => {}
                Received::Closed => {
                    info!("Input closed, leaving navigation");
                    self.enter_exit();
                }
            }
        }

        self.state
    }

    /// Apply one contact report
    pub async fn handle_event(&mut self, event: &GestureEvent) {
        if self.state == NavigationState::Exit {
            return;
        }
        if event.contact_count() > 0 {
            self.power.notify_activity();
        }

        match self.interpreter.interpret(event) {
            Gesture::Idle | Gesture::Release => {}
            Gesture::Exit => {
                info!("Multi-touch exit in {:?}", self.state);
                self.enter_exit();
            }
            Gesture::Tap(point) => self.handle_tap(point).await,
            Gesture::Pinch { scale } if self.state == NavigationState::Navigating => {
                debug!("Zoom x{:.2}", scale);
                self.display.zoom(scale);
            }
            Gesture::Pan { dx, dy } if self.state == NavigationState::Navigating => {
                debug!("Pan by ({}, {})", dx, dy);
                self.display.pan(dx, dy);
            }
            Gesture::Pinch { .. } | Gesture::Pan { .. } => {}
        }
    }

    async fn handle_tap(&mut self, point: TouchPoint) {
        let outcome = match self.state {
            NavigationState::SourceSelection => {
                match SourceLayout::new(&self.geometry).hit(point) {
                    Some(ImageSource::Local) => self.select_local(),
                    Some(source) => self.select_remote(source).await,
                    None => Ok(()),
                }
            }
            NavigationState::FolderSelection => {
                match FolderLayout::new(&self.geometry, self.folders.len()).hit(point) {
                    Some(idx) => self.select_folder(idx),
                    None => Ok(()),
                }
            }
            NavigationState::Navigating => match NavLayout::new(&self.geometry).hit(point) {
                Some(NavCommand::Next) => self.step_forward(),
                Some(NavCommand::Previous) => self.step_backward(),
                Some(NavCommand::Rotate) => {
                    self.rotate();
                    Ok(())
                }
                Some(NavCommand::Home) => {
                    info!("Home");
                    self.enter_source_selection();
                    Ok(())
                }
                Some(NavCommand::Exit) => {
                    info!("Exit button");
                    self.enter_exit();
                    Ok(())
                }
                None => Ok(()),
            },
            NavigationState::Error | NavigationState::Exit => Ok(()),
        };

        if let Err(e) = outcome {
            self.enter_error(e);
        }
    }

    fn select_local(&mut self) -> Result<(), NavigationError> {
        let root = self.config.catalog.media_root.clone();
        info!("Local source selected, scanning {}", root.display());

        let folders = discover_folders(
            &root,
            self.catalog.filter(),
            &self.config.catalog.excluded_folders,
        )?;
        if folders.is_empty() {
            return Err(NavigationError::NoFolders { path: root });
        }

        self.folders = folders;
        self.state = NavigationState::FolderSelection;
        self.display.clear();
        let layout = FolderLayout::new(&self.geometry, self.folders.len());
        self.display.draw_folder_menu(&layout, &self.folders);
        Ok(())
    }

    fn select_folder(&mut self, idx: usize) -> Result<(), NavigationError> {
        let Some(name) = self.folders.get(idx) else {
            return Ok(());
        };
        let path = self.config.catalog.media_root.join(name);
        info!("Folder selected: {}", name);
        self.open_listing(path, None)
    }

    async fn select_remote(&mut self, source: ImageSource) -> Result<(), NavigationError> {
        let url = match source {
            ImageSource::Remote => self.config.fetch.remote_url.clone(),
            ImageSource::Network => self.config.fetch.network_url.clone(),
            ImageSource::Local => None,
        }
        .ok_or(NavigationError::MissingEndpoint { kind: source })?;

        info!("{} source selected: {}", source, url);
        self.display.clear();
        self.display.show_message("Connecting...");
        self.network
            .connect()
            .await
            .map_err(|e| NavigationError::Network {
                message: format!("{e:#}"),
            })?;

        self.display.show_message("Downloading...");
        let download_dir = self.config.fetch.download_dir.clone();
        let dest = destination_for(&download_dir, &url);
        self.fetch.fetch_to_storage(&url, &dest).await?;

        let fetched = dest.file_name().and_then(|name| name.to_str());
        self.open_listing(download_dir, fetched)
    }

    /// Re-point the catalog at `path` and show `focus`, or the first image
    /// when no name is given
    fn open_listing(&mut self, path: PathBuf, focus: Option<&str>) -> Result<(), NavigationError> {
        self.catalog.free();
        let page = self.catalog.list(&path, 0, self.page_size())?;
        if page.is_empty() {
            return Err(NavigationError::EmptyListing { path });
        }

        info!(
            "Navigating {} ({} images on first page, more: {})",
            path.display(),
            page.len(),
            page.has_more
        );
        self.index = 0;
        if let Some(name) = focus {
            self.seek(name)?;
        }
        self.state = NavigationState::Navigating;
        self.draw_navigation();
        Ok(())
    }

    /// Page forward until `name` is the current entry. Falls back to the
    /// first image when the listing does not contain it.
    fn seek(&mut self, name: &str) -> Result<(), NavigationError> {
        loop {
            let page = self.catalog.page();
            if let Some(pos) = page.entries.iter().position(|e| e.file_name() == name) {
                self.index = pos;
                return Ok(());
            }
            if !page.has_more {
                break;
            }
            self.catalog.next_page(self.page_size())?;
        }

        warn!("{} is not in the listing, showing the first image", name);
        self.relist_from_start()
    }

    fn step_forward(&mut self) -> Result<(), NavigationError> {
        let page = self.catalog.page();
        let (len, has_more, page_start) = (page.len(), page.has_more, page.page_start);

        if self.index + 1 < len {
            self.index += 1;
        } else if has_more {
            self.catalog.next_page(self.page_size())?;
            self.index = 0;
            if self.catalog.is_empty() {
                self.relist_from_start()?;
            }
        } else {
            debug!("End of listing, wrapping to the first image");
            if page_start > 0 {
                self.relist_from_start()?;
            }
            self.index = 0;
        }

        self.show_current();
        Ok(())
    }

    fn step_backward(&mut self) -> Result<(), NavigationError> {
        let page = self.catalog.page();
        let (has_more, page_start) = (page.has_more, page.page_start);

        if self.index > 0 {
            self.index -= 1;
        } else if page_start > 0 {
            // Pages can come back short, so aim at the absolute position of
            // the entry just before this page rather than a page boundary
            let target = page_start - 1;
            let prev_start = page_start.saturating_sub(self.page_size());
            let base = self.base_path()?;
            let len = self.catalog.list(&base, prev_start, self.page_size())?.len();
            self.index = target - prev_start;
            if self.index >= len {
                self.catalog.list(&base, target, self.page_size())?;
                self.index = 0;
            }
            if self.catalog.is_empty() {
                self.relist_from_start()?;
                self.index = self.catalog.page().len().saturating_sub(1);
            }
        } else {
            debug!("Start of listing, wrapping to the last image");
            if has_more {
                while self.catalog.page().has_more {
                    self.catalog.next_page(self.page_size())?;
                }
                if self.catalog.is_empty() {
                    self.relist_from_start()?;
                }
            }
            self.index = self.catalog.page().len().saturating_sub(1);
        }

        self.show_current();
        Ok(())
    }

    /// Back to the first page; an empty result means the folder emptied out
    fn relist_from_start(&mut self) -> Result<(), NavigationError> {
        let base = self.base_path()?;
        let page = self.catalog.list(&base, 0, self.page_size())?;
        if page.is_empty() {
            return Err(NavigationError::EmptyListing { path: base });
        }
        self.index = 0;
        Ok(())
    }

    fn base_path(&self) -> Result<PathBuf, NavigationError> {
        self.catalog
            .base_path()
            .map(|p| p.to_path_buf())
            .ok_or(NavigationError::Catalog(crate::catalog::CatalogError::NoCursor))
    }

    fn rotate(&mut self) {
        self.geometry = self.geometry.rotated();
        info!("Rotated to {:?}", self.geometry.orientation);
        self.display.set_orientation(self.geometry.orientation);
        self.draw_navigation();
    }

    fn draw_navigation(&mut self) {
        self.display.clear();
        self.show_current();
        self.display.draw_chrome(&NavLayout::new(&self.geometry));
    }

    fn show_current(&mut self) {
        if let Some(entry) = self.catalog.entry(self.index) {
            debug!("Showing {} ({})", entry, self.catalog.page().page_start + self.index);
            self.display.show(entry.path());
            self.display.show_filename(entry.file_name());
        }
    }

    fn enter_source_selection(&mut self) {
        self.catalog.free();
        self.folders.clear();
        self.index = 0;
        self.state = NavigationState::SourceSelection;
        self.display.clear();
        self.display.draw_source_menu(&SourceLayout::new(&self.geometry));
    }

    fn enter_error(&mut self, err: NavigationError) {
        error!("Navigation error in {:?}: {}", self.state, err);
        let message = err.user_message();

        self.catalog.free();
        self.folders.clear();
        self.state = NavigationState::Error;
        self.display.clear();
        self.display.show_message(&message);
        self.last_error = Some(message);
    }

    fn enter_exit(&mut self) {
        self.catalog.free();
        self.state = NavigationState::Exit;
        self.display.clear();
    }

    fn page_size(&self) -> usize {
        self.config.catalog.page_size.max(1)
    }

    pub fn state(&self) -> NavigationState {
        self.state
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    /// Position of the shown image in the whole listing
    pub fn absolute_index(&self) -> usize {
        self.catalog.page().page_start + self.index
    }

    pub fn current_entry(&self) -> Option<&CatalogEntry> {
        self.catalog.entry(self.index)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn folders(&self) -> &[String] {
        &self.folders
    }

    pub fn geometry(&self) -> &DisplayGeometry {
        &self.geometry
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn config(&self) -> &PicframeConfig {
        &self.config
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn power(&self) -> &P {
        &self.power
    }

    pub fn network(&self) -> &N {
        &self.network
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullDisplay;

    impl Display for NullDisplay {
        fn show(&mut self, _image: &std::path::Path) {}
        fn clear(&mut self) {}
        fn draw_chrome(&mut self, _layout: &NavLayout) {}
        fn draw_source_menu(&mut self, _layout: &SourceLayout) {}
        fn draw_folder_menu(&mut self, _layout: &FolderLayout, _folders: &[String]) {}
        fn show_filename(&mut self, _name: &str) {}
        fn show_message(&mut self, _message: &str) {}
        fn zoom(&mut self, _scale: f32) {}
        fn pan(&mut self, _dx: i32, _dy: i32) {}
        fn set_orientation(&mut self, _orientation: Orientation) {}
    }

    fn controller() -> NavigationController<NullDisplay, NoopPower, HostNetwork> {
        NavigationController::new(
            PicframeConfig::default(),
            NullDisplay,
            NoopPower,
            HostNetwork::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_two_contacts_exit_from_source_menu() {
        let mut controller = controller();
        controller.start();
        assert_eq!(controller.state(), NavigationState::SourceSelection);

        controller
            .handle_event(&GestureEvent::multi([TouchPoint::new(1, 1), TouchPoint::new(2, 2)]))
            .await;
        assert_eq!(controller.state(), NavigationState::Exit);
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_an_error() {
        let mut controller = controller();
        controller.start();

        let remote = SourceLayout::new(controller.geometry()).remote.center();
        controller
            .handle_event(&GestureEvent::single(remote.x, remote.y))
            .await;

        assert_eq!(controller.state(), NavigationState::Error);
        assert_eq!(controller.last_error(), Some("No remote source configured"));
    }

    #[tokio::test]
    async fn test_run_ends_when_input_closes() {
        let mut controller = controller();
        let (tx, rx) = input_channel(4);
        drop(tx);

        assert_eq!(controller.run(rx).await, NavigationState::Exit);
    }

    /// A short first page must not shift the entry shown when paging back
    #[tokio::test]
    async fn test_previous_after_short_page_lands_on_preceding_entry() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let folder = temp_dir.path().join("Birds");
        std::fs::create_dir_all(&folder).unwrap();
        for name in ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"] {
            std::fs::write(folder.join(format!("{name}.png")), b"image").unwrap();
        }

        let mut config = PicframeConfig::default();
        config.catalog.media_root = temp_dir.path().to_path_buf();
        config.catalog.page_size = 4;
        let mut controller =
            NavigationController::new(config, NullDisplay, NoopPower, HostNetwork::default())
                .unwrap();
        controller.start();

        let tap = |point: TouchPoint| [GestureEvent::single(point.x, point.y), GestureEvent::release()];
        let local = SourceLayout::new(controller.geometry()).local.center();
        for event in tap(local) {
            controller.handle_event(&event).await;
        }

        // Only two names fit while the folder opens
        crate::catalog::RESERVATION_LIMIT.with(|limit| limit.set(2));
        let row = FolderLayout::new(controller.geometry(), 1).row(0).center();
        for event in tap(row) {
            controller.handle_event(&event).await;
        }
        crate::catalog::RESERVATION_LIMIT.with(|limit| limit.set(usize::MAX));
        assert_eq!(controller.catalog().page().len(), 2);

        let nav = NavLayout::new(controller.geometry());
        for point in [nav.next.center(), nav.next.center()] {
            for event in tap(point) {
                controller.handle_event(&event).await;
            }
        }
        assert_eq!(controller.current_entry().unwrap().file_name(), "c.png");
        assert_eq!(controller.absolute_index(), 2);

        for event in tap(nav.previous.center()) {
            controller.handle_event(&event).await;
        }
        assert_eq!(controller.current_entry().unwrap().file_name(), "b.png");
        assert_eq!(controller.absolute_index(), 1);

        for event in tap(nav.previous.center()) {
            controller.handle_event(&event).await;
        }
        assert_eq!(controller.current_entry().unwrap().file_name(), "a.png");
    }
}
