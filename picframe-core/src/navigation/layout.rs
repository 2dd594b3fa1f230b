//! Screen geometry and tap targets
//!
//! All targets are rectangles derived from the current [`DisplayGeometry`],
//! so they follow the panel through rotation.

use serde::{Deserialize, Serialize};

use super::gesture::TouchPoint;
use super::ImageSource;
use crate::config::DisplayConfig;

/// Source menu button size
pub const BUTTON_WIDTH: u16 = 320;
pub const BUTTON_HEIGHT: u16 = 120;
/// Gap between stacked buttons; also the width of the home hot-zone
pub const NAV_MARGIN: u16 = 20;
pub const ARROW_WIDTH: u16 = 60;
pub const ARROW_HEIGHT: u16 = 60;
/// Rotate, home and exit buttons
pub const SMALL_BUTTON_WIDTH: u16 = 100;
pub const SMALL_BUTTON_HEIGHT: u16 = 40;
pub const HOME_ZONE_WIDTH: u16 = NAV_MARGIN;
pub const HOME_ZONE_HEIGHT: u16 = ARROW_HEIGHT;
/// Folder menu text placement
pub const TEXT_X_DIVISOR: u16 = 5;
pub const TEXT_Y_DIVISOR: u16 = 3;
pub const TEXT_LINE_SPACING: u16 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

impl Orientation {
    pub fn toggled(self) -> Self {
        match self {
            Orientation::Landscape => Orientation::Portrait,
            Orientation::Portrait => Orientation::Landscape,
        }
    }
}

/// Axis-aligned rectangle; contains `[x, x + width) × [y, y + height)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, point: TouchPoint) -> bool {
        let (px, py) = (u32::from(point.x), u32::from(point.y));
        let (x, y) = (u32::from(self.x), u32::from(self.y));
        px >= x && px < x + u32::from(self.width) && py >= y && py < y + u32::from(self.height)
    }

    pub fn center(&self) -> TouchPoint {
        TouchPoint::new(
            self.x.saturating_add(self.width / 2),
            self.y.saturating_add(self.height / 2),
        )
    }
}

/// Logical screen size and margins for the current orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayGeometry {
    pub width: u16,
    pub height: u16,
    pub margin_left: u16,
    pub margin_right: u16,
    pub margin_top: u16,
    pub margin_bottom: u16,
    pub orientation: Orientation,
}

impl DisplayGeometry {
    /// Geometry for a panel described in its native landscape terms
    pub fn from_config(config: &DisplayConfig) -> Self {
        let landscape = Self {
            width: config.width,
            height: config.height,
            margin_left: config.margin_left,
            margin_right: config.margin_right,
            margin_top: config.margin_top,
            margin_bottom: config.margin_bottom,
            orientation: Orientation::Landscape,
        };

        match config.orientation {
            Orientation::Landscape => landscape,
            Orientation::Portrait => landscape.rotated(),
        }
    }

    /// Quarter turn: width and height swap and the margins follow the panel edges
    pub fn rotated(&self) -> Self {
        match self.orientation {
            Orientation::Landscape => Self {
                width: self.height,
                height: self.width,
                margin_left: self.margin_top,
                margin_right: self.margin_bottom,
                margin_top: self.margin_right,
                margin_bottom: self.margin_left,
                orientation: Orientation::Portrait,
            },
            Orientation::Portrait => Self {
                width: self.height,
                height: self.width,
                margin_left: self.margin_bottom,
                margin_right: self.margin_top,
                margin_top: self.margin_left,
                margin_bottom: self.margin_right,
                orientation: Orientation::Landscape,
            },
        }
    }
}

/// Tap targets on the navigation screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCommand {
    Previous,
    Next,
    Rotate,
    Home,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavLayout {
    pub previous: Rect,
    pub next: Rect,
    pub rotate: Rect,
    pub home: Rect,
    pub home_zone: Rect,
    pub exit: Rect,
}

impl NavLayout {
    pub fn new(geometry: &DisplayGeometry) -> Self {
        let g = geometry;
        let arrow_y = g.height.saturating_sub(ARROW_HEIGHT) / 2;
        let bottom_row_y = g
            .height
            .saturating_sub(g.margin_bottom)
            .saturating_sub(SMALL_BUTTON_HEIGHT);

        Self {
            previous: Rect::new(g.margin_left, arrow_y, ARROW_WIDTH, ARROW_HEIGHT),
            next: Rect::new(
                g.width.saturating_sub(g.margin_right).saturating_sub(ARROW_WIDTH),
                arrow_y,
                ARROW_WIDTH,
                ARROW_HEIGHT,
            ),
            rotate: Rect::new(
                g.width.saturating_sub(SMALL_BUTTON_WIDTH) / 2,
                g.margin_top,
                SMALL_BUTTON_WIDTH,
                SMALL_BUTTON_HEIGHT,
            ),
            home: Rect::new(
                g.margin_left,
                bottom_row_y,
                SMALL_BUTTON_WIDTH,
                SMALL_BUTTON_HEIGHT,
            ),
            home_zone: Rect::new(0, 0, HOME_ZONE_WIDTH, HOME_ZONE_HEIGHT),
            exit: Rect::new(
                g.width
                    .saturating_sub(g.margin_right)
                    .saturating_sub(SMALL_BUTTON_WIDTH),
                bottom_row_y,
                SMALL_BUTTON_WIDTH,
                SMALL_BUTTON_HEIGHT,
            ),
        }
    }

    pub fn hit(&self, point: TouchPoint) -> Option<NavCommand> {
        [
            (self.home_zone, NavCommand::Home),
            (self.previous, NavCommand::Previous),
            (self.next, NavCommand::Next),
            (self.rotate, NavCommand::Rotate),
            (self.home, NavCommand::Home),
            (self.exit, NavCommand::Exit),
        ]
        .into_iter()
        .find(|(rect, _)| rect.contains(point))
        .map(|(_, command)| command)
    }
}

/// The three buttons of the source menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLayout {
    pub local: Rect,
    pub remote: Rect,
    pub network: Rect,
}

impl SourceLayout {
    /// Local and remote share a row between the side margins; buttons narrow
    /// so the pair keeps a [`NAV_MARGIN`] gap on a narrow (portrait) panel.
    pub fn new(geometry: &DisplayGeometry) -> Self {
        let g = geometry;
        let row_y = g.height.saturating_sub(BUTTON_HEIGHT) / 2;
        let usable = g.width.saturating_sub(g.margin_left).saturating_sub(g.margin_right);
        let width = BUTTON_WIDTH.min(usable.saturating_sub(NAV_MARGIN) / 2);

        Self {
            local: Rect::new(g.margin_left, row_y, width, BUTTON_HEIGHT),
            remote: Rect::new(
                g.width.saturating_sub(g.margin_right).saturating_sub(width),
                row_y,
                width,
                BUTTON_HEIGHT,
            ),
            network: Rect::new(
                g.margin_left + usable.saturating_sub(width) / 2,
                row_y + BUTTON_HEIGHT + NAV_MARGIN,
                width,
                BUTTON_HEIGHT,
            ),
        }
    }

    pub fn hit(&self, point: TouchPoint) -> Option<ImageSource> {
        if self.local.contains(point) {
            Some(ImageSource::Local)
        } else if self.remote.contains(point) {
            Some(ImageSource::Remote)
        } else if self.network.contains(point) {
            Some(ImageSource::Network)
        } else {
            None
        }
    }

    pub fn button(&self, source: ImageSource) -> Rect {
        match source {
            ImageSource::Local => self.local,
            ImageSource::Remote => self.remote,
            ImageSource::Network => self.network,
        }
    }
}

/// Folder menu: a title line, a prompt line, then one row per folder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FolderLayout {
    pub text_x: u16,
    pub title_y: u16,
    pub prompt_y: u16,
    pub first_row_y: u16,
    pub row_width: u16,
    pub row_height: u16,
    pub rows: usize,
}

impl FolderLayout {
    pub fn new(geometry: &DisplayGeometry, rows: usize) -> Self {
        let text_x = geometry.width / TEXT_X_DIVISOR;
        let title_y = geometry.height / TEXT_Y_DIVISOR;
        let prompt_y = title_y + TEXT_LINE_SPACING;

        Self {
            text_x,
            title_y,
            prompt_y,
            first_row_y: prompt_y + TEXT_LINE_SPACING,
            row_width: geometry
                .width
                .saturating_sub(text_x)
                .saturating_sub(geometry.margin_right),
            row_height: TEXT_LINE_SPACING,
            rows,
        }
    }

    /// Rows falling off the bottom of the screen get an empty rect
    pub fn row(&self, idx: usize) -> Rect {
        let offset = u32::from(self.row_height) * idx as u32;
        let y = u32::from(self.first_row_y) + offset;
        match u16::try_from(y) {
            Ok(y) if y < u16::MAX - self.row_height => {
                Rect::new(self.text_x, y, self.row_width, self.row_height)
            }
            _ => Rect::new(self.text_x, u16::MAX, 0, 0),
        }
    }

    pub fn hit(&self, point: TouchPoint) -> Option<usize> {
        (0..self.rows).find(|&idx| self.row(idx).contains(point))
    }
}
