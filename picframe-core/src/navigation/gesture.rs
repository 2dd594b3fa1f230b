//! Touch report interpretation
//!
//! The touch controller reports every frame. Holding a finger still repeats
//! the same single contact, so a repeat is dropped until the finger moves or
//! is released.

use serde::{Deserialize, Serialize};

/// Contacts the panel reports per frame
pub const MAX_CONTACTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TouchPoint {
    pub x: u16,
    pub y: u16,
}

impl TouchPoint {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// One contact report: zero contacts means the finger was lifted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub points: Vec<TouchPoint>,
}

impl GestureEvent {
    pub fn release() -> Self {
        Self::default()
    }

    pub fn single(x: u16, y: u16) -> Self {
        Self {
            points: vec![TouchPoint::new(x, y)],
        }
    }

    /// Contacts beyond [`MAX_CONTACTS`] are dropped
    pub fn multi(points: impl IntoIterator<Item = TouchPoint>) -> Self {
        Self {
            points: points.into_iter().take(MAX_CONTACTS).collect(),
        }
    }

    pub fn contact_count(&self) -> usize {
        self.points.len()
    }
}

/// How two or more simultaneous contacts are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiTouchMode {
    /// Any multi-contact report ends the session
    #[default]
    Exit,
    /// Pinch zooms and two-finger drag pans
    Gestures,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureConfig {
    #[serde(default)]
    pub multi_touch: MultiTouchMode,

    /// Change in finger distance, in pixels, before a pinch registers
    #[serde(default = "default_pinch_threshold")]
    pub pinch_threshold: f32,

    /// Centroid movement, in pixels, before a pan registers
    #[serde(default = "default_pan_threshold")]
    pub pan_threshold: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            multi_touch: MultiTouchMode::default(),
            pinch_threshold: default_pinch_threshold(),
            pan_threshold: default_pan_threshold(),
        }
    }
}

fn default_pinch_threshold() -> f32 {
    20.0
}

fn default_pan_threshold() -> f32 {
    15.0
}

/// What a contact report means once repeats and thresholds are applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Held contact, or a multi-touch change below threshold
    Idle,
    /// All contacts lifted
    Release,
    Tap(TouchPoint),
    /// Two or more contacts in exit mode
    Exit,
    /// Ratio of the new finger distance to the previous one
    Pinch { scale: f32 },
    Pan { dx: i32, dy: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MultiBaseline {
    distance: f32,
    centroid: (f32, f32),
}

/// Turns raw contact reports into [`Gesture`]s
#[derive(Debug, Clone)]
pub struct GestureInterpreter {
    config: GestureConfig,
    last_single: Option<TouchPoint>,
    baseline: Option<MultiBaseline>,
}

impl GestureInterpreter {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            last_single: None,
            baseline: None,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn interpret(&mut self, event: &GestureEvent) -> Gesture {
        match event.points.as_slice() {
            [] => {
                self.last_single = None;
                self.baseline = None;
                Gesture::Release
            }
            [point] => {
                self.baseline = None;
                if self.last_single == Some(*point) {
                    return Gesture::Idle;
                }
                self.last_single = Some(*point);
                Gesture::Tap(*point)
            }
            points => {
                self.last_single = None;
                match self.config.multi_touch {
                    MultiTouchMode::Exit => Gesture::Exit,
                    MultiTouchMode::Gestures => self.interpret_multi(points),
                }
            }
        }
    }

    fn interpret_multi(&mut self, points: &[TouchPoint]) -> Gesture {
        let current = MultiBaseline {
            distance: distance(points[0], points[1]),
            centroid: centroid(points),
        };
        let Some(previous) = self.baseline else {
            self.baseline = Some(current);
            return Gesture::Idle;
        };

        let delta = current.distance - previous.distance;
        if delta.abs() >= self.config.pinch_threshold && previous.distance > 0.0 {
            self.baseline = Some(current);
            return Gesture::Pinch {
                scale: current.distance / previous.distance,
            };
        }

        let dx = current.centroid.0 - previous.centroid.0;
        let dy = current.centroid.1 - previous.centroid.1;
        if dx.hypot(dy) >= self.config.pan_threshold {
            self.baseline = Some(current);
            return Gesture::Pan {
                dx: dx.round() as i32,
                dy: dy.round() as i32,
            };
        }

        Gesture::Idle
    }
}

fn distance(a: TouchPoint, b: TouchPoint) -> f32 {
    let dx = f32::from(a.x) - f32::from(b.x);
    let dy = f32::from(a.y) - f32::from(b.y);
    dx.hypot(dy)
}

fn centroid(points: &[TouchPoint]) -> (f32, f32) {
    let n = points.len() as f32;
    let (sx, sy) = points.iter().fold((0.0f32, 0.0f32), |(sx, sy), p| {
        (sx + f32::from(p.x), sy + f32::from(p.y))
    });
    (sx / n, sy / n)
}
