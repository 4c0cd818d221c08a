//! Pan/zoom state for the live chart view.
//!
//! A world point `w` is drawn at `w * scale + translate`. Every handler is synchronous; starting
//! a new gesture simply replaces whatever gesture was in progress.

use crate::model::Bounds;
use crate::svg::fmt;
use orgchart_core::ViewportConfig;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewTransform {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }
}

impl ViewTransform {
    pub fn world_to_screen(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.scale + self.translate_x,
            y * self.scale + self.translate_y,
        )
    }

    pub fn screen_to_world(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.translate_x) / self.scale,
            (y - self.translate_y) / self.scale,
        )
    }

    /// SVG `transform` attribute value.
    pub fn to_svg_transform(&self) -> String {
        format!(
            "translate({} {}) scale({})",
            fmt(self.translate_x),
            fmt(self.translate_y),
            fmt(self.scale)
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum Gesture {
    #[default]
    Idle,
    Dragging {
        last_x: f64,
        last_y: f64,
    },
    Pinching {
        distance: f64,
        mid_x: f64,
        mid_y: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone)]
pub struct ViewportTransform {
    transform: ViewTransform,
    config: ViewportConfig,
    gesture: Gesture,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl ViewportTransform {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            transform: ViewTransform::default(),
            config,
            gesture: Gesture::Idle,
        }
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::Dragging { .. })
    }

    fn clamp_scale(&self, scale: f64) -> f64 {
        scale.clamp(self.config.min_scale, self.config.max_scale)
    }

    /// Scales by `factor` keeping the world point under `(cursor_x, cursor_y)` fixed on screen.
    pub fn zoom_at(&mut self, cursor_x: f64, cursor_y: f64, factor: f64) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let t = self.transform;
        let next = self.clamp_scale(t.scale * factor);
        self.transform = ViewTransform {
            scale: next,
            translate_x: cursor_x - ((cursor_x - t.translate_x) / t.scale) * next,
            translate_y: cursor_y - ((cursor_y - t.translate_y) / t.scale) * next,
        };
    }

    /// Wheel notch: negative `delta_y` (scrolling up) zooms in.
    pub fn wheel(&mut self, cursor_x: f64, cursor_y: f64, delta_y: f64) {
        if delta_y == 0.0 {
            return;
        }
        let factor = if delta_y < 0.0 {
            self.config.wheel_step
        } else {
            1.0 / self.config.wheel_step
        };
        self.zoom_at(cursor_x, cursor_y, factor);
    }

    pub fn drag_start(&mut self, x: f64, y: f64) {
        self.gesture = Gesture::Dragging {
            last_x: x,
            last_y: y,
        };
    }

    pub fn drag_move(&mut self, x: f64, y: f64) {
        let Gesture::Dragging { last_x, last_y } = self.gesture else {
            return;
        };
        self.transform.translate_x += x - last_x;
        self.transform.translate_y += y - last_y;
        self.gesture = Gesture::Dragging {
            last_x: x,
            last_y: y,
        };
    }

    pub fn drag_end(&mut self) {
        self.gesture = Gesture::Idle;
    }

    /// One finger starts a drag, two fingers start a pinch.
    pub fn touch_start(&mut self, touches: &[TouchPoint]) {
        match touches {
            [a] => self.drag_start(a.x, a.y),
            [a, b, ..] => {
                let (mid_x, mid_y, distance) = pinch_geometry(a, b);
                self.gesture = Gesture::Pinching {
                    distance,
                    mid_x,
                    mid_y,
                };
            }
            [] => self.gesture = Gesture::Idle,
        }
    }

    pub fn touch_move(&mut self, touches: &[TouchPoint]) {
        match (self.gesture, touches) {
            (Gesture::Dragging { .. }, [a]) => self.drag_move(a.x, a.y),
            (
                Gesture::Pinching {
                    distance,
                    mid_x,
                    mid_y,
                },
                [a, b, ..],
            ) => {
                let (next_mid_x, next_mid_y, next_distance) = pinch_geometry(a, b);
                self.transform.translate_x += next_mid_x - mid_x;
                self.transform.translate_y += next_mid_y - mid_y;
                if distance > 0.0 && next_distance > 0.0 {
                    self.zoom_at(next_mid_x, next_mid_y, next_distance / distance);
                }
                self.gesture = Gesture::Pinching {
                    distance: next_distance,
                    mid_x: next_mid_x,
                    mid_y: next_mid_y,
                };
            }
            // Finger count changed mid-gesture: restart from the current contact set.
            _ => self.touch_start(touches),
        }
    }

    pub fn touch_end(&mut self, remaining: &[TouchPoint]) {
        self.touch_start(remaining);
    }

    /// Scales `content` to fit the viewport (never magnifying past `max_fit_scale`) and centers
    /// it.
    pub fn fit(&mut self, content: &Bounds, viewport_width: f64, viewport_height: f64) {
        let bw = content.width().max(1.0);
        let bh = content.height().max(1.0);
        let vw = viewport_width.max(1.0);
        let vh = viewport_height.max(1.0);
        let scale = (vw / bw)
            .min(vh / bh)
            .clamp(self.config.min_scale, self.config.max_fit_scale);
        let (cx, cy) = content.center();
        self.transform = ViewTransform {
            scale,
            translate_x: vw / 2.0 - cx * scale,
            translate_y: vh / 2.0 - cy * scale,
        };
        self.gesture = Gesture::Idle;
    }

    pub fn reset(&mut self) {
        self.transform = ViewTransform::default();
        self.gesture = Gesture::Idle;
    }
}

fn pinch_geometry(a: &TouchPoint, b: &TouchPoint) -> (f64, f64, f64) {
    (
        (a.x + b.x) / 2.0,
        (a.y + b.y) / 2.0,
        ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt(),
    )
}
