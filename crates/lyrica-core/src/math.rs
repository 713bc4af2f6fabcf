use serde::{Deserialize, Serialize};

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

impl Default for Point2D {
    fn default() -> Self {
        Self::zero()
    }
}

/// A 2D size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size2D {
    pub width: f64,
    pub height: f64,
}

impl Size2D {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// The drawing area the lyrics are laid out into, in device pixels.
pub type Viewport = Size2D;

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Point containment with all four edges inclusive.
    pub fn contains(&self, p: Point2D) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Whether the rectangle overlaps the open vertical band `(top, bottom)`.
    pub fn intersects_band(&self, top: f64, bottom: f64) -> bool {
        self.y < bottom && self.bottom() > top
    }

    /// Grow the rectangle by `dx` on the left and right and `dy` on top and bottom.
    pub fn expand(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(
            self.x - dx,
            self.y - dy,
            self.width + dx * 2.0,
            self.height + dy * 2.0,
        )
    }

    /// The same rectangle moved vertically by `dy`.
    pub fn offset_y(&self, dy: f64) -> Rect {
        Rect::new(self.x, self.y + dy, self.width, self.height)
    }

    /// Scale about the rectangle's own center.
    pub fn scale_about_center(&self, scale: f64) -> Rect {
        let c = self.center();
        let w = self.width * scale;
        let h = self.height * scale;
        Rect::new(c.x - w / 2.0, c.y - h / 2.0, w, h)
    }

    /// Linear interpolation between two rectangles.
    pub fn lerp(&self, other: &Rect, t: f64) -> Rect {
        Rect::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
            self.width + (other.width - self.width) * t,
            self.height + (other.height - self.height) * t,
        )
    }
}

/// One step of exponential smoothing: move `current` toward `target` by the
/// fraction `k`.
pub fn approach(current: f64, target: f64, k: f64) -> f64 {
    current + (target - current) * k
}
