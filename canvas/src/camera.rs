#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use crate::layout::Layout;

/// A point in either screen or logical grid space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Midpoint between `self` and `other`.
    #[must_use]
    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Pan/zoom state over the logical grid.
///
/// `offset` is the screen position (CSS pixels) of logical `(0, 0)`, the
/// grid's top-left corner. `scale` multiplies the layout's cell size; y grows
/// downward in both spaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub offset: Point,
    pub scale: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { offset: Point::new(0.0, 0.0), scale: 1.0 }
    }
}

impl Camera {
    /// Convert a logical grid point to screen coordinates (CSS pixels).
    ///
    /// Returns `None` while the layout has no area.
    #[must_use]
    pub fn to_screen(&self, layout: &Layout, logical: Point) -> Option<Point> {
        let unit = layout.cell_size()? * self.scale;
        Some(Point {
            x: logical.x * unit + self.offset.x,
            y: logical.y * unit + self.offset.y,
        })
    }

    /// Convert a screen point (CSS pixels) to logical grid coordinates.
    ///
    /// Returns `None` while the layout has no area.
    #[must_use]
    pub fn to_logical(&self, layout: &Layout, screen: Point) -> Option<Point> {
        let unit = layout.cell_size()? * self.scale;
        if unit <= 0.0 {
            return None;
        }
        Some(Point {
            x: (screen.x - self.offset.x) / unit,
            y: (screen.y - self.offset.y) / unit,
        })
    }

    /// Pixels per logical unit at the current scale.
    #[must_use]
    pub fn unit_px(&self, layout: &Layout) -> Option<f64> {
        Some(layout.cell_size()? * self.scale)
    }

    /// Offset that puts `logical` under `screen` at `scale`.
    #[must_use]
    pub fn offset_anchoring(layout: &Layout, logical: Point, screen: Point, scale: f64) -> Option<Point> {
        let unit = layout.cell_size()? * scale;
        Some(Point {
            x: screen.x - logical.x * unit,
            y: screen.y - logical.y * unit,
        })
    }
}
