//! Canvas geometry: container size, cell size, and the pan/zoom bounds they imply.
//!
//! A `Layout` is rebuilt on every resize. Until the container has a non-zero
//! area it is "not ready": every geometry query returns `None` and both clamp
//! functions hand their input back unchanged, so callers simply retry on the
//! next resize.

#[cfg(test)]
#[path = "layout_test.rs"]
mod layout_test;

use crate::camera::Point;
use crate::consts::{DEFAULT_GRID_SIZE, EDGE_PADDING_PX, MAX_SCALE};

/// How the on-screen size of one grid cell (at scale 1) is derived.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CellSizing {
    /// The whole grid spans the shorter canvas side at scale 1.
    #[default]
    FitShorterSide,
    /// A fixed number of CSS pixels per cell; the fit scale may fall below 1.
    Fixed(f64),
}

/// Container geometry plus the grid parameters the transform depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    /// Container width in CSS pixels.
    pub width: f64,
    /// Container height in CSS pixels.
    pub height: f64,
    /// Device pixel ratio used for the backing store.
    pub dpr: f64,
    /// Side length of the square grid in logical units.
    pub grid_size: u32,
    pub cell_sizing: CellSizing,
    pub max_scale: f64,
    pub edge_padding: f64,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            dpr: 1.0,
            grid_size: DEFAULT_GRID_SIZE,
            cell_sizing: CellSizing::default(),
            max_scale: MAX_SCALE,
            edge_padding: EDGE_PADDING_PX,
        }
    }
}

impl Layout {
    /// Same grid parameters, new container size.
    #[must_use]
    pub fn resized(self, width: f64, height: f64, dpr: f64) -> Self {
        let sane = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        let dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
        Self { width: sane(width), height: sane(height), dpr, ..self }
    }

    /// Whether the container has been laid out with a usable area.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.grid_size > 0 && self.raw_cell_size() > 0.0
    }

    /// Pixels per logical unit at scale 1.
    #[must_use]
    pub fn cell_size(&self) -> Option<f64> {
        self.is_ready().then(|| self.raw_cell_size())
    }

    /// Grid side length in CSS pixels at scale 1.
    #[must_use]
    pub fn grid_px(&self) -> Option<f64> {
        Some(self.cell_size()? * f64::from(self.grid_size))
    }

    /// Smallest scale at which the whole grid fits in the canvas.
    #[must_use]
    pub fn fit_scale(&self) -> Option<f64> {
        Some(self.width.min(self.height) / self.grid_px()?)
    }

    /// Upper zoom bound; never below the fit scale.
    #[must_use]
    pub fn max_scale(&self) -> Option<f64> {
        Some(self.max_scale.max(self.fit_scale()?))
    }

    /// Canvas center in CSS pixels.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.width * 0.5, self.height * 0.5)
    }

    /// Bound `scale` to `[fit_scale, max_scale]`. Identity while not ready.
    #[must_use]
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        let (Some(min), Some(max)) = (self.fit_scale(), self.max_scale()) else {
            return scale;
        };
        if !scale.is_finite() {
            return min;
        }
        scale.clamp(min, max)
    }

    /// Bound `offset` so the grid (drawn at `scale`) cannot leave the view.
    ///
    /// Per axis the offset stays between `extent - grid - padding` and
    /// `padding`. The interval does not depend on the input, so clamping is
    /// idempotent. Identity while not ready.
    #[must_use]
    pub fn clamp_offset(&self, offset: Point, scale: f64) -> Point {
        let Some(grid_px) = self.grid_px() else {
            return offset;
        };
        let scaled = grid_px * scale;
        if !scaled.is_finite() {
            return offset;
        }
        Point {
            x: clamp_axis(offset.x, self.width, scaled, self.edge_padding),
            y: clamp_axis(offset.y, self.height, scaled, self.edge_padding),
        }
    }

    /// Offset that centers the grid at `scale`.
    #[must_use]
    pub fn centered_offset(&self, scale: f64) -> Option<Point> {
        let scaled = self.grid_px()? * scale;
        Some(Point::new((self.width - scaled) * 0.5, (self.height - scaled) * 0.5))
    }

    /// Backing-store size in device pixels (`css * dpr`, floored).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn backing_size(&self) -> (u32, u32) {
        let w = (self.width * self.dpr).floor().max(0.0);
        let h = (self.height * self.dpr).floor().max(0.0);
        (w as u32, h as u32)
    }

    /// CSS `width`/`height` values that pin the element to the container
    /// size, independent of the backing store.
    #[must_use]
    pub fn css_size(&self) -> (String, String) {
        (format!("{}px", self.width), format!("{}px", self.height))
    }

    fn raw_cell_size(&self) -> f64 {
        match self.cell_sizing {
            CellSizing::FitShorterSide => {
                if self.grid_size == 0 {
                    0.0
                } else {
                    self.width.min(self.height) / f64::from(self.grid_size)
                }
            }
            CellSizing::Fixed(px) if px.is_finite() && px > 0.0 => px,
            CellSizing::Fixed(_) => 0.0,
        }
    }
}

fn clamp_axis(value: f64, extent: f64, scaled_grid: f64, padding: f64) -> f64 {
    let far = extent - scaled_grid - padding;
    let lo = far.min(padding);
    let hi = far.max(padding);
    if !value.is_finite() {
        return (lo + hi) * 0.5;
    }
    value.clamp(lo, hi)
}
