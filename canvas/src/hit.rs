#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::Point;
use crate::consts::{MARKER_RADIUS_CELLS, MIN_MARKER_RADIUS_PX};
use crate::entity::Entity;

/// How entities are drawn, and therefore how clicks are matched to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerStyle {
    /// A dot centred on the entity position; circular hit area.
    #[default]
    Dot,
    /// The whole grid cell containing the entity is filled; rectangular hit area.
    FilledCell,
}

/// Marker radius in CSS pixels for a cell of `unit_px` on screen.
#[must_use]
pub fn marker_radius_px(unit_px: f64) -> f64 {
    (unit_px * MARKER_RADIUS_CELLS).max(MIN_MARKER_RADIUS_PX)
}

/// Top-left logical corner of the cell containing `p`.
#[must_use]
pub fn cell_origin(p: Point) -> Point {
    Point::new(p.x.floor(), p.y.floor())
}

/// First entity (in iteration order) whose marker covers `logical`.
///
/// `unit_px` is the on-screen size of one logical unit; it converts the
/// pixel marker radius into grid units for the circular test.
#[must_use]
pub fn hit_test<'a, I>(logical: Point, entities: I, style: MarkerStyle, unit_px: f64) -> Option<&'a Entity>
where
    I: IntoIterator<Item = &'a Entity>,
{
    if !logical.is_finite() || unit_px <= 0.0 || !unit_px.is_finite() {
        return None;
    }
    let radius = marker_radius_px(unit_px) / unit_px;
    entities.into_iter().find(|e| match style {
        MarkerStyle::Dot => e.position().distance(logical) <= radius,
        MarkerStyle::FilledCell => {
            let cell = cell_origin(e.position());
            (cell.x..cell.x + 1.0).contains(&logical.x) && (cell.y..cell.y + 1.0).contains(&logical.y)
        }
    })
}
