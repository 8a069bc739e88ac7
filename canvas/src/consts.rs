//! Shared numeric constants for the map canvas.

// ── Grid ────────────────────────────────────────────────────────

/// Side length of the square world grid, in logical units.
pub const DEFAULT_GRID_SIZE: u32 = 100;

/// Background grid lines are drawn every this many logical units.
pub const GRID_STRIDE: u32 = 10;

// ── Zoom / pan ──────────────────────────────────────────────────

/// Upper zoom bound. The lower bound is the layout's fit scale.
pub const MAX_SCALE: f64 = 3.0;

/// Gap allowed between a grid edge and the canvas edge, in CSS pixels.
pub const EDGE_PADDING_PX: f64 = 16.0;

/// Scale multiplier for one wheel notch towards the user.
pub const WHEEL_ZOOM_IN: f64 = 1.1;

/// Scale multiplier for one wheel notch away from the user.
pub const WHEEL_ZOOM_OUT: f64 = 0.9;

/// Pinches with a starting contact distance below this are ignored.
pub const MIN_PINCH_DISTANCE_PX: f64 = 1.0;

// ── Drag / inertia ──────────────────────────────────────────────

/// Pointer travel (CSS pixels) below which a gesture still counts as a click.
pub const CLICK_SLOP_PX: f64 = 4.0;

/// Number of recent pointer samples kept for release-velocity estimation.
pub const HISTORY_CAPACITY: usize = 10;

/// Minimum age of the reference sample used for release velocity, in ms.
pub const VELOCITY_WINDOW_MS: f64 = 30.0;

/// A release this long after the last drag sample starts no inertia, in ms.
pub const RELEASE_IDLE_MS: f64 = 100.0;

/// Nominal animation frame duration, in ms.
pub const FRAME_MS: f64 = 1000.0 / 60.0;

/// Per-frame velocity multiplier while coasting.
pub const FRICTION: f64 = 0.92;

/// Inertia stops once both velocity components fall below this (px/frame).
pub const INERTIA_STOP_PX: f64 = 0.2;

// ── Markers ─────────────────────────────────────────────────────

/// Marker radius as a fraction of one on-screen cell.
pub const MARKER_RADIUS_CELLS: f64 = 1.0 / 3.0;

/// Markers never shrink below this radius in CSS pixels.
pub const MIN_MARKER_RADIUS_PX: f64 = 3.0;

/// Smallest label font size in CSS pixels.
pub const MIN_LABEL_FONT_PX: f64 = 10.0;

// ── Palette ─────────────────────────────────────────────────────

pub const BACKGROUND_COLOR: &str = "#030712";
pub const GRID_COLOR: &str = "rgba(255, 255, 255, 0.12)";
pub const LEGEND_COLOR: &str = "rgba(255, 255, 255, 0.55)";
pub const SELF_COLOR: &str = "#10B981";
pub const OTHER_COLOR: &str = "#3B82F6";
pub const MARKER_OUTLINE_COLOR: &str = "rgba(0, 0, 0, 0.6)";
pub const SELECTED_COLOR: &str = "#FBBF24";
pub const LABEL_COLOR: &str = "#FFFFFF";
