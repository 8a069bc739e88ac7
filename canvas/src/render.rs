//! Rendering: turns viewport state into a frame and draws it to a 2D context.
//!
//! Drawing is split in two. [`build_scene`] is pure: it reads the layout,
//! camera, entities and selection and returns a [`Scene`], a flat display list
//! in screen space (CSS pixels). [`paint`] replays a scene onto a
//! [`web_sys::CanvasRenderingContext2d`] and is the only code in the crate that
//! touches the context.
//!
//! Draw order, back to front: background, legend ticks on the top and left
//! edges, grid lines every `GRID_STRIDE` units, then one marker per entity.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::camera::{Camera, Point};
use crate::consts::{
    BACKGROUND_COLOR, GRID_COLOR, GRID_STRIDE, LABEL_COLOR, LEGEND_COLOR, MARKER_OUTLINE_COLOR, MIN_LABEL_FONT_PX,
    OTHER_COLOR, SELECTED_COLOR, SELF_COLOR,
};
use crate::entity::{Entity, EntityStore};
use crate::hit::{MarkerStyle, cell_origin, marker_radius_px};
use crate::input::UiState;
use crate::layout::Layout;

/// Legend label size in CSS pixels.
const LEGEND_FONT_PX: f64 = 10.0;

/// Length of a legend tick mark in CSS pixels.
const LEGEND_TICK_PX: f64 = 4.0;

/// Width of the selection ring in CSS pixels.
const SELECTION_RING_PX: f64 = 2.0;

/// Horizontal text anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// Vertical text anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baseline {
    Top,
    Middle,
    Alphabetic,
}

/// One drawing primitive in screen space.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Filled axis-aligned rectangle.
    Rect { origin: Point, width: f64, height: f64, color: &'static str },
    /// Stroked axis-aligned rectangle.
    Frame { origin: Point, width: f64, height: f64, color: &'static str, line_width: f64 },
    /// Straight line segment.
    Line { from: Point, to: Point, color: &'static str, line_width: f64 },
    /// Filled circle with an outline.
    Dot { center: Point, radius: f64, fill: &'static str, outline: &'static str },
    /// Stroked circle.
    Ring { center: Point, radius: f64, color: &'static str, line_width: f64 },
    /// Single line of text.
    Text { at: Point, text: String, font_px: f64, color: &'static str, align: Align, baseline: Baseline },
}

/// Render-time options that do not live in the camera or layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneOptions {
    pub marker_style: MarkerStyle,
    pub show_legend: bool,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self { marker_style: MarkerStyle::Dot, show_legend: true }
    }
}

/// A complete frame: canvas size plus shapes in draw order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub shapes: Vec<Shape>,
}

impl Scene {
    /// Whether nothing would be drawn (layout not ready).
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.shapes.is_empty()
    }
}

/// Build one frame from the current state. Pure: no side effects.
///
/// Returns a blank scene while the layout has no area.
#[must_use]
pub fn build_scene(
    layout: &Layout,
    camera: &Camera,
    entities: &EntityStore,
    ui: &UiState,
    options: SceneOptions,
) -> Scene {
    let Some(unit) = camera.unit_px(layout) else {
        return Scene::default();
    };
    let mut shapes = vec![Shape::Rect {
        origin: Point::new(0.0, 0.0),
        width: layout.width,
        height: layout.height,
        color: BACKGROUND_COLOR,
    }];

    let lines = grid_line_positions(layout.grid_size);
    if options.show_legend {
        push_legend(&mut shapes, layout, camera, unit, &lines);
    }
    push_grid(&mut shapes, layout, camera, unit, &lines);

    for entity in entities.iter() {
        push_marker(&mut shapes, layout, camera, unit, entity, ui, options.marker_style);
    }

    Scene { width: layout.width, height: layout.height, shapes }
}

/// Logical positions of the background grid lines: every stride, plus the
/// far edge when the grid size is not a multiple of the stride.
#[must_use]
pub fn grid_line_positions(grid_size: u32) -> Vec<u32> {
    let mut out: Vec<u32> = (0..=grid_size).step_by(GRID_STRIDE as usize).collect();
    if out.last() != Some(&grid_size) {
        out.push(grid_size);
    }
    out
}

// =============================================================
// Scene construction
// =============================================================

fn push_legend(shapes: &mut Vec<Shape>, layout: &Layout, camera: &Camera, unit: f64, lines: &[u32]) {
    for &i in lines {
        let along = f64::from(i) * unit;
        let x = along + camera.offset.x;
        if (0.0..=layout.width).contains(&x) {
            shapes.push(Shape::Line {
                from: Point::new(x, 0.0),
                to: Point::new(x, LEGEND_TICK_PX),
                color: LEGEND_COLOR,
                line_width: 1.0,
            });
            shapes.push(Shape::Text {
                at: Point::new(x, LEGEND_TICK_PX),
                text: i.to_string(),
                font_px: LEGEND_FONT_PX,
                color: LEGEND_COLOR,
                align: Align::Center,
                baseline: Baseline::Top,
            });
        }
        let y = along + camera.offset.y;
        if (0.0..=layout.height).contains(&y) {
            shapes.push(Shape::Line {
                from: Point::new(0.0, y),
                to: Point::new(LEGEND_TICK_PX, y),
                color: LEGEND_COLOR,
                line_width: 1.0,
            });
            shapes.push(Shape::Text {
                at: Point::new(LEGEND_TICK_PX + 2.0, y),
                text: i.to_string(),
                font_px: LEGEND_FONT_PX,
                color: LEGEND_COLOR,
                align: Align::Left,
                baseline: Baseline::Middle,
            });
        }
    }
}

fn push_grid(shapes: &mut Vec<Shape>, layout: &Layout, camera: &Camera, unit: f64, lines: &[u32]) {
    let extent = f64::from(layout.grid_size) * unit;
    let top = camera.offset.y.max(0.0);
    let bottom = (camera.offset.y + extent).min(layout.height);
    let left = camera.offset.x.max(0.0);
    let right = (camera.offset.x + extent).min(layout.width);

    for &i in lines {
        let along = f64::from(i) * unit;
        let x = along + camera.offset.x;
        if top < bottom && (0.0..=layout.width).contains(&x) {
            shapes.push(Shape::Line {
                from: Point::new(x, top),
                to: Point::new(x, bottom),
                color: GRID_COLOR,
                line_width: 1.0,
            });
        }
        let y = along + camera.offset.y;
        if left < right && (0.0..=layout.height).contains(&y) {
            shapes.push(Shape::Line {
                from: Point::new(left, y),
                to: Point::new(right, y),
                color: GRID_COLOR,
                line_width: 1.0,
            });
        }
    }
}

fn push_marker(
    shapes: &mut Vec<Shape>,
    layout: &Layout,
    camera: &Camera,
    unit: f64,
    entity: &Entity,
    ui: &UiState,
    style: MarkerStyle,
) {
    let Some(center) = camera.to_screen(layout, entity.position()) else {
        return;
    };
    let radius = marker_radius_px(unit);
    let reach = radius.max(unit);
    if center.x < -reach || center.y < -reach || center.x > layout.width + reach || center.y > layout.height + reach {
        return;
    }

    let focused = ui.focused_id.as_ref() == Some(&entity.id);
    let selected = ui.selected_id.as_ref() == Some(&entity.id);
    let fill = if focused { SELF_COLOR } else { OTHER_COLOR };

    match style {
        MarkerStyle::Dot => {
            shapes.push(Shape::Dot { center, radius, fill, outline: MARKER_OUTLINE_COLOR });
            if selected {
                shapes.push(Shape::Ring {
                    center,
                    radius: radius + SELECTION_RING_PX,
                    color: SELECTED_COLOR,
                    line_width: SELECTION_RING_PX,
                });
            }
        }
        MarkerStyle::FilledCell => {
            let Some(origin) = camera.to_screen(layout, cell_origin(entity.position())) else {
                return;
            };
            shapes.push(Shape::Rect { origin, width: unit, height: unit, color: fill });
            if selected {
                shapes.push(Shape::Frame {
                    origin,
                    width: unit,
                    height: unit,
                    color: SELECTED_COLOR,
                    line_width: SELECTION_RING_PX,
                });
            }
        }
    }

    if !focused {
        let gap = (unit * 0.15).max(6.0);
        shapes.push(Shape::Text {
            at: Point::new(center.x + gap, center.y - gap),
            text: entity.label(),
            font_px: (unit * 0.25).max(MIN_LABEL_FONT_PX),
            color: LABEL_COLOR,
            align: Align::Left,
            baseline: Baseline::Alphabetic,
        });
    }
}

// =============================================================
// Painting
// =============================================================

/// Draw `scene` onto `ctx`, whose backing store is `dpr` device pixels per
/// CSS pixel.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn paint(ctx: &CanvasRenderingContext2d, scene: &Scene, dpr: f64) -> Result<(), JsValue> {
    ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)?;
    ctx.clear_rect(0.0, 0.0, scene.width, scene.height);
    for shape in &scene.shapes {
        paint_shape(ctx, shape)?;
    }
    Ok(())
}

fn paint_shape(ctx: &CanvasRenderingContext2d, shape: &Shape) -> Result<(), JsValue> {
    match shape {
        Shape::Rect { origin, width, height, color } => {
            ctx.set_fill_style_str(color);
            ctx.fill_rect(origin.x, origin.y, *width, *height);
        }
        Shape::Frame { origin, width, height, color, line_width } => {
            ctx.set_stroke_style_str(color);
            ctx.set_line_width(*line_width);
            ctx.stroke_rect(origin.x, origin.y, *width, *height);
        }
        Shape::Line { from, to, color, line_width } => {
            ctx.set_stroke_style_str(color);
            ctx.set_line_width(*line_width);
            ctx.begin_path();
            ctx.move_to(from.x, from.y);
            ctx.line_to(to.x, to.y);
            ctx.stroke();
        }
        Shape::Dot { center, radius, fill, outline } => {
            ctx.begin_path();
            ctx.arc(center.x, center.y, *radius, 0.0, 2.0 * PI)?;
            ctx.set_fill_style_str(fill);
            ctx.fill();
            ctx.set_line_width(1.0);
            ctx.set_stroke_style_str(outline);
            ctx.stroke();
        }
        Shape::Ring { center, radius, color, line_width } => {
            ctx.begin_path();
            ctx.arc(center.x, center.y, *radius, 0.0, 2.0 * PI)?;
            ctx.set_line_width(*line_width);
            ctx.set_stroke_style_str(color);
            ctx.stroke();
        }
        Shape::Text { at, text, font_px, color, align, baseline } => {
            ctx.set_font(&format!("{font_px:.0}px Inter, sans-serif"));
            ctx.set_fill_style_str(color);
            ctx.set_text_align(match align {
                Align::Left => "left",
                Align::Center => "center",
            });
            ctx.set_text_baseline(match baseline {
                Baseline::Top => "top",
                Baseline::Middle => "middle",
                Baseline::Alphabetic => "alphabetic",
            });
            ctx.fill_text(text, at.x, at.y)?;
        }
    }
    Ok(())
}
