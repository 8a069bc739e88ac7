//! Input model: pointer contacts, drag history, and the gesture state machine.
//!
//! `InputState` is the active gesture tracked between pointer-down and
//! pointer-up. Mouse input only ever reaches `Dragging`; `Pinching` needs two
//! touch contacts. `PointerTracker` turns the host's per-pointer events into
//! the contact sets the state machine consumes, and `DragHistory` keeps the
//! recent samples used to estimate release velocity for inertia.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use std::collections::VecDeque;

use crate::camera::Point;
use crate::consts::{FRAME_MS, HISTORY_CAPACITY, VELOCITY_WINDOW_MS};
use crate::entity::EntityId;

/// The active contacts of a pointer event, in screen space (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contacts {
    One(Point),
    Two(Point, Point),
}

impl Contacts {
    /// Build from raw contact points. Extra contacts beyond two are ignored.
    #[must_use]
    pub fn from_points(points: &[Point]) -> Option<Self> {
        match points {
            [] => None,
            [a] => Some(Self::One(*a)),
            [a, b, ..] => Some(Self::Two(*a, *b)),
        }
    }

    #[must_use]
    pub fn count(self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Two(..) => 2,
        }
    }

    /// The first contact.
    #[must_use]
    pub fn primary(self) -> Point {
        match self {
            Self::One(p) | Self::Two(p, _) => p,
        }
    }
}

/// Whether a `pointerdown` should start a drag. Mice only pan with the
/// main button; touch and pen contacts always count.
#[must_use]
pub fn starts_gesture(pointer_type: &str, button: i16) -> bool {
    pointer_type != "mouse" || button == 0
}

/// Tracks which host pointers are currently pressed, in press order.
#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    active: Vec<(i32, Point)>,
}

impl PointerTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press. A repeated press for a known id just moves it.
    pub fn press(&mut self, pointer_id: i32, at: Point) {
        if !self.update(pointer_id, at) {
            self.active.push((pointer_id, at));
        }
    }

    /// Move a pressed pointer. Returns false for pointers that are not down.
    pub fn update(&mut self, pointer_id: i32, at: Point) -> bool {
        match self.active.iter_mut().find(|(id, _)| *id == pointer_id) {
            Some(entry) => {
                entry.1 = at;
                true
            }
            None => false,
        }
    }

    /// Forget a pointer. Returns false if it was not pressed.
    pub fn release(&mut self, pointer_id: i32) -> bool {
        let before = self.active.len();
        self.active.retain(|(id, _)| *id != pointer_id);
        self.active.len() != before
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// The first two pressed pointers as a contact set.
    #[must_use]
    pub fn contacts(&self) -> Option<Contacts> {
        let points: Vec<Point> = self.active.iter().take(2).map(|(_, p)| *p).collect();
        Contacts::from_points(&points)
    }
}

/// One timestamped pointer position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time_ms: f64,
    pub point: Point,
}

/// Bounded buffer of the most recent drag samples.
#[derive(Debug, Clone)]
pub struct DragHistory {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl Default for DragHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl DragHistory {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self { samples: VecDeque::with_capacity(capacity), capacity }
    }

    /// Append a sample, evicting the oldest once full.
    pub fn push(&mut self, time_ms: f64, point: Point) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample { time_ms, point });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamp of the newest sample.
    #[must_use]
    pub fn last_time_ms(&self) -> Option<f64> {
        self.samples.back().map(|s| s.time_ms)
    }

    /// Estimated velocity at release, in CSS pixels per frame.
    ///
    /// Measured between the last sample and the newest sample at least
    /// `VELOCITY_WINDOW_MS` older than it (or the oldest sample when the whole
    /// history is younger). `None` with fewer than two samples or when no time
    /// elapsed.
    #[must_use]
    pub fn release_velocity(&self) -> Option<Point> {
        if self.samples.len() < 2 {
            return None;
        }
        let last = *self.samples.back()?;
        let reference = self
            .samples
            .iter()
            .rev()
            .skip(1)
            .find(|s| last.time_ms - s.time_ms >= VELOCITY_WINDOW_MS)
            .or_else(|| self.samples.front())
            .copied()?;

        let dt = last.time_ms - reference.time_ms;
        if dt <= 0.0 || !dt.is_finite() {
            return None;
        }
        let v = Point::new(
            (last.point.x - reference.point.x) / dt * FRAME_MS,
            (last.point.y - reference.point.y) / dt * FRAME_MS,
        );
        v.is_finite().then_some(v)
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = away from the user).
    pub dy: f64,
}

/// Externally visible selection state.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// The entity drawn in the "self" colour, supplied by the host.
    pub focused_id: Option<EntityId>,
    /// The entity under the most recent click, if any.
    pub selected_id: Option<EntityId>,
}

/// Internal state for the gesture state machine.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// One contact is panning the map.
    Dragging {
        /// Screen position at pointer-down, used to tell clicks from drags.
        origin: Point,
        /// Screen position of the previous event, used to compute the pan delta.
        last_pointer: Point,
        /// Recent samples for release velocity.
        history: DragHistory,
        /// Still within click slop of `origin`.
        is_click: bool,
    },
    /// Two contacts are zooming around a fixed logical point.
    Pinching {
        /// Contact distance at the start of the pinch.
        initial_distance: f64,
        /// Camera scale at the start of the pinch.
        initial_scale: f64,
        /// Logical point that stays under the contacts' midpoint.
        anchor_logical: Point,
    },
}

impl InputState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
