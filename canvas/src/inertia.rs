//! Momentum panning after a drag release.
//!
//! The host drives inertia from its animation-frame callback. Each started
//! run is identified by a `FrameTicket`; a frame presented with a ticket that
//! no longer matches the running inertia does nothing, which is how new
//! gestures and teardown cancel frames already scheduled by the host.

#[cfg(test)]
#[path = "inertia_test.rs"]
mod inertia_test;

use crate::camera::{Camera, Point};
use crate::consts::{FRICTION, INERTIA_STOP_PX};
use crate::layout::Layout;

/// Identifies one inertia run. Handed to the host with each frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameTicket(pub u64);

/// Outcome of one inertia frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Offset moved and another frame is wanted.
    Continue,
    /// Velocity decayed below the threshold or the offset hit a bound.
    Finished,
}

/// Coasting velocity with geometric decay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inertia {
    /// Pixels per frame.
    pub velocity: Point,
    pub friction: f64,
    pub stop_threshold: f64,
}

impl Inertia {
    /// Start coasting at `velocity` (px/frame). `None` if already at rest.
    #[must_use]
    pub fn new(velocity: Point) -> Option<Self> {
        let inertia = Self { velocity, friction: FRICTION, stop_threshold: INERTIA_STOP_PX };
        (velocity.is_finite() && !inertia.at_rest()).then_some(inertia)
    }

    /// Both components below the stop threshold.
    #[must_use]
    pub fn at_rest(&self) -> bool {
        self.velocity.x.abs() < self.stop_threshold && self.velocity.y.abs() < self.stop_threshold
    }

    /// Apply one frame of movement to `camera`, then decay.
    pub fn step(&mut self, layout: &Layout, camera: &mut Camera) -> Step {
        let candidate = Point::new(camera.offset.x + self.velocity.x, camera.offset.y + self.velocity.y);
        let clamped = layout.clamp_offset(candidate, camera.scale);
        camera.offset = clamped;
        if clamped != candidate {
            return Step::Finished;
        }
        self.velocity.x *= self.friction;
        self.velocity.y *= self.friction;
        if self.at_rest() { Step::Finished } else { Step::Continue }
    }

    /// Upper bound on frames until rest for this friction and threshold.
    #[must_use]
    pub fn max_frames(&self) -> u32 {
        let speed = self.velocity.x.abs().max(self.velocity.y.abs());
        if speed < self.stop_threshold || self.friction <= 0.0 || self.friction >= 1.0 {
            return 1;
        }
        let frames = ((self.stop_threshold / speed).ln() / self.friction.ln()).ceil();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let frames = frames.clamp(1.0, f64::from(u32::MAX)) as u32;
        frames.saturating_add(1)
    }
}
