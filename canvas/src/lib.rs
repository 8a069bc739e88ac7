//! Interactive map viewport for a square world grid.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It owns a
//! pan/zoom camera over a fixed logical grid, draws the grid and a set of
//! point entities onto a 2D canvas, and turns raw pointer, touch and wheel
//! input into panning with momentum, anchored zoom, and click selection. The
//! host supplies the entity list and focused id; selection changes flow back
//! out through registered listeners.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Browser-bound [`engine::Viewport`] and testable [`engine::ViewportCore`] |
//! | [`host`] | DOM listener guards and the mounted, self-cleaning viewport |
//! | [`camera`] | Pan/zoom camera and coordinate conversions |
//! | [`layout`] | Canvas geometry, fit scale and pan/zoom clamping |
//! | [`entity`] | Entity model and the replace-on-refresh store |
//! | [`input`] | Pointer contacts, drag history and the gesture state machine |
//! | [`inertia`] | Momentum panning and cancellable frame tickets |
//! | [`hit`] | Hit-testing entities against a logical point |
//! | [`render`] | Display-list construction and Canvas2D painting |
//! | [`consts`] | Shared numeric constants (zoom limits, friction, palette, etc.) |

pub mod camera;
pub mod consts;
pub mod engine;
pub mod entity;
pub mod hit;
pub mod host;
pub mod inertia;
pub mod input;
pub mod layout;
pub mod render;
