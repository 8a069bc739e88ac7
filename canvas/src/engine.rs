use std::cell::RefCell;

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::camera::{Camera, Point};
use crate::consts::{
    CLICK_SLOP_PX, DEFAULT_GRID_SIZE, EDGE_PADDING_PX, MAX_SCALE, MIN_PINCH_DISTANCE_PX, RELEASE_IDLE_MS,
    WHEEL_ZOOM_IN, WHEEL_ZOOM_OUT,
};
use crate::entity::{Entity, EntityId, EntityStore};
use crate::hit::{MarkerStyle, hit_test};
use crate::inertia::{FrameTicket, Inertia, Step};
use crate::input::{Contacts, DragHistory, InputState, UiState, WheelDelta};
use crate::layout::{CellSizing, Layout};
use crate::render::{Scene, SceneOptions, build_scene, paint};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Cursor shown while the map is idle under the pointer.
pub const CURSOR_GRAB: &str = "grab";

/// Cursor shown while a drag or pinch is in progress.
pub const CURSOR_GRABBING: &str = "grabbing";

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// State changed; redraw on the next opportunity.
    RenderNeeded,
    /// Call `on_animation_frame` with this ticket on the next animation frame.
    ScheduleFrame(FrameTicket),
    SetCursor(&'static str),
    /// The selection changed. Delivered to [`SelectionListeners`] once the
    /// handler has returned.
    SelectionChanged(Option<EntityId>),
}

/// Construction-time parameters of a viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportConfig {
    pub grid_size: u32,
    pub cell_sizing: CellSizing,
    pub max_scale: f64,
    pub edge_padding: f64,
    pub marker_style: MarkerStyle,
    pub show_legend: bool,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            cell_sizing: CellSizing::FitShorterSide,
            max_scale: MAX_SCALE,
            edge_padding: EDGE_PADDING_PX,
            marker_style: MarkerStyle::Dot,
            show_legend: true,
        }
    }
}

/// Callback notified with the selected entity (or `None`) after each click.
pub type SelectionListener = Box<dyn FnMut(Option<&Entity>)>;

/// Selection consumers, kept apart from the viewport so a listener may call
/// back into it.
#[derive(Default)]
pub struct SelectionListeners {
    listeners: Vec<SelectionListener>,
    closed: bool,
}

impl SelectionListeners {
    /// Add a consumer. Ignored once closed.
    pub fn register(&mut self, listener: impl FnMut(Option<&Entity>) + 'static) {
        if !self.closed {
            self.listeners.push(Box::new(listener));
        }
    }

    /// Call every consumer in registration order.
    pub fn notify(&mut self, entity: Option<&Entity>) {
        for listener in &mut self.listeners {
            listener(entity);
        }
    }

    /// Deliver `changes` with the set unborrowed while consumers run.
    /// Consumers registered during delivery are kept for later changes.
    pub fn deliver(cell: &RefCell<Self>, changes: Vec<Option<Entity>>) {
        if changes.is_empty() {
            return;
        }
        let mut active = std::mem::take(&mut cell.borrow_mut().listeners);
        for change in &changes {
            for listener in &mut active {
                listener(change.as_ref());
            }
        }
        let mut slot = cell.borrow_mut();
        if slot.closed {
            return;
        }
        let added = std::mem::replace(&mut slot.listeners, active);
        slot.listeners.extend(added);
    }

    /// Drop every consumer and refuse new ones.
    pub fn close(&mut self) {
        self.listeners.clear();
        self.closed = true;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// The entities named by each `SelectionChanged` in `actions`, cloned out of
/// `core` so no borrow outlives the lookup.
#[must_use]
pub fn selection_changes(core: &ViewportCore, actions: &[Action]) -> Vec<Option<Entity>> {
    actions
        .iter()
        .filter_map(|action| match action {
            Action::SelectionChanged(id) => Some(id.as_ref().and_then(|id| core.entity(id)).cloned()),
            _ => None,
        })
        .collect()
}

/// Core viewport state: all logic that doesn't depend on the canvas element.
///
/// Separated from `Viewport` so it can be tested without WASM/browser dependencies.
pub struct ViewportCore {
    pub entities: EntityStore,
    pub camera: Camera,
    pub layout: Layout,
    pub ui: UiState,
    pub input: InputState,
    options: SceneOptions,
    inertia: Option<Inertia>,
    /// Bumped whenever inertia starts or is cancelled; frames carrying an
    /// older ticket are ignored.
    generation: u64,
    /// The camera has been placed on a ready layout at least once.
    placed: bool,
    torn_down: bool,
}

impl Default for ViewportCore {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl ViewportCore {
    #[must_use]
    pub fn new(config: ViewportConfig) -> Self {
        let layout = Layout {
            grid_size: config.grid_size,
            cell_sizing: config.cell_sizing,
            max_scale: config.max_scale,
            edge_padding: config.edge_padding,
            ..Layout::default()
        };
        Self {
            entities: EntityStore::new(),
            camera: Camera::default(),
            layout,
            ui: UiState::default(),
            input: InputState::default(),
            options: SceneOptions { marker_style: config.marker_style, show_legend: config.show_legend },
            inertia: None,
            generation: 0,
            placed: false,
            torn_down: false,
        }
    }

    // --- Data inputs ---

    /// Replace the entity list and focused id.
    ///
    /// A selection whose entity is no longer in the list is cleared and
    /// reported as `SelectionChanged(None)`.
    pub fn render(&mut self, entities: Vec<Entity>, focused: Option<EntityId>) -> Vec<Action> {
        if self.torn_down {
            return Vec::new();
        }
        self.entities.replace(entities);
        self.ui.focused_id = focused;
        let mut actions = vec![Action::RenderNeeded];
        let stale = self.ui.selected_id.as_ref().is_some_and(|id| !self.entities.contains(id));
        if stale {
            log::debug!("selection dropped by entity refresh");
            self.ui.selected_id = None;
            actions.push(Action::SelectionChanged(None));
        }
        actions
    }

    /// Build a frame from the current state without changing it.
    #[must_use]
    pub fn scene(&self) -> Scene {
        build_scene(&self.layout, &self.camera, &self.entities, &self.ui, self.options)
    }

    /// Pan so the entity sits at the canvas center at the current scale.
    /// Unknown ids and unready layouts are a no-op.
    pub fn center_on_entity(&mut self, id: &EntityId) -> Vec<Action> {
        if self.torn_down {
            return Vec::new();
        }
        let Some(target) = self.entities.get(id).map(Entity::position) else {
            log::debug!("center_on_entity: {id} not in current list");
            return Vec::new();
        };
        let scale = self.camera.scale;
        let Some(offset) = Camera::offset_anchoring(&self.layout, target, self.layout.center(), scale) else {
            return Vec::new();
        };
        self.cancel_inertia();
        self.camera.offset = self.layout.clamp_offset(offset, scale);
        vec![Action::RenderNeeded]
    }

    // --- Viewport ---

    /// Update container dimensions (CSS pixels) and device pixel ratio.
    ///
    /// The logical point at the old canvas center stays at the new center.
    /// A zero-area size leaves the camera untouched until a usable size arrives.
    pub fn resize(&mut self, width_css: f64, height_css: f64, dpr: f64) -> Vec<Action> {
        if self.torn_down {
            return Vec::new();
        }
        let previous = self.layout;
        let next = previous.resized(width_css, height_css, dpr);
        self.layout = next;
        let Some(fit) = next.fit_scale() else {
            return vec![Action::RenderNeeded];
        };

        if !self.placed {
            self.camera.scale = fit;
            self.camera.offset = next.centered_offset(fit).unwrap_or(self.camera.offset);
            self.placed = true;
            log::debug!("viewport placed: {width_css}x{height_css} @ {dpr}, fit scale {fit:.3}");
            return vec![Action::RenderNeeded];
        }

        let scale = next.clamp_scale(self.camera.scale);
        let anchored = self
            .camera
            .to_logical(&previous, previous.center())
            .and_then(|anchor| Camera::offset_anchoring(&next, anchor, next.center(), scale))
            .unwrap_or(self.camera.offset);
        self.camera = Camera { offset: next.clamp_offset(anchored, scale), scale };
        vec![Action::RenderNeeded]
    }

    // --- Input events ---

    /// Start a drag (one contact) or a pinch (two contacts). Cancels inertia.
    pub fn on_pointer_down(&mut self, contacts: Contacts, time_ms: f64) -> Vec<Action> {
        if self.torn_down || !self.layout.is_ready() {
            return Vec::new();
        }
        self.cancel_inertia();
        match contacts {
            Contacts::One(p) => {
                let mut history = DragHistory::default();
                history.push(time_ms, p);
                self.input = InputState::Dragging { origin: p, last_pointer: p, history, is_click: true };
                vec![Action::SetCursor(CURSOR_GRABBING)]
            }
            Contacts::Two(a, b) => self.begin_pinch(a, b),
        }
    }

    /// Pan while dragging; zoom around the pinch anchor while pinching.
    pub fn on_pointer_move(&mut self, contacts: Contacts, time_ms: f64) -> Vec<Action> {
        if self.torn_down {
            return Vec::new();
        }
        if let Contacts::Two(a, b) = contacts
            && matches!(self.input, InputState::Dragging { .. })
        {
            return self.begin_pinch(a, b);
        }

        match &mut self.input {
            InputState::Idle => Vec::new(),
            InputState::Dragging { origin, last_pointer, history, is_click } => {
                let p = contacts.primary();
                let candidate = Point::new(
                    self.camera.offset.x + (p.x - last_pointer.x),
                    self.camera.offset.y + (p.y - last_pointer.y),
                );
                *last_pointer = p;
                history.push(time_ms, p);
                if origin.distance(p) > CLICK_SLOP_PX {
                    *is_click = false;
                }
                let clamped = self.layout.clamp_offset(candidate, self.camera.scale);
                if clamped == self.camera.offset {
                    return Vec::new();
                }
                self.camera.offset = clamped;
                vec![Action::RenderNeeded]
            }
            InputState::Pinching { initial_distance, initial_scale, anchor_logical } => {
                let Contacts::Two(a, b) = contacts else {
                    return Vec::new();
                };
                let scale = self.layout.clamp_scale(*initial_scale * (a.distance(b) / *initial_distance));
                let Some(offset) = Camera::offset_anchoring(&self.layout, *anchor_logical, a.midpoint(b), scale)
                else {
                    return Vec::new();
                };
                self.camera = Camera { offset: self.layout.clamp_offset(offset, scale), scale };
                vec![Action::RenderNeeded]
            }
        }
    }

    /// End the gesture. A click selects; a drag may start inertia.
    pub fn on_pointer_up(&mut self, time_ms: f64) -> Vec<Action> {
        if self.torn_down {
            return Vec::new();
        }
        self.finish_gesture(Some(time_ms))
    }

    /// The host lost the pointer. Ends the gesture without selecting.
    pub fn on_pointer_cancel(&mut self) -> Vec<Action> {
        if self.torn_down {
            return Vec::new();
        }
        self.finish_gesture(None)
    }

    /// Zoom by one wheel step, keeping the logical point under `screen_pt` fixed.
    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta) -> Vec<Action> {
        if self.torn_down || !delta.dy.is_finite() || delta.dy == 0.0 {
            return Vec::new();
        }
        let factor = if delta.dy < 0.0 { WHEEL_ZOOM_IN } else { WHEEL_ZOOM_OUT };
        let Some(anchor) = self.camera.to_logical(&self.layout, screen_pt) else {
            return Vec::new();
        };
        let scale = self.layout.clamp_scale(self.camera.scale * factor);
        let Some(offset) = Camera::offset_anchoring(&self.layout, anchor, screen_pt, scale) else {
            return Vec::new();
        };
        let next = Camera { offset: self.layout.clamp_offset(offset, scale), scale };
        if next == self.camera {
            return Vec::new();
        }
        self.camera = next;
        vec![Action::RenderNeeded]
    }

    /// Advance inertia by one frame. Tickets from cancelled runs do nothing.
    pub fn on_animation_frame(&mut self, ticket: FrameTicket) -> Vec<Action> {
        if self.torn_down || ticket != FrameTicket(self.generation) {
            return Vec::new();
        }
        let Some(inertia) = self.inertia.as_mut() else {
            return Vec::new();
        };
        match inertia.step(&self.layout, &mut self.camera) {
            Step::Continue => vec![Action::RenderNeeded, Action::ScheduleFrame(ticket)],
            Step::Finished => {
                self.inertia = None;
                vec![Action::RenderNeeded]
            }
        }
    }

    /// Unmount: stop inertia and ignore all further input.
    pub fn teardown(&mut self) {
        self.cancel_inertia();
        self.input = InputState::Idle;
        self.torn_down = true;
    }

    // --- Queries ---

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// The currently selected entity id, if any.
    #[must_use]
    pub fn selection(&self) -> Option<&EntityId> {
        self.ui.selected_id.as_ref()
    }

    #[must_use]
    pub fn focused(&self) -> Option<&EntityId> {
        self.ui.focused_id.as_ref()
    }

    /// Look up an entity in the current list.
    #[must_use]
    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Whether an inertia run is in progress.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.inertia.is_some()
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    #[must_use]
    pub fn to_screen(&self, logical: Point) -> Option<Point> {
        self.camera.to_screen(&self.layout, logical)
    }

    #[must_use]
    pub fn to_logical(&self, screen: Point) -> Option<Point> {
        self.camera.to_logical(&self.layout, screen)
    }

    // --- Internals ---

    fn begin_pinch(&mut self, a: Point, b: Point) -> Vec<Action> {
        let distance = a.distance(b);
        let anchor = self.camera.to_logical(&self.layout, a.midpoint(b));
        match anchor {
            Some(anchor_logical) if distance >= MIN_PINCH_DISTANCE_PX => {
                self.input = InputState::Pinching {
                    initial_distance: distance,
                    initial_scale: self.camera.scale,
                    anchor_logical,
                };
                vec![Action::SetCursor(CURSOR_GRABBING)]
            }
            _ => {
                self.input = InputState::Idle;
                Vec::new()
            }
        }
    }

    /// `released_at` is `None` for a cancel, which never counts as a click.
    fn finish_gesture(&mut self, released_at: Option<f64>) -> Vec<Action> {
        match std::mem::take(&mut self.input) {
            InputState::Idle => Vec::new(),
            InputState::Pinching { .. } => vec![Action::SetCursor(CURSOR_GRAB)],
            InputState::Dragging { last_pointer, history, is_click, .. } => {
                let mut actions = vec![Action::SetCursor(CURSOR_GRAB)];
                if is_click {
                    if released_at.is_some()
                        && let Some(selected) = self.select_at(last_pointer)
                    {
                        actions.push(Action::RenderNeeded);
                        actions.push(selected);
                    }
                    return actions;
                }
                let idle = match (released_at, history.last_time_ms()) {
                    (Some(up), Some(last)) => up - last > RELEASE_IDLE_MS,
                    _ => false,
                };
                let velocity = if idle { None } else { history.release_velocity() };
                if let Some(inertia) = velocity.and_then(Inertia::new) {
                    self.inertia = Some(inertia);
                    self.generation += 1;
                    log::trace!("inertia started at {:?} px/frame", inertia.velocity);
                    actions.push(Action::ScheduleFrame(FrameTicket(self.generation)));
                }
                actions
            }
        }
    }

    fn select_at(&mut self, screen: Point) -> Option<Action> {
        let (Some(logical), Some(unit)) = (self.to_logical(screen), self.camera.unit_px(&self.layout)) else {
            return None;
        };
        let hit = hit_test(logical, self.entities.iter(), self.options.marker_style, unit);
        self.ui.selected_id = hit.map(|e| e.id.clone());
        Some(Action::SelectionChanged(self.ui.selected_id.clone()))
    }

    fn cancel_inertia(&mut self) {
        if self.inertia.take().is_some() {
            self.generation += 1;
        }
    }
}

/// The full viewport. Wraps `ViewportCore` and owns the browser canvas element.
pub struct Viewport {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    pub core: ViewportCore,
}

impl Viewport {
    /// Bind a viewport to `canvas`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the canvas cannot provide a 2D context.
    pub fn new(canvas: HtmlCanvasElement, config: ViewportConfig) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(JsValue::from)?;
        Ok(Self { canvas, ctx, core: ViewportCore::new(config) })
    }

    #[must_use]
    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    // --- Viewport ---

    /// Measure the container element, pin the canvas CSS size to it, and
    /// size the backing store to `floor(css * dpr)` device pixels.
    ///
    /// A canvas without a parent measures itself; its pinned CSS size keeps
    /// that measurement stable across resizes.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the canvas style cannot be updated.
    pub fn resize_to_element(&mut self, dpr: f64) -> Result<Vec<Action>, JsValue> {
        let (width, height) = match self.canvas.parent_element() {
            Some(container) => (container.client_width(), container.client_height()),
            None => (self.canvas.client_width(), self.canvas.client_height()),
        };
        let actions = self.core.resize(f64::from(width), f64::from(height), dpr);
        let layout = self.core.layout();
        let (css_w, css_h) = layout.css_size();
        let style = self.canvas.style();
        style.set_property("width", &css_w)?;
        style.set_property("height", &css_h)?;
        let (w, h) = layout.backing_size();
        self.canvas.set_width(w);
        self.canvas.set_height(h);
        Ok(actions)
    }

    // --- Render ---

    /// Replace entities and focused id. Drawing happens when the returned
    /// actions are applied.
    pub fn render(&mut self, entities: Vec<Entity>, focused: Option<EntityId>) -> Vec<Action> {
        self.core.render(entities, focused)
    }

    /// Draw the current state.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a `Canvas2D` call fails.
    pub fn redraw(&self) -> Result<(), JsValue> {
        paint(&self.ctx, &self.core.scene(), self.core.layout().dpr)
    }

    /// Carry out the drawing and cursor actions; hand back a frame request
    /// for the host's scheduler, if any. Selection changes are left to the
    /// caller, which delivers them once this viewport is no longer borrowed.
    ///
    /// # Errors
    ///
    /// Returns `Err` if drawing or setting the cursor fails.
    pub fn apply(&self, actions: &[Action]) -> Result<Option<FrameTicket>, JsValue> {
        let mut frame = None;
        let mut redraw = false;
        for action in actions {
            match action {
                Action::RenderNeeded => redraw = true,
                Action::ScheduleFrame(ticket) => frame = Some(*ticket),
                Action::SetCursor(cursor) => self.canvas.style().set_property("cursor", cursor)?,
                Action::SelectionChanged(_) => {}
            }
        }
        if redraw {
            self.redraw()?;
        }
        Ok(frame)
    }

    // --- Delegated operations ---

    pub fn center_on_entity(&mut self, id: &EntityId) -> Vec<Action> {
        self.core.center_on_entity(id)
    }

    pub fn teardown(&mut self) {
        self.core.teardown();
    }

    // --- Delegated queries ---

    #[must_use]
    pub fn selection(&self) -> Option<&EntityId> {
        self.core.selection()
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.core.camera()
    }

    #[must_use]
    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.core.entity(id)
    }
}
