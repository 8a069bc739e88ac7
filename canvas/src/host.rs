//! Browser wiring for a [`Viewport`]: DOM listeners and the animation-frame loop.
//!
//! Every event subscription is held by a [`ListenerGuard`] that removes itself
//! on drop, and all of a mounted viewport's guards live in one
//! [`ListenerSet`]. Dropping the [`MountedViewport`] clears that set, cancels
//! the pending animation frame, and tears the core down, so no callback can
//! reach the viewport afterwards. Callbacks only hold weak references to the
//! shared state.
//!
//! Selection listeners run after the viewport borrow is released, so they may
//! call back into the [`MountedViewport`].

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{AddEventListenerOptions, Event, EventTarget, HtmlCanvasElement, PointerEvent, WheelEvent};

use crate::camera::Point;
use crate::engine::{Action, CURSOR_GRAB, SelectionListeners, Viewport, ViewportConfig, selection_changes};
use crate::entity::{Entity, EntityId};
use crate::inertia::FrameTicket;
use crate::input::{PointerTracker, WheelDelta, starts_gesture};

/// One DOM event subscription, removed when dropped.
pub struct ListenerGuard {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl ListenerGuard {
    /// Subscribe `handler` to `event` on `target`. Events that are not an `E`
    /// are skipped. `passive: false` lets the handler call `prevent_default`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the browser rejects the subscription.
    pub fn new<E, F>(target: &EventTarget, event: &'static str, passive: bool, mut handler: F) -> Result<Self, JsValue>
    where
        E: JsCast + 'static,
        F: FnMut(E) + 'static,
    {
        let callback = Closure::wrap(Box::new(move |ev: Event| {
            if let Ok(ev) = ev.dyn_into::<E>() {
                handler(ev);
            }
        }) as Box<dyn FnMut(Event)>);
        let options = AddEventListenerOptions::new();
        options.set_passive(passive);
        target.add_event_listener_with_callback_and_add_event_listener_options(
            event,
            callback.as_ref().unchecked_ref(),
            &options,
        )?;
        Ok(Self { target: target.clone(), event, callback })
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Err(e) = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref())
        {
            log::warn!("failed to remove {} listener: {e:?}", self.event);
        }
    }
}

/// All subscriptions owned by one mounted component.
#[derive(Default)]
pub struct ListenerSet {
    guards: Vec<ListenerGuard>,
}

impl ListenerSet {
    /// # Errors
    ///
    /// Returns `Err` if the browser rejects the subscription; earlier ones stay.
    pub fn listen<E, F>(&mut self, target: &EventTarget, event: &'static str, passive: bool, handler: F) -> Result<(), JsValue>
    where
        E: JsCast + 'static,
        F: FnMut(E) + 'static,
    {
        self.guards.push(ListenerGuard::new(target, event, passive, handler)?);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Remove every subscription.
    pub fn clear(&mut self) {
        self.guards.clear();
    }
}

/// State reachable from DOM callbacks.
struct Shared {
    viewport: RefCell<Viewport>,
    selection: RefCell<SelectionListeners>,
    pointers: RefCell<PointerTracker>,
    /// Handle of the requested animation frame, if one is pending.
    frame_handle: Cell<Option<i32>>,
    frame_callback: RefCell<Option<Closure<dyn FnMut(f64)>>>,
    /// The previous frame callback. It may still be on the stack when the
    /// next frame is scheduled from inside it, so it is dropped one frame late.
    retired_callback: RefCell<Option<Closure<dyn FnMut(f64)>>>,
}

/// A viewport attached to a canvas element with its event wiring in place.
pub struct MountedViewport {
    shared: Rc<Shared>,
    listeners: ListenerSet,
}

impl MountedViewport {
    /// Bind a viewport to `canvas`, size it, and subscribe to pointer,
    /// wheel and window resize events.
    ///
    /// # Errors
    ///
    /// Returns `Err` if there is no window, no 2D context, or a subscription fails.
    pub fn mount(canvas: HtmlCanvasElement, config: ViewportConfig) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let style = canvas.style();
        style.set_property("touch-action", "none")?;
        style.set_property("cursor", CURSOR_GRAB)?;

        let mut viewport = Viewport::new(canvas.clone(), config)?;
        viewport.resize_to_element(window.device_pixel_ratio())?;
        let shared = Rc::new(Shared {
            viewport: RefCell::new(viewport),
            selection: RefCell::new(SelectionListeners::default()),
            pointers: RefCell::new(PointerTracker::new()),
            frame_handle: Cell::new(None),
            frame_callback: RefCell::new(None),
            retired_callback: RefCell::new(None),
        });

        let mut listeners = ListenerSet::default();
        let target: &EventTarget = canvas.as_ref();

        let weak = Rc::downgrade(&shared);
        listeners.listen(target, "pointerdown", true, move |ev: PointerEvent| {
            if !starts_gesture(&ev.pointer_type(), ev.button()) {
                return;
            }
            with_shared(&weak, |shared| {
                if let Err(e) = shared.viewport.borrow().canvas().set_pointer_capture(ev.pointer_id()) {
                    log::debug!("pointer capture refused: {e:?}");
                }
                let contacts = {
                    let mut pointers = shared.pointers.borrow_mut();
                    pointers.press(ev.pointer_id(), pointer_point(&ev));
                    pointers.contacts()
                };
                if let Some(contacts) = contacts {
                    let actions = shared.viewport.borrow_mut().core.on_pointer_down(contacts, ev.time_stamp());
                    dispatch(shared, &actions);
                }
            });
        })?;

        let weak = Rc::downgrade(&shared);
        listeners.listen(target, "pointermove", true, move |ev: PointerEvent| {
            with_shared(&weak, |shared| {
                let contacts = {
                    let mut pointers = shared.pointers.borrow_mut();
                    if !pointers.update(ev.pointer_id(), pointer_point(&ev)) {
                        return;
                    }
                    pointers.contacts()
                };
                if let Some(contacts) = contacts {
                    let actions = shared.viewport.borrow_mut().core.on_pointer_move(contacts, ev.time_stamp());
                    dispatch(shared, &actions);
                }
            });
        })?;

        let weak = Rc::downgrade(&shared);
        listeners.listen(target, "pointerup", true, move |ev: PointerEvent| {
            with_shared(&weak, |shared| {
                if shared.pointers.borrow_mut().release(ev.pointer_id()) {
                    let actions = shared.viewport.borrow_mut().core.on_pointer_up(ev.time_stamp());
                    dispatch(shared, &actions);
                }
            });
        })?;

        let weak = Rc::downgrade(&shared);
        listeners.listen(target, "pointercancel", true, move |ev: PointerEvent| {
            with_shared(&weak, |shared| {
                if shared.pointers.borrow_mut().release(ev.pointer_id()) {
                    let actions = shared.viewport.borrow_mut().core.on_pointer_cancel();
                    dispatch(shared, &actions);
                }
            });
        })?;

        let weak = Rc::downgrade(&shared);
        listeners.listen(target, "wheel", false, move |ev: WheelEvent| {
            ev.prevent_default();
            with_shared(&weak, |shared| {
                let at = Point::new(f64::from(ev.offset_x()), f64::from(ev.offset_y()));
                let delta = WheelDelta { dx: ev.delta_x(), dy: ev.delta_y() };
                let actions = shared.viewport.borrow_mut().core.on_wheel(at, delta);
                dispatch(shared, &actions);
            });
        })?;

        let weak = Rc::downgrade(&shared);
        let resize_window = window.clone();
        let window_target: &EventTarget = window.as_ref();
        listeners.listen(window_target, "resize", true, move |_: Event| {
            with_shared(&weak, |shared| {
                let resized = shared.viewport.borrow_mut().resize_to_element(resize_window.device_pixel_ratio());
                match resized {
                    Ok(actions) => dispatch(shared, &actions),
                    Err(e) => log::warn!("viewport resize failed: {e:?}"),
                }
            });
        })?;

        log::debug!("viewport mounted with {} listeners", listeners.len());
        Ok(Self { shared, listeners })
    }

    /// Replace the entity list and focused id, then draw.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a `Canvas2D` call fails.
    pub fn render(&self, entities: Vec<Entity>, focused: Option<EntityId>) -> Result<(), JsValue> {
        let actions = self.shared.viewport.borrow_mut().render(entities, focused);
        try_dispatch(&self.shared, &actions)
    }

    /// Register a selection consumer. It may call back into this viewport.
    pub fn on_entity_selected(&self, listener: impl FnMut(Option<&Entity>) + 'static) {
        self.shared.selection.borrow_mut().register(listener);
    }

    pub fn center_on_entity(&self, id: &EntityId) {
        let actions = self.shared.viewport.borrow_mut().center_on_entity(id);
        dispatch(&self.shared, &actions);
    }

    /// Re-read the canvas layout box; call when the container changes size
    /// without a window resize.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the canvas cannot be resized or redrawn.
    pub fn resize(&self) -> Result<(), JsValue> {
        let dpr = web_sys::window().map_or(1.0, |w| w.device_pixel_ratio());
        let actions = self.shared.viewport.borrow_mut().resize_to_element(dpr)?;
        try_dispatch(&self.shared, &actions)
    }

    /// The currently selected entity id, if any.
    #[must_use]
    pub fn selection(&self) -> Option<EntityId> {
        self.shared.viewport.borrow().selection().cloned()
    }
}

impl Drop for MountedViewport {
    fn drop(&mut self) {
        self.listeners.clear();
        self.shared.selection.borrow_mut().close();
        cancel_frame(&self.shared);
        self.shared.retired_callback.borrow_mut().take();
        match self.shared.viewport.try_borrow_mut() {
            Ok(mut viewport) => viewport.teardown(),
            Err(e) => log::warn!("viewport busy during unmount: {e}"),
        }
        self.shared.pointers.borrow_mut().clear();
        log::debug!("viewport unmounted");
    }
}

fn pointer_point(ev: &PointerEvent) -> Point {
    Point::new(f64::from(ev.offset_x()), f64::from(ev.offset_y()))
}

fn with_shared(weak: &Weak<Shared>, f: impl FnOnce(&Rc<Shared>)) {
    if let Some(shared) = weak.upgrade() {
        f(&shared);
    }
}

/// Draw, set the cursor, schedule the next inertia frame, then tell
/// selection listeners. No borrow of the viewport is held while they run.
fn try_dispatch(shared: &Rc<Shared>, actions: &[Action]) -> Result<(), JsValue> {
    if actions.is_empty() {
        return Ok(());
    }
    let (applied, changes) = {
        let viewport = shared.viewport.borrow();
        (viewport.apply(actions), selection_changes(&viewport.core, actions))
    };
    if let Ok(Some(ticket)) = applied {
        schedule_frame(shared, ticket);
    }
    SelectionListeners::deliver(&shared.selection, changes);
    applied.map(|_| ())
}

/// [`try_dispatch`] for event callbacks, which have nowhere to return an error.
fn dispatch(shared: &Rc<Shared>, actions: &[Action]) {
    if let Err(e) = try_dispatch(shared, actions) {
        log::warn!("viewport draw failed: {e:?}");
    }
}

fn schedule_frame(shared: &Rc<Shared>, ticket: FrameTicket) {
    let Some(window) = web_sys::window() else {
        return;
    };
    cancel_frame(shared);
    let weak = Rc::downgrade(shared);
    let cb = Closure::wrap(Box::new(move |_ts: f64| {
        with_shared(&weak, |shared| {
            shared.frame_handle.set(None);
            let actions = shared.viewport.borrow_mut().core.on_animation_frame(ticket);
            dispatch(shared, &actions);
        });
    }) as Box<dyn FnMut(f64)>);

    match window.request_animation_frame(cb.as_ref().unchecked_ref()) {
        Ok(handle) => {
            shared.frame_handle.set(Some(handle));
            *shared.frame_callback.borrow_mut() = Some(cb);
        }
        Err(e) => log::warn!("request_animation_frame failed: {e:?}"),
    }
}

fn cancel_frame(shared: &Shared) {
    if let Some(handle) = shared.frame_handle.take() {
        if let Some(window) = web_sys::window() {
            if let Err(e) = window.cancel_animation_frame(handle) {
                log::debug!("cancel_animation_frame failed: {e:?}");
            }
        }
    }
    let previous = shared.frame_callback.borrow_mut().take();
    *shared.retired_callback.borrow_mut() = previous;
}
