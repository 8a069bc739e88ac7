#![allow(clippy::float_cmp)]

use std::cell::RefCell;
use std::rc::Rc;

use super::*;

// =============================================================
// Helpers
// =============================================================

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn approx_pt(a: Point, b: Point) -> bool {
    approx(a.x, b.x) && approx(a.y, b.y)
}

fn id(s: &str) -> EntityId {
    EntityId::from(s)
}

/// 600x600 canvas, 6px cells, fit scale 1 with the grid filling the canvas.
fn ready_core() -> ViewportCore {
    let mut core = ViewportCore::default();
    core.resize(600.0, 600.0, 1.0);
    core
}

/// Zoomed to 3x with the view in the middle of the grid, far from any bound.
fn zoomed_core() -> ViewportCore {
    let mut core = ready_core();
    core.camera = Camera { offset: pt(-600.0, -600.0), scale: 3.0 };
    core
}

fn one(x: f64, y: f64) -> Contacts {
    Contacts::One(pt(x, y))
}

fn two(a: Point, b: Point) -> Contacts {
    Contacts::Two(a, b)
}

fn record_selections(listeners: &mut SelectionListeners) -> Rc<RefCell<Vec<Option<EntityId>>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    listeners.register(move |entity| sink.borrow_mut().push(entity.map(|e| e.id.clone())));
    seen
}

fn selections(actions: &[Action]) -> Vec<Option<EntityId>> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::SelectionChanged(id) => Some(id.clone()),
            _ => None,
        })
        .collect()
}

fn click(core: &mut ViewportCore, x: f64, y: f64) -> Vec<Action> {
    core.on_pointer_down(one(x, y), 0.0);
    core.on_pointer_up(50.0)
}

fn scheduled(actions: &[Action]) -> Option<FrameTicket> {
    actions.iter().find_map(|a| match a {
        Action::ScheduleFrame(t) => Some(*t),
        _ => None,
    })
}

/// Drag left by 60px over 48ms on a zoomed core and release; returns the ticket.
fn fling_left(core: &mut ViewportCore) -> FrameTicket {
    core.on_pointer_down(one(300.0, 300.0), 0.0);
    core.on_pointer_move(one(280.0, 300.0), 16.0);
    core.on_pointer_move(one(260.0, 300.0), 32.0);
    core.on_pointer_move(one(240.0, 300.0), 48.0);
    let actions = core.on_pointer_up(50.0);
    scheduled(&actions).unwrap()
}

fn run_frames(core: &mut ViewportCore, ticket: FrameTicket) -> u32 {
    let mut frames = 0;
    loop {
        frames += 1;
        let actions = core.on_animation_frame(ticket);
        assert!(actions.contains(&Action::RenderNeeded));
        if scheduled(&actions).is_none() {
            return frames;
        }
        assert!(frames < 10_000, "inertia did not terminate");
    }
}

// =============================================================
// Construction / resize
// =============================================================

#[test]
fn new_core_is_not_ready() {
    let core = ViewportCore::default();
    assert!(!core.layout().is_ready());
    assert!(core.scene().is_blank());
    assert!(core.to_screen(pt(1.0, 1.0)).is_none());
    assert!(core.selection().is_none());
}

#[test]
fn first_resize_places_grid_at_fit_scale_centered() {
    let mut core = ViewportCore::default();
    let actions = core.resize(800.0, 600.0, 1.0);
    assert_eq!(actions, vec![Action::RenderNeeded]);
    assert_eq!(core.camera().scale, 1.0);
    assert!(approx_pt(core.camera().offset, pt(100.0, 0.0)));
}

#[test]
fn zero_area_resize_leaves_camera_untouched() {
    let mut core = zoomed_core();
    let before = core.camera();
    core.resize(0.0, 0.0, 1.0);
    assert_eq!(core.camera(), before);
    assert!(core.scene().is_blank());
}

#[test]
fn resize_zero_then_valid_is_renderable() {
    let mut core = ViewportCore::default();
    core.resize(0.0, 0.0, 1.0);
    core.resize(0.0, 400.0, 1.0);
    assert!(core.scene().is_blank());
    core.resize(600.0, 600.0, 2.0);
    let cam = core.camera();
    assert!(cam.offset.is_finite() && cam.scale.is_finite());
    assert_eq!(cam.scale, 1.0);
    assert!(!core.scene().is_blank());
    assert_eq!(core.layout().backing_size(), (1200, 1200));
}

#[test]
fn resize_ready_zero_ready_stays_clamped() {
    let mut core = zoomed_core();
    core.resize(0.0, 0.0, 1.0);
    core.resize(300.0, 300.0, 1.0);
    let cam = core.camera();
    assert!(cam.offset.is_finite() && cam.scale.is_finite());
    assert_eq!(core.layout().clamp_offset(cam.offset, cam.scale), cam.offset);
    assert_eq!(core.layout().clamp_scale(cam.scale), cam.scale);
}

#[test]
fn resize_keeps_center_point() {
    let mut core = zoomed_core();
    // Logical (50, 50) sits at the 600px canvas center.
    assert!(approx_pt(core.to_logical(pt(300.0, 300.0)).unwrap(), pt(50.0, 50.0)));
    core.resize(800.0, 600.0, 1.0);
    assert_eq!(core.camera().scale, 3.0);
    assert!(approx_pt(core.to_logical(pt(400.0, 300.0)).unwrap(), pt(50.0, 50.0)));
}

#[test]
fn custom_config_reaches_layout() {
    let config = ViewportConfig { grid_size: 50, cell_sizing: CellSizing::Fixed(10.0), ..ViewportConfig::default() };
    let mut core = ViewportCore::new(config);
    core.resize(400.0, 400.0, 1.0);
    assert_eq!(core.layout().grid_size, 50);
    assert_eq!(core.layout().cell_size(), Some(10.0));
    // 500px grid in a 400px canvas: fit scale below 1.
    assert!(approx(core.camera().scale, 0.8));
}

// =============================================================
// Render / entities
// =============================================================

#[test]
fn render_replaces_entities_and_focus() {
    let mut core = ready_core();
    core.render(vec![Entity::new("a", 1.0, 1.0), Entity::new("b", 2.0, 2.0)], Some(id("a")));
    assert_eq!(core.entities.len(), 2);
    assert_eq!(core.focused(), Some(&id("a")));

    core.render(vec![Entity::new("c", 3.0, 3.0)], None);
    assert_eq!(core.entities.len(), 1);
    assert!(core.entity(&id("a")).is_none());
    assert!(core.focused().is_none());
}

#[test]
fn render_empty_list_draws_grid_only() {
    let mut core = ready_core();
    let actions = core.render(Vec::new(), None);
    assert_eq!(actions, vec![Action::RenderNeeded]);
    let scene = core.scene();
    assert!(!scene.is_blank());
    assert!(!scene.shapes.iter().any(|s| matches!(s, crate::render::Shape::Dot { .. })));
}

#[test]
fn render_skips_invalid_coordinates() {
    let mut core = ready_core();
    core.render(vec![Entity::new("bad", f64::NAN, 1.0), Entity::new("good", 1.0, 1.0)], None);
    assert!(core.entity(&id("bad")).is_none());
    assert!(core.entity(&id("good")).is_some());
}

#[test]
fn render_before_ready_is_blank() {
    let mut core = ViewportCore::default();
    core.render(vec![Entity::new("a", 1.0, 1.0)], None);
    assert!(core.scene().is_blank());
}

#[test]
fn scene_is_repeatable() {
    let mut core = ready_core();
    core.render(vec![Entity::new("a", 10.0, 10.0)], Some(id("a")));
    assert_eq!(core.scene(), core.scene());
}

// =============================================================
// Click selection
// =============================================================

#[test]
fn self_entity_maps_to_canvas_center() {
    let mut core = ready_core();
    core.render(vec![Entity::new("self", 50.0, 50.0)], Some(id("self")));
    assert!(approx_pt(core.to_screen(pt(50.0, 50.0)).unwrap(), pt(300.0, 300.0)));
}

#[test]
fn click_on_marker_selects_it() {
    let mut core = ready_core();
    core.render(vec![Entity::new("self", 50.0, 50.0)], Some(id("self")));

    let actions = click(&mut core, 300.0, 300.0);
    assert_eq!(core.selection(), Some(&id("self")));
    assert_eq!(selections(&actions), vec![Some(id("self"))]);
    assert!(actions.contains(&Action::RenderNeeded));
    assert!(actions.contains(&Action::SetCursor(CURSOR_GRAB)));
    assert!(scheduled(&actions).is_none());
}

#[test]
fn click_on_empty_corner_selects_none() {
    let mut core = ready_core();
    core.render(vec![Entity::new("self", 50.0, 50.0)], Some(id("self")));

    click(&mut core, 300.0, 300.0);
    let actions = click(&mut core, 0.0, 0.0);
    assert!(core.selection().is_none());
    assert_eq!(selections(&actions), vec![None]);
}

#[test]
fn jitter_within_slop_is_still_a_click() {
    let mut core = ready_core();
    core.render(vec![Entity::new("self", 50.0, 50.0)], None);
    core.on_pointer_down(one(300.0, 300.0), 0.0);
    core.on_pointer_move(one(302.0, 301.0), 10.0);
    core.on_pointer_up(20.0);
    assert_eq!(core.selection(), Some(&id("self")));
}

#[test]
fn drag_beyond_slop_does_not_select() {
    let mut core = zoomed_core();
    core.render(vec![Entity::new("mid", 50.0, 50.0)], None);
    core.on_pointer_down(one(300.0, 300.0), 0.0);
    core.on_pointer_move(one(320.0, 300.0), 16.0);
    let up = core.on_pointer_up(300.0);
    assert!(core.selection().is_none());
    assert!(selections(&up).is_empty());
}

#[test]
fn cancel_does_not_select() {
    let mut core = ready_core();
    core.render(vec![Entity::new("self", 50.0, 50.0)], None);
    core.on_pointer_down(one(300.0, 300.0), 0.0);
    let actions = core.on_pointer_cancel();
    assert_eq!(actions, vec![Action::SetCursor(CURSOR_GRAB)]);
    assert!(core.selection().is_none());
    assert!(core.input.is_idle());
}

#[test]
fn listener_receives_full_record() {
    let mut core = ready_core();
    let mut entity = Entity::new(7, 50.0, 50.0).with_display_name("Castle");
    entity.attributes.insert("population".into(), serde_json::json!(120));
    core.render(vec![entity.clone()], None);

    let got = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&got);
    let mut listeners = SelectionListeners::default();
    listeners.register(move |e| *sink.borrow_mut() = e.cloned());
    let actions = click(&mut core, 300.0, 300.0);
    for change in selection_changes(&core, &actions) {
        listeners.notify(change.as_ref());
    }
    assert_eq!(got.borrow().as_ref(), Some(&entity));
}

#[test]
fn every_listener_is_notified() {
    let mut core = ready_core();
    let listeners = RefCell::new(SelectionListeners::default());
    let first = record_selections(&mut listeners.borrow_mut());
    let second = record_selections(&mut listeners.borrow_mut());
    let actions = click(&mut core, 10.0, 10.0);
    SelectionListeners::deliver(&listeners, selection_changes(&core, &actions));
    assert_eq!(*first.borrow(), vec![None]);
    assert_eq!(*second.borrow(), vec![None]);
}

#[test]
fn selection_changes_ignore_other_actions() {
    let core = ready_core();
    assert!(selection_changes(&core, &[Action::RenderNeeded, Action::SetCursor(CURSOR_GRAB)]).is_empty());
}

#[test]
fn listener_may_reenter_viewport() {
    let core = Rc::new(RefCell::new(ready_core()));
    let listeners = Rc::new(RefCell::new(SelectionListeners::default()));
    core.borrow_mut().render(vec![Entity::new("mid", 50.0, 50.0), Entity::new("far", 20.0, 70.0)], None);

    let handle = Rc::downgrade(&core);
    let registry = Rc::downgrade(&listeners);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    listeners.borrow_mut().register(move |entity| {
        sink.borrow_mut().push(entity.map(|e| e.id.clone()));
        if let Some(core) = handle.upgrade() {
            let mut core = core.borrow_mut();
            core.center_on_entity(&EntityId::from("far"));
            assert!(core.selection().is_some());
        }
        if let Some(registry) = registry.upgrade() {
            registry.borrow_mut().register(|_| {});
        }
    });

    let actions = {
        let mut core = core.borrow_mut();
        core.on_pointer_down(one(300.0, 300.0), 0.0);
        core.on_pointer_up(50.0)
    };
    let changes = selection_changes(&core.borrow(), &actions);
    SelectionListeners::deliver(&listeners, changes);

    assert_eq!(*seen.borrow(), vec![Some(id("mid"))]);
    assert_eq!(listeners.borrow().len(), 2);
}

#[test]
fn stale_selection_cleared_on_refresh() {
    let mut core = ready_core();
    core.render(vec![Entity::new("a", 50.0, 50.0)], None);
    click(&mut core, 300.0, 300.0);
    assert_eq!(core.selection(), Some(&id("a")));

    let actions = core.render(vec![Entity::new("b", 10.0, 10.0)], None);
    assert!(core.selection().is_none());
    assert_eq!(actions, vec![Action::RenderNeeded, Action::SelectionChanged(None)]);
}

#[test]
fn surviving_selection_kept_on_refresh() {
    let mut core = ready_core();
    core.render(vec![Entity::new("a", 50.0, 50.0)], None);
    click(&mut core, 300.0, 300.0);
    let actions = core.render(vec![Entity::new("a", 51.0, 50.0)], None);
    assert_eq!(core.selection(), Some(&id("a")));
    assert!(selections(&actions).is_empty());
}

#[test]
fn pointer_down_before_ready_is_ignored() {
    let mut core = ViewportCore::default();
    assert!(core.on_pointer_down(one(10.0, 10.0), 0.0).is_empty());
    assert!(core.input.is_idle());
}

// =============================================================
// Drag
// =============================================================

#[test]
fn drag_pans_camera() {
    let mut core = zoomed_core();
    let down = core.on_pointer_down(one(300.0, 300.0), 0.0);
    assert_eq!(down, vec![Action::SetCursor(CURSOR_GRABBING)]);
    let actions = core.on_pointer_move(one(280.0, 290.0), 16.0);
    assert_eq!(actions, vec![Action::RenderNeeded]);
    assert!(approx_pt(core.camera().offset, pt(-620.0, -610.0)));
}

#[test]
fn drag_is_clamped_at_fit_scale() {
    let mut core = ready_core();
    core.on_pointer_down(one(300.0, 300.0), 0.0);
    core.on_pointer_move(one(400.0, 250.0), 16.0);
    assert!(approx_pt(core.camera().offset, pt(16.0, -16.0)));
}

#[test]
fn drag_against_bound_reports_nothing() {
    let mut core = ready_core();
    core.on_pointer_down(one(300.0, 300.0), 0.0);
    core.on_pointer_move(one(400.0, 400.0), 16.0);
    assert!(core.on_pointer_move(one(450.0, 450.0), 32.0).is_empty());
}

#[test]
fn move_without_gesture_is_ignored() {
    let mut core = zoomed_core();
    let before = core.camera();
    assert!(core.on_pointer_move(one(10.0, 10.0), 0.0).is_empty());
    assert_eq!(core.camera(), before);
}

// =============================================================
// Inertia
// =============================================================

#[test]
fn fling_starts_inertia() {
    let mut core = zoomed_core();
    fling_left(&mut core);
    assert!(core.is_animating());
    assert!(approx(core.camera().offset.x, -660.0));
}

#[test]
fn inertia_coasts_and_stops() {
    let mut core = zoomed_core();
    let ticket = fling_left(&mut core);
    let frames = run_frames(&mut core, ticket);
    assert!(frames <= 100, "took {frames} frames");
    assert!(!core.is_animating());
    let x = core.camera().offset.x;
    assert!(x < -660.0 && x.is_finite());
    assert!(approx(core.camera().offset.y, -600.0));
}

#[test]
fn frame_after_finish_is_inert() {
    let mut core = zoomed_core();
    let ticket = fling_left(&mut core);
    run_frames(&mut core, ticket);
    let before = core.camera();
    assert!(core.on_animation_frame(ticket).is_empty());
    assert_eq!(core.camera(), before);
}

#[test]
fn release_after_pause_has_no_inertia() {
    let mut core = zoomed_core();
    core.on_pointer_down(one(300.0, 300.0), 0.0);
    core.on_pointer_move(one(280.0, 300.0), 16.0);
    core.on_pointer_move(one(260.0, 300.0), 32.0);
    let actions = core.on_pointer_up(500.0);
    assert!(scheduled(&actions).is_none());
    assert!(!core.is_animating());
}

#[test]
fn cancel_mid_drag_still_coasts() {
    let mut core = zoomed_core();
    core.on_pointer_down(one(300.0, 300.0), 0.0);
    core.on_pointer_move(one(280.0, 300.0), 16.0);
    core.on_pointer_move(one(260.0, 300.0), 32.0);
    let actions = core.on_pointer_cancel();
    assert!(scheduled(&actions).is_some());
}

#[test]
fn new_gesture_cancels_inertia() {
    let mut core = zoomed_core();
    let ticket = fling_left(&mut core);
    core.on_animation_frame(ticket);

    core.on_pointer_down(one(100.0, 100.0), 1000.0);
    assert!(!core.is_animating());
    let before = core.camera();
    assert!(core.on_animation_frame(ticket).is_empty());
    assert_eq!(core.camera(), before);
}

#[test]
fn second_fling_gets_fresh_ticket() {
    let mut core = zoomed_core();
    let first = fling_left(&mut core);
    let second = fling_left(&mut core);
    assert_ne!(first, second);
    assert!(core.on_animation_frame(first).is_empty());
    assert!(!core.on_animation_frame(second).is_empty());
}

#[test]
fn inertia_stops_at_boundary() {
    let mut core = ready_core();
    core.camera = Camera { offset: pt(-10.0, -600.0), scale: 3.0 };
    core.on_pointer_down(one(100.0, 300.0), 0.0);
    core.on_pointer_move(one(120.0, 300.0), 16.0);
    core.on_pointer_move(one(140.0, 300.0), 32.0);
    assert!(approx(core.camera().offset.x, 16.0));
    let ticket = scheduled(&core.on_pointer_up(34.0)).unwrap();

    let actions = core.on_animation_frame(ticket);
    assert_eq!(actions, vec![Action::RenderNeeded]);
    assert!(!core.is_animating());
    assert!(approx(core.camera().offset.x, 16.0));
}

#[test]
fn center_on_entity_cancels_inertia() {
    let mut core = zoomed_core();
    core.render(vec![Entity::new("a", 20.0, 70.0)], None);
    let ticket = fling_left(&mut core);
    core.center_on_entity(&id("a"));
    assert!(!core.is_animating());
    assert!(core.on_animation_frame(ticket).is_empty());
}

// =============================================================
// Pinch
// =============================================================

#[test]
fn pinch_zooms_around_anchor() {
    let mut core = ready_core();
    core.on_pointer_down(two(pt(200.0, 300.0), pt(400.0, 300.0)), 0.0);
    assert!(matches!(core.input, InputState::Pinching { .. }));

    let actions = core.on_pointer_move(two(pt(100.0, 300.0), pt(500.0, 300.0)), 16.0);
    assert_eq!(actions, vec![Action::RenderNeeded]);
    let cam = core.camera();
    assert!(approx(cam.scale, 2.0));
    assert!(approx_pt(cam.offset, pt(-300.0, -300.0)));
    assert!(approx_pt(core.to_screen(pt(50.0, 50.0)).unwrap(), pt(300.0, 300.0)));
}

#[test]
fn pinch_scale_is_bounded() {
    let mut core = ready_core();
    core.on_pointer_down(two(pt(290.0, 300.0), pt(310.0, 300.0)), 0.0);
    core.on_pointer_move(two(pt(0.0, 300.0), pt(600.0, 300.0)), 16.0);
    assert_eq!(core.camera().scale, 3.0);

    core.on_pointer_move(two(pt(299.0, 300.0), pt(301.0, 300.0)), 32.0);
    assert_eq!(core.camera().scale, 1.0);
}

#[test]
fn pinch_release_has_no_inertia() {
    let mut core = ready_core();
    core.on_pointer_down(two(pt(200.0, 300.0), pt(400.0, 300.0)), 0.0);
    core.on_pointer_move(two(pt(100.0, 300.0), pt(500.0, 300.0)), 16.0);
    let actions = core.on_pointer_up(20.0);
    assert!(scheduled(&actions).is_none());
    assert!(core.input.is_idle());
    assert!(!core.is_animating());
}

#[test]
fn coincident_contacts_do_not_pinch() {
    let mut core = ready_core();
    core.on_pointer_down(two(pt(300.0, 300.0), pt(300.0, 300.0)), 0.0);
    assert!(core.input.is_idle());
}

#[test]
fn second_contact_turns_drag_into_pinch() {
    let mut core = ready_core();
    core.on_pointer_down(one(200.0, 300.0), 0.0);
    core.on_pointer_move(two(pt(200.0, 300.0), pt(400.0, 300.0)), 16.0);
    assert!(matches!(core.input, InputState::Pinching { initial_scale, .. } if initial_scale == 1.0));
}

#[test]
fn pinch_cancels_inertia() {
    let mut core = zoomed_core();
    fling_left(&mut core);
    core.on_pointer_down(two(pt(200.0, 300.0), pt(400.0, 300.0)), 100.0);
    assert!(!core.is_animating());
}

// =============================================================
// Wheel
// =============================================================

#[test]
fn wheel_zooms_in_at_pointer() {
    let mut core = ready_core();
    let actions = core.on_wheel(pt(150.0, 150.0), WheelDelta { dx: 0.0, dy: -100.0 });
    assert_eq!(actions, vec![Action::RenderNeeded]);
    assert!(approx(core.camera().scale, 1.1));
    assert!(approx_pt(core.to_screen(pt(25.0, 25.0)).unwrap(), pt(150.0, 150.0)));
}

#[test]
fn wheel_out_at_fit_is_noop() {
    let mut core = ready_core();
    let before = core.camera();
    assert!(core.on_wheel(pt(300.0, 300.0), WheelDelta { dx: 0.0, dy: 100.0 }).is_empty());
    assert_eq!(core.camera(), before);
}

#[test]
fn wheel_without_vertical_delta_is_noop() {
    let mut core = ready_core();
    assert!(core.on_wheel(pt(300.0, 300.0), WheelDelta { dx: 40.0, dy: 0.0 }).is_empty());
}

#[test]
fn wheel_scale_stays_in_bounds() {
    let mut core = ready_core();
    for i in 0..50 {
        core.on_wheel(pt(f64::from(i) * 10.0, 200.0), WheelDelta { dx: 0.0, dy: -1.0 });
        let s = core.camera().scale;
        assert!((1.0..=3.0).contains(&s), "scale {s}");
    }
    assert!(approx(core.camera().scale, 3.0));
    for _ in 0..50 {
        core.on_wheel(pt(300.0, 300.0), WheelDelta { dx: 0.0, dy: 1.0 });
        let s = core.camera().scale;
        assert!((1.0..=3.0).contains(&s), "scale {s}");
    }
    assert!(approx(core.camera().scale, 1.0));
}

#[test]
fn mixed_zoom_keeps_offset_clamped() {
    let mut core = ready_core();
    core.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 0.0, dy: -1.0 });
    core.on_pointer_down(two(pt(0.0, 0.0), pt(10.0, 10.0)), 0.0);
    core.on_pointer_move(two(pt(0.0, 0.0), pt(300.0, 300.0)), 16.0);
    core.on_pointer_up(20.0);
    core.on_wheel(pt(600.0, 600.0), WheelDelta { dx: 0.0, dy: 1.0 });
    let cam = core.camera();
    assert_eq!(core.layout().clamp_offset(cam.offset, cam.scale), cam.offset);
}

// =============================================================
// center_on_entity
// =============================================================

#[test]
fn center_on_entity_moves_it_to_center() {
    let mut core = zoomed_core();
    core.render(vec![Entity::new("a", 20.0, 70.0)], None);
    let actions = core.center_on_entity(&id("a"));
    assert_eq!(actions, vec![Action::RenderNeeded]);
    assert_eq!(core.camera().scale, 3.0);
    assert!(approx_pt(core.to_screen(pt(20.0, 70.0)).unwrap(), pt(300.0, 300.0)));
}

#[test]
fn center_on_corner_entity_is_clamped() {
    let mut core = zoomed_core();
    core.render(vec![Entity::new("corner", 0.0, 0.0)], None);
    core.center_on_entity(&id("corner"));
    assert!(approx_pt(core.camera().offset, pt(16.0, 16.0)));
}

#[test]
fn center_on_unknown_entity_is_noop() {
    let mut core = zoomed_core();
    core.render(vec![Entity::new("a", 20.0, 70.0)], None);
    let before = core.camera();
    assert!(core.center_on_entity(&id("missing")).is_empty());
    assert_eq!(core.camera(), before);
}

#[test]
fn center_before_ready_is_noop() {
    let mut core = ViewportCore::default();
    core.render(vec![Entity::new("a", 20.0, 70.0)], None);
    assert!(core.center_on_entity(&id("a")).is_empty());
}

// =============================================================
// Teardown
// =============================================================

#[test]
fn teardown_stops_inertia_and_input() {
    let mut core = zoomed_core();
    core.render(vec![Entity::new("mid", 50.0, 50.0)], None);
    let ticket = fling_left(&mut core);

    core.teardown();
    assert!(core.is_torn_down());
    assert!(!core.is_animating());
    let before = core.camera();
    assert!(core.on_animation_frame(ticket).is_empty());
    assert!(core.on_pointer_down(one(300.0, 300.0), 0.0).is_empty());
    assert!(core.on_pointer_up(10.0).is_empty());
    assert!(core.on_wheel(pt(300.0, 300.0), WheelDelta { dx: 0.0, dy: -1.0 }).is_empty());
    assert!(core.resize(800.0, 800.0, 1.0).is_empty());
    assert_eq!(core.camera(), before);
    assert!(core.render(Vec::new(), None).is_empty());
    assert_eq!(core.entities.len(), 1);
}

#[test]
fn closed_listeners_are_dropped() {
    let listeners = RefCell::new(SelectionListeners::default());
    let seen = record_selections(&mut listeners.borrow_mut());
    SelectionListeners::deliver(&listeners, vec![None]);
    listeners.borrow_mut().close();
    SelectionListeners::deliver(&listeners, vec![None]);
    listeners.borrow_mut().register(|_| {});

    assert_eq!(seen.borrow().len(), 1);
    assert!(listeners.borrow().is_empty());
    assert_eq!(Rc::strong_count(&seen), 1);
}

#[test]
fn closing_during_delivery_drops_listeners() {
    let listeners = Rc::new(RefCell::new(SelectionListeners::default()));
    let registry = Rc::downgrade(&listeners);
    listeners.borrow_mut().register(move |_| {
        if let Some(registry) = registry.upgrade() {
            registry.borrow_mut().close();
        }
    });
    SelectionListeners::deliver(&listeners, vec![None]);
    assert!(listeners.borrow().is_empty());
}

#[test]
fn teardown_twice_is_harmless() {
    let mut core = ready_core();
    core.teardown();
    core.teardown();
    assert!(core.is_torn_down());
}
