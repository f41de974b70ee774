use super::*;

use std::cell::Cell;

use upslide_core::{ManualScheduler, Point};

use crate::PointerEventKind;

const FRAME: u64 = 16_666_667;

struct TestGeometry {
    drag_range: Cell<f32>,
    panel_height: f32,
    footer_height: f32,
    total_height: f32,
    applied: RefCell<Vec<f32>>,
}

impl TestGeometry {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            drag_range: Cell::new(400.0),
            panel_height: 68.0,
            footer_height: 0.0,
            total_height: 800.0,
            applied: RefCell::new(Vec::new()),
        })
    }
}

impl GeometryProvider for TestGeometry {
    fn drag_range(&self) -> f32 {
        self.drag_range.get()
    }

    fn compute_panel_top(&self, offset: f32) -> f32 {
        let peek = self.footer_height + self.panel_height;
        let slide_pixels = if offset >= 0.0 {
            peek + offset * self.drag_range.get()
        } else {
            peek * (1.0 + offset)
        };
        (self.total_height - slide_pixels).min(self.total_height)
    }

    fn is_within_drag_region(&self, _x: f32, _y: f32) -> bool {
        true
    }

    fn apply_geometry(&self, offset: f32) {
        self.applied.borrow_mut().push(offset);
    }
}

#[derive(Default)]
struct RecordingListener {
    slides: RefCell<Vec<f32>>,
    transitions: RefCell<Vec<(PanelState, PanelState)>>,
}

impl PanelSlideListener for RecordingListener {
    fn on_panel_slide(&self, offset: f32) {
        self.slides.borrow_mut().push(offset);
    }

    fn on_panel_state_changed(&self, previous: PanelState, new: PanelState) {
        self.transitions.borrow_mut().push((previous, new));
    }
}

struct Fixture {
    panel: SlidingPanel,
    geometry: Rc<TestGeometry>,
    scheduler: Rc<ManualScheduler>,
    listener: Rc<RecordingListener>,
}

fn fixture_with(config: PanelConfig) -> Fixture {
    let geometry = TestGeometry::new();
    let scheduler = ManualScheduler::new();
    let panel = SlidingPanel::new(geometry.clone(), scheduler.clone(), config);
    let listener = Rc::new(RecordingListener::default());
    panel.add_panel_slide_listener(listener.clone());
    Fixture {
        panel,
        geometry,
        scheduler,
        listener,
    }
}

fn fixture() -> Fixture {
    fixture_with(PanelConfig::default())
}

fn pump_to_completion(scheduler: &ManualScheduler) {
    let mut now = 0u64;
    for _ in 0..200 {
        if !scheduler.has_pending() {
            return;
        }
        now += FRAME;
        scheduler.pump(now);
    }
    panic!("animation did not finish within 200 frames");
}

fn pointer(kind: PointerEventKind, y: f32, time_ms: i64) -> PointerEvent {
    let point = Point::new(100.0, y);
    PointerEvent::new(kind, 0, point, point, time_ms)
}

#[test]
fn set_state_rejects_dragging() {
    let fx = fixture();
    assert_eq!(
        fx.panel.set_state(PanelState::Dragging),
        Err(PanelError::InvalidTargetState)
    );
    assert_eq!(fx.panel.state(), PanelState::Collapsed);
    assert!(fx.listener.transitions.borrow().is_empty());
}

#[test]
fn set_state_before_layout_applies_directly() {
    let fx = fixture();
    fx.panel.set_state(PanelState::Expanded).unwrap();

    assert_eq!(fx.panel.state(), PanelState::Expanded);
    assert_eq!(
        fx.listener.transitions.borrow().as_slice(),
        &[(PanelState::Collapsed, PanelState::Expanded)]
    );
    assert!(!fx.scheduler.has_pending(), "no animation before layout");
}

#[test]
fn first_layout_positions_panel_for_initial_state() {
    let fx = fixture_with(PanelConfig {
        initial_state: PanelState::Expanded,
        ..PanelConfig::default()
    });
    fx.panel.on_layout();

    assert_eq!(fx.panel.slide_offset(), 1.0);
    assert_eq!(fx.geometry.applied.borrow().last(), Some(&1.0));
    assert_eq!(fx.panel.state(), PanelState::Expanded);
    // Subsequent layout passes leave the offset alone.
    fx.panel.set_state(PanelState::Collapsed).unwrap();
    pump_to_completion(&fx.scheduler);
    fx.panel.on_layout();
    assert_eq!(fx.panel.slide_offset(), 0.0);
}

#[test]
fn anchored_initial_state_without_travel_collapses() {
    let fx = fixture_with(PanelConfig {
        initial_state: PanelState::Anchored,
        anchor_point: 0.5,
        ..PanelConfig::default()
    });
    fx.geometry.drag_range.set(0.0);
    fx.panel.on_layout();
    assert_eq!(fx.panel.slide_offset(), 0.0);
}

#[test]
fn set_state_is_idempotent() {
    let fx = fixture();
    fx.panel.on_layout();
    fx.panel.set_state(PanelState::Collapsed).unwrap();

    assert!(fx.listener.transitions.borrow().is_empty());
    assert!(fx.listener.slides.borrow().len() <= 1);
    assert!(!fx.scheduler.has_pending());
}

#[test]
fn animated_expand_passes_through_dragging() {
    let fx = fixture();
    fx.panel.on_layout();
    fx.panel.set_state(PanelState::Expanded).unwrap();

    // The discrete state flips to Dragging immediately; the target state
    // is only reached when the animation settles.
    assert_eq!(fx.panel.state(), PanelState::Dragging);
    pump_to_completion(&fx.scheduler);

    assert_eq!(fx.panel.state(), PanelState::Expanded);
    assert_eq!(fx.panel.slide_offset(), 1.0);
    assert_eq!(
        fx.listener.transitions.borrow().as_slice(),
        &[
            (PanelState::Collapsed, PanelState::Dragging),
            (PanelState::Dragging, PanelState::Expanded),
        ]
    );
    let slides = fx.listener.slides.borrow();
    assert!(!slides.is_empty());
    assert_eq!(*slides.last().unwrap(), 1.0);
}

#[test]
fn anchored_transition_settles_on_anchor() {
    let fx = fixture_with(PanelConfig {
        anchor_point: 0.6,
        ..PanelConfig::default()
    });
    fx.panel.on_layout();
    fx.panel.set_state(PanelState::Anchored).unwrap();
    pump_to_completion(&fx.scheduler);

    assert_eq!(fx.panel.state(), PanelState::Anchored);
    assert!((fx.panel.slide_offset() - 0.6).abs() < 1e-6);
}

#[test]
fn hidden_panel_is_not_draggable() {
    let fx = fixture();
    fx.panel.on_layout();
    fx.panel.set_state(PanelState::Hidden).unwrap();
    pump_to_completion(&fx.scheduler);
    assert_eq!(fx.panel.state(), PanelState::Hidden);
    assert_eq!(fx.panel.slide_offset(), -1.0);
    assert!(!fx.panel.is_touch_enabled());

    assert!(!fx.panel.on_pointer_event(&pointer(PointerEventKind::Down, 600.0, 0)));
    assert!(!fx.panel.on_pointer_event(&pointer(PointerEventKind::Move, 500.0, 10)));
    assert_eq!(fx.panel.state(), PanelState::Hidden);
}

#[test]
fn disabled_panel_ignores_gestures_and_state_changes() {
    let fx = fixture();
    fx.panel.on_layout();
    fx.panel.set_touch_enabled(false);

    assert!(!fx.panel.on_pointer_event(&pointer(PointerEventKind::Down, 600.0, 0)));
    assert!(!fx.panel.on_pointer_event(&pointer(PointerEventKind::Move, 500.0, 10)));

    fx.panel.set_state(PanelState::Expanded).unwrap();
    assert_eq!(fx.panel.state(), PanelState::Collapsed);
}

#[test]
fn anchor_point_outside_unit_range_is_ignored() {
    let fx = fixture();
    fx.panel.set_anchor_point(0.7);
    assert_eq!(fx.panel.anchor_point(), 0.7);

    fx.panel.set_anchor_point(0.0);
    assert_eq!(fx.panel.anchor_point(), 0.7);
    fx.panel.set_anchor_point(-0.3);
    assert_eq!(fx.panel.anchor_point(), 0.7);
    fx.panel.set_anchor_point(1.5);
    assert_eq!(fx.panel.anchor_point(), 0.7);

    fx.panel.set_anchor_point(1.0);
    assert_eq!(fx.panel.anchor_point(), 1.0);
}

#[test]
fn drag_marks_dragging_and_remembers_prior_state() {
    let fx = fixture();
    fx.panel.on_layout();

    fx.panel.on_pointer_event(&pointer(PointerEventKind::Down, 600.0, 0));
    fx.panel.on_pointer_event(&pointer(PointerEventKind::Move, 580.0, 10));

    assert_eq!(fx.panel.state(), PanelState::Dragging);
    assert_eq!(fx.panel.serializable_state(), PanelState::Collapsed);
}

#[test]
fn restore_state_defaults_to_collapsed() {
    let fx = fixture();
    fx.panel.set_state(PanelState::Expanded).unwrap();

    fx.panel.restore_state(None);
    assert_eq!(fx.panel.state(), PanelState::Collapsed);

    fx.panel.restore_state(Some(PanelState::Dragging));
    assert_eq!(fx.panel.state(), PanelState::Collapsed);

    fx.panel.restore_state(Some(PanelState::Anchored));
    assert_eq!(fx.panel.state(), PanelState::Anchored);
    // Restoring re-arms the layout pass.
    fx.panel.set_anchor_point(0.5);
    fx.panel.on_layout();
    assert!((fx.panel.slide_offset() - 0.5).abs() < 1e-6);
}

#[test]
fn toggle_expands_collapses_and_honors_anchor() {
    let fx = fixture();
    fx.panel.on_layout();

    fx.panel.toggle();
    pump_to_completion(&fx.scheduler);
    assert_eq!(fx.panel.state(), PanelState::Expanded);

    fx.panel.toggle();
    pump_to_completion(&fx.scheduler);
    assert_eq!(fx.panel.state(), PanelState::Collapsed);

    let anchored = fixture_with(PanelConfig {
        anchor_point: 0.5,
        ..PanelConfig::default()
    });
    anchored.panel.on_layout();
    anchored.panel.toggle();
    pump_to_completion(&anchored.scheduler);
    assert_eq!(anchored.panel.state(), PanelState::Anchored);
}

struct SelfRemovingListener {
    panel: RefCell<Option<Rc<SlidingPanel>>>,
    me: RefCell<Option<Rc<dyn PanelSlideListener>>>,
    calls: Cell<usize>,
}

impl PanelSlideListener for SelfRemovingListener {
    fn on_panel_state_changed(&self, _previous: PanelState, _new: PanelState) {
        self.calls.set(self.calls.get() + 1);
        let panel = self.panel.borrow().clone();
        let me = self.me.borrow().clone();
        if let (Some(panel), Some(me)) = (panel, me) {
            panel.remove_panel_slide_listener(&me);
        }
    }
}

#[test]
fn listener_can_remove_itself_during_dispatch() {
    let geometry = TestGeometry::new();
    let scheduler = ManualScheduler::new();
    let panel = Rc::new(SlidingPanel::new(
        geometry,
        scheduler,
        PanelConfig::default(),
    ));

    let removing = Rc::new(SelfRemovingListener {
        panel: RefCell::new(Some(panel.clone())),
        me: RefCell::new(None),
        calls: Cell::new(0),
    });
    let removing_dyn: Rc<dyn PanelSlideListener> = removing.clone();
    *removing.me.borrow_mut() = Some(removing_dyn.clone());

    let recorder = Rc::new(RecordingListener::default());
    panel.add_panel_slide_listener(removing_dyn);
    panel.add_panel_slide_listener(recorder.clone());

    panel.set_state(PanelState::Expanded).unwrap();
    assert_eq!(removing.calls.get(), 1);
    assert_eq!(recorder.transitions.borrow().len(), 1);

    panel.set_state(PanelState::Collapsed).unwrap();
    assert_eq!(removing.calls.get(), 1, "removed listener was notified again");
    assert_eq!(recorder.transitions.borrow().len(), 2);
}

#[test]
fn compute_panel_top_is_monotonic_non_increasing() {
    let geometry = TestGeometry::new();
    let mut previous = f32::INFINITY;
    let mut offset = -1.0f32;
    while offset <= 1.0 {
        let top = geometry.compute_panel_top(offset);
        assert!(
            top <= previous,
            "panel top increased at offset {offset}: {top} > {previous}"
        );
        previous = top;
        offset += 0.01;
    }
}

#[test]
fn snap_target_picks_nearest_stop_without_fling() {
    // 0.3 is closest to the collapsed stop.
    assert_eq!(snap_target(0.3, 0.7, false, false), 0.0);
    assert_eq!(snap_target(0.6, 0.7, false, false), 0.7);
    assert_eq!(snap_target(0.9, 0.7, false, false), 1.0);
}

#[test]
fn snap_target_breaks_ties_towards_the_lower_stop() {
    // Equidistant between collapsed and the anchor.
    assert_eq!(snap_target(0.25, 0.5, false, false), 0.0);
    // Equidistant between the anchor and expanded.
    assert_eq!(snap_target(0.75, 0.5, false, false), 0.5);
}

#[test]
fn snap_target_follows_fling_direction() {
    assert_eq!(snap_target(0.9, 0.7, true, false), 1.0);
    assert_eq!(snap_target(0.5, 0.7, true, false), 0.7);
    assert_eq!(snap_target(0.5, 0.7, false, true), 0.0);
    assert_eq!(snap_target(0.8, 0.7, false, true), 0.7);
}
