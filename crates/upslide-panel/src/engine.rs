//! Gesture-to-offset translation and snap engine.
//!
//! [`SlideEngine`] processes pointer events and nested-scroll callbacks
//! to compute the slide offset of the panel. The basic idea is to only
//! ever track the relative slide offset, never absolute pixel
//! coordinates, during animation or dragging. This prevents race
//! conditions with size changes: geometry is always derived from the
//! offset, not the other way round.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use upslide_core::constants::{DEFAULT_SNAP_DURATION_MS, MAX_FLING_VELOCITY, TOUCH_SLOP};
use upslide_core::{
    Easing, FrameRequest, FrameScheduler, Orientation, Point, Tween, VelocityTracker,
};
use web_time::Instant;

pub type PointerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    /// Primary pointer went down.
    Down,
    Move,
    /// Primary pointer went up; ends the gesture.
    Up,
    /// A secondary pointer went up; only relevant if it is the tracked one.
    PointerUp,
    Cancel,
}

/// Pointer event forwarded by the host.
#[derive(Debug, Clone, Copy)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub pointer: PointerId,
    /// Position relative to the host layout.
    pub position: Point,
    /// Position on screen, used against the draggable hit region.
    pub global_position: Point,
    /// Event timestamp in milliseconds, used for velocity tracking.
    pub time_ms: i64,
}

impl PointerEvent {
    pub fn new(
        kind: PointerEventKind,
        pointer: PointerId,
        position: Point,
        global_position: Point,
        time_ms: i64,
    ) -> Self {
        Self {
            kind,
            pointer,
            position,
            global_position,
            time_ms,
        }
    }

    pub fn down(position: Point, global_position: Point, time_ms: i64) -> Self {
        Self::new(PointerEventKind::Down, 0, position, global_position, time_ms)
    }

    pub fn moved(position: Point, time_ms: i64) -> Self {
        Self::new(PointerEventKind::Move, 0, position, position, time_ms)
    }

    pub fn up(position: Point, time_ms: i64) -> Self {
        Self::new(PointerEventKind::Up, 0, position, position, time_ms)
    }

    pub fn cancel(time_ms: i64) -> Self {
        Self::new(PointerEventKind::Cancel, 0, Point::default(), Point::default(), time_ms)
    }
}

/// Geometry queries the engine needs from whatever owns layout.
///
/// The engine depends only on this capability interface, never on a
/// concrete layout type.
pub trait GeometryProvider {
    /// Pixel travel distance of the panel between collapsed and expanded.
    /// A non-positive value means the panel has not been measured yet.
    fn drag_range(&self) -> f32;

    /// Maps a slide offset to the absolute top coordinate of the panel.
    fn compute_panel_top(&self, offset: f32) -> f32;

    /// Whether a screen coordinate lies within the draggable hit region.
    fn is_within_drag_region(&self, x: f32, y: f32) -> bool;

    /// Reposition panel, footer and parallax for the given offset.
    /// Invoked after every offset mutation.
    fn apply_geometry(&self, offset: f32);
}

/// Full host contract of the engine: geometry plus snap policy and the
/// notifications emitted while the panel moves.
pub trait SlideHost: GeometryProvider {
    /// Called before the panel may start moving, due to user interaction
    /// or a call to [`SlideEngine::slide_to`].
    fn on_drag_started(&self);

    /// Called whenever the panel position changed, user-driven or
    /// programmatically.
    fn on_offset_changed(&self, offset: f32);

    /// Called after the panel stopped moving on a stop.
    fn on_view_settled(&self, offset: f32);

    /// Whether the given release velocity counts as a fling.
    fn is_fling(&self, velocity: f32) -> bool;

    /// The offset the panel should settle on for the given release.
    fn calculate_snap_point(&self, offset: f32, fling_up: bool, fling_down: bool) -> f32;
}

/// Tunables of the gesture engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Minimum vertical travel before a touch becomes a drag.
    pub touch_slop: f32,
    /// Cap applied to computed fling velocities, px/s.
    pub max_fling_velocity: f32,
    /// Duration of the snap animation in milliseconds.
    pub snap_duration_ms: u64,
    /// Curve of the snap animation.
    pub snap_easing: Easing,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            touch_slop: TOUCH_SLOP,
            max_fling_velocity: MAX_FLING_VELOCITY,
            snap_duration_ms: DEFAULT_SNAP_DURATION_MS,
            snap_easing: Easing::QuinticOut,
        }
    }
}

/// Pointer tracking for one in-flight gesture.
struct DragSession {
    pointer: PointerId,
    touch_start: Point,
    last_drag_point: Point,
    tracker: VelocityTracker,
    /// Set once the gesture travelled past the touch slop.
    dragging: bool,
}

impl DragSession {
    fn new(pointer: PointerId, position: Point, time_ms: i64) -> Self {
        let mut tracker = VelocityTracker::new();
        tracker.add_sample(time_ms, position.y);
        Self {
            pointer,
            touch_start: position,
            last_drag_point: position,
            tracker,
            dragging: false,
        }
    }
}

/// Accumulators for one delegated nested-scroll gesture.
#[derive(Default)]
struct ScrollNegotiation {
    /// Net scroll distance reported by the child, in pixels.
    distance: f32,
    /// Pixels of that distance the panel consumed.
    consumed: f32,
    started: Option<Instant>,
}

struct RunningSnap {
    tween: Tween,
    generation: u64,
    /// Keeps the next tick registered; dropping it cancels the tick.
    _request: FrameRequest,
}

struct EngineState {
    slide_offset: f32,
    nested_scrolling_enabled: bool,
    drag: Option<DragSession>,
    scroll: ScrollNegotiation,
    animation: Option<RunningSnap>,
    next_generation: u64,
}

struct EngineShared {
    host: Rc<dyn SlideHost>,
    scheduler: Rc<dyn FrameScheduler>,
    config: EngineConfig,
    state: RefCell<EngineState>,
}

/// Tracks pointer input, negotiates scroll ownership with a nested
/// scrollable child, runs snap animations and exposes the resulting
/// continuous slide offset in `[-1, 1]`.
///
/// Cloning is cheap and shares the same engine.
#[derive(Clone)]
pub struct SlideEngine {
    shared: Rc<EngineShared>,
}

impl SlideEngine {
    pub fn new(
        host: Rc<dyn SlideHost>,
        scheduler: Rc<dyn FrameScheduler>,
        config: EngineConfig,
    ) -> Self {
        Self {
            shared: Rc::new(EngineShared {
                host,
                scheduler,
                config,
                state: RefCell::new(EngineState {
                    slide_offset: 0.0,
                    nested_scrolling_enabled: true,
                    drag: None,
                    scroll: ScrollNegotiation::default(),
                    animation: None,
                    next_generation: 0,
                }),
            }),
        }
    }

    pub fn is_nested_scrolling_enabled(&self) -> bool {
        self.shared.state.borrow().nested_scrolling_enabled
    }

    pub fn set_nested_scrolling_enabled(&self, enabled: bool) {
        self.shared.state.borrow_mut().nested_scrolling_enabled = enabled;
    }

    /// The current slide offset.
    pub fn slide_offset(&self) -> f32 {
        self.shared.state.borrow().slide_offset
    }

    /// Set the offset directly. Geometry is recomputed from the offset
    /// (never the reverse) and the position-changed notification fires.
    pub fn set_slide_offset(&self, offset: f32) {
        self.shared.state.borrow_mut().slide_offset = offset;
        self.shared.host.apply_geometry(offset);
        self.shared.host.on_offset_changed(offset);
    }

    /// Process one pointer event. Returns whether the event was consumed;
    /// unconsumed events should keep flowing to child views so plain taps
    /// still work.
    pub fn on_pointer_event(&self, event: &PointerEvent) -> bool {
        match event.kind {
            PointerEventKind::Down => {
                if self
                    .shared
                    .host
                    .is_within_drag_region(event.global_position.x, event.global_position.y)
                {
                    self.shared.state.borrow_mut().drag =
                        Some(DragSession::new(event.pointer, event.position, event.time_ms));
                }
                // Never claim the down event so children still see it.
                false
            }
            PointerEventKind::Move => self.on_pointer_move(event),
            PointerEventKind::Up | PointerEventKind::PointerUp | PointerEventKind::Cancel => {
                self.on_pointer_end(event)
            }
        }
    }

    fn on_pointer_move(&self, event: &PointerEvent) -> bool {
        enum Action {
            Ignore,
            NotYetDragging,
            StartDrag,
            Drag(f32),
        }

        let action = {
            let mut guard = self.shared.state.borrow_mut();
            let state = &mut *guard;
            match state.drag.as_mut() {
                None => Action::Ignore,
                // Only the pointer that went down in the drag region may
                // drive the panel.
                Some(drag) if drag.pointer != event.pointer => Action::Ignore,
                Some(drag) => {
                    drag.tracker.add_sample(event.time_ms, event.position.y);
                    if drag.dragging {
                        let delta = event.position.y - drag.last_drag_point.y;
                        drag.last_drag_point = event.position;
                        Action::Drag(delta)
                    } else if (event.position.y - drag.touch_start.y).abs()
                        > self.shared.config.touch_slop
                    {
                        drag.dragging = true;
                        drag.last_drag_point = event.position;
                        // A direct drag supersedes any in-flight snap; the
                        // cancelled tween must not fire a settle event.
                        state.animation = None;
                        Action::StartDrag
                    } else {
                        Action::NotYetDragging
                    }
                }
            }
        };

        match action {
            Action::Ignore | Action::NotYetDragging => false,
            Action::StartDrag => {
                self.shared.host.on_drag_started();
                true
            }
            Action::Drag(delta) => {
                self.move_panel_relative(delta);
                true
            }
        }
    }

    fn on_pointer_end(&self, event: &PointerEvent) -> bool {
        let session = {
            let mut state = self.shared.state.borrow_mut();
            let tracked = match state.drag.as_ref() {
                None => return false,
                Some(drag) => drag.pointer,
            };
            if event.kind == PointerEventKind::PointerUp && tracked != event.pointer {
                return false;
            }
            match state.drag.take() {
                Some(session) => session,
                None => return false,
            }
        };

        if session.dragging {
            // Note that a cancelled gesture is not snapped back to its
            // pre-drag offset, only to the nearest stop, same as a
            // release without measurable velocity.
            let velocity = session
                .tracker
                .velocity_capped(self.shared.config.max_fling_velocity);
            self.snap_with_velocity(velocity);
        }
        // Only consume the up event if the gesture had a dragging motion;
        // we do not want to steal clicks from child views.
        session.dragging
    }

    /// A nested scrollable child asks the panel to coordinate scrolling.
    ///
    /// Returns true iff nested scrolling is enabled and the axis is
    /// vertical. Accepting cancels any live drag session (the child, not
    /// the panel, owns direct touch from now on) and marks the panel as
    /// being indirectly moved.
    pub fn on_nested_scroll_accept(&self, orientation: Orientation) -> bool {
        let was_dragging = {
            let mut state = self.shared.state.borrow_mut();
            if !state.nested_scrolling_enabled {
                state.drag = None;
                return false;
            }
            if orientation != Orientation::Vertical {
                return false;
            }
            state.drag.take().map(|drag| drag.dragging).unwrap_or(false)
        };

        // If the drag session already passed the slop, the drag-started
        // notification has fired; do not fire a second one.
        if !was_dragging {
            self.shared.host.on_drag_started();
        }
        true
    }

    /// Reset the scroll accumulators at the start of an accepted scroll.
    pub fn on_nested_scroll_begin(&self) {
        self.shared.state.borrow_mut().scroll = ScrollNegotiation {
            distance: 0.0,
            consumed: 0.0,
            started: Some(Instant::now()),
        };
    }

    /// The child is about to scroll by `dy` (positive = downward).
    /// Returns how much of the motion the panel consumed; the child
    /// should only apply the remainder.
    pub fn on_nested_pre_scroll(&self, dy: f32) -> f32 {
        let offset = {
            let mut state = self.shared.state.borrow_mut();
            state.scroll.distance += dy;
            state.slide_offset
        };
        if dy > 0.0 && offset < 1.0 {
            // The child wants to scroll down but the panel is not fully
            // expanded; consume the motion to open the panel first.
            self.move_panel_by_scroll(dy)
        } else {
            0.0
        }
    }

    /// The child scrolled and reports unconsumed motion. Upward remainder
    /// (the child hit its top edge) collapses the panel.
    pub fn on_nested_scroll(&self, unconsumed_dy: f32) -> f32 {
        let offset = self.shared.state.borrow().slide_offset;
        if unconsumed_dy < 0.0 && offset > 0.0 {
            self.move_panel_by_scroll(unconsumed_dy)
        } else {
            0.0
        }
    }

    /// The nested scroll gesture ended; synthesize a velocity from the
    /// accumulated distance and snap exactly as a fling would.
    pub fn on_nested_scroll_end(&self) {
        let scroll = std::mem::take(&mut self.shared.state.borrow_mut().scroll);
        let started = match scroll.started {
            Some(started) => started,
            None => return,
        };
        let elapsed = started.elapsed();
        if scroll.distance != 0.0 && scroll.consumed != 0.0 && !elapsed.is_zero() {
            let scroll_velocity = scroll.distance / elapsed.as_secs_f32();
            log::debug!(
                "nested scroll ended: distance={} consumed={} velocity={}",
                scroll.distance,
                scroll.consumed,
                scroll_velocity
            );
            self.snap_with_velocity(-scroll_velocity);
        }
    }

    /// Programmatic slide request. Cancels a running snap and tweens to
    /// `target`, which is intentionally unclamped so the hidden offset
    /// `-1` and arbitrary anchors stay reachable.
    pub fn slide_to(&self, target: f32) {
        self.shared.state.borrow_mut().animation = None;
        self.shared.host.on_drag_started();
        self.animate_to(target);
    }

    fn move_panel_by_scroll(&self, dy: f32) -> f32 {
        let moved = self.move_panel_relative(-dy);
        // The panel moving up means a shrinking top coordinate, so the
        // moved distance is negative and needs inverting to express how
        // much scroll was consumed.
        let consumed = -moved;
        self.shared.state.borrow_mut().scroll.consumed += consumed;
        consumed
    }

    /// Move the panel by a pixel delta, clamped to `[0, 1]` (the hidden
    /// offset is only reachable programmatically). Returns the distance
    /// the panel top actually moved, in pixels.
    fn move_panel_relative(&self, delta_y_pixels: f32) -> f32 {
        let drag_range = self.shared.host.drag_range();
        if drag_range <= 0.0 {
            log::warn!("panel not measured yet (drag range {drag_range}); ignoring drag delta");
            return 0.0;
        }
        let old_offset = self.shared.state.borrow().slide_offset;
        let delta_offset = -delta_y_pixels / drag_range;
        let new_offset = (old_offset + delta_offset).clamp(0.0, 1.0);
        let previous_top = self.shared.host.compute_panel_top(old_offset);
        self.set_slide_offset(new_offset);
        self.shared.host.compute_panel_top(new_offset) - previous_top
    }

    fn snap_with_velocity(&self, velocity: f32) {
        let fling = self.shared.host.is_fling(velocity);
        let fling_up = velocity < 0.0 && fling;
        let fling_down = velocity > 0.0 && fling;

        let offset = self.shared.state.borrow().slide_offset;
        let snap_point = self
            .shared
            .host
            .calculate_snap_point(offset, fling_up, fling_down);
        log::debug!("snapping from {offset} to {snap_point} (velocity {velocity})");

        if snap_point == offset {
            self.shared.host.on_view_settled(offset);
            return;
        }
        self.animate_to(snap_point);
    }

    fn animate_to(&self, target: f32) {
        let (start, generation) = {
            let mut state = self.shared.state.borrow_mut();
            state.next_generation += 1;
            (state.slide_offset, state.next_generation)
        };
        let tween = Tween::new(
            start,
            target,
            self.shared.config.snap_duration_ms,
            self.shared.config.snap_easing,
        );
        let request = Self::schedule_tick(&self.shared, generation);
        self.shared.state.borrow_mut().animation = Some(RunningSnap {
            tween,
            generation,
            _request: request,
        });
    }

    fn schedule_tick(shared: &Rc<EngineShared>, generation: u64) -> FrameRequest {
        let weak: Weak<EngineShared> = Rc::downgrade(shared);
        let id = shared.scheduler.request_frame(Box::new(move |frame_time| {
            if let Some(shared) = weak.upgrade() {
                Self::on_frame(&shared, generation, frame_time);
            }
        }));
        FrameRequest::new(Rc::clone(&shared.scheduler), id)
    }

    fn on_frame(shared: &Rc<EngineShared>, generation: u64, frame_time_nanos: u64) {
        let (value, finished) = {
            let mut state = shared.state.borrow_mut();
            let snap = match state.animation.as_mut() {
                Some(snap) if snap.generation == generation => snap,
                _ => return,
            };
            let value = snap.tween.tick(frame_time_nanos);
            (value, snap.tween.finished())
        };

        let engine = SlideEngine {
            shared: Rc::clone(shared),
        };
        // Applying the offset notifies the host, which may reenter and
        // start a new animation; re-check the generation afterwards so a
        // superseded tween neither settles nor reschedules.
        engine.set_slide_offset(value);

        let settle = {
            let mut state = shared.state.borrow_mut();
            match state.animation.as_mut() {
                Some(snap) if snap.generation == generation => {
                    if finished {
                        state.animation = None;
                        Some(state.slide_offset)
                    } else {
                        snap._request = Self::schedule_tick(shared, generation);
                        None
                    }
                }
                _ => None,
            }
        };

        if let Some(offset) = settle {
            shared.host.on_view_settled(offset);
        }
    }
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
