//! Panel state machine and listener dispatch.
//!
//! [`SlidingPanel`] wraps the gesture engine and maps the continuous
//! slide offset, plus the explicit "dragging in progress" signal, onto
//! the five discrete [`PanelState`] values. The discrete state only ever
//! changes when the engine reports a drag start or a settle; this keeps
//! state and offset from diverging when an animation is interrupted.

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;
use upslide_core::FrameScheduler;

use crate::engine::{
    EngineConfig, GeometryProvider, PointerEvent, SlideEngine, SlideHost,
};
use crate::{Orientation, PanelError, PanelState};

/// Tolerance for classifying a settled offset against the exact stops.
const OFFSET_EPSILON: f32 = 1e-6;

fn offset_eq(value: f32, expected: f32) -> bool {
    (value - expected).abs() < OFFSET_EPSILON
}

/// Determine the offset the panel should settle on after a release.
///
/// A decisive fling moves towards the next stop in its direction; without
/// one, the nearest of collapsed, anchor and expanded wins, with ties
/// broken towards the lower stop.
pub fn snap_target(offset: f32, anchor: f32, fling_up: bool, fling_down: bool) -> f32 {
    if fling_up {
        if offset > anchor {
            1.0
        } else {
            anchor
        }
    } else if fling_down {
        if offset < anchor {
            0.0
        } else {
            anchor
        }
    } else {
        let to_collapsed = offset.abs();
        let to_anchor = (offset - anchor).abs();
        let to_expanded = (1.0 - offset).abs();
        if to_collapsed <= to_anchor && to_collapsed <= to_expanded {
            0.0
        } else if to_anchor <= to_expanded {
            anchor
        } else {
            1.0
        }
    }
}

/// Listener for monitoring a sliding panel.
///
/// Both methods have empty default bodies so implementers can pick the
/// subset they care about.
pub trait PanelSlideListener {
    /// Called on every position change with the raw offset in `[-1, 1]`.
    fn on_panel_slide(&self, offset: f32) {
        let _ = offset;
    }

    /// Called when the discrete panel state changes.
    fn on_panel_state_changed(&self, previous: PanelState, new: PanelState) {
        let _ = (previous, new);
    }
}

/// Construction-time configuration of the panel.
#[derive(Debug, Clone, Copy)]
pub struct PanelConfig {
    /// State the panel assumes on its first layout.
    pub initial_state: PanelState,
    /// Intermediate stop in `(0, 1]`; `1.0` disables the anchor.
    pub anchor_point: f32,
    /// Release velocity classified as a fling, px/s.
    pub min_fling_velocity: f32,
    pub nested_scrolling_enabled: bool,
    pub engine: EngineConfig,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            initial_state: PanelState::Collapsed,
            anchor_point: 1.0,
            min_fling_velocity: upslide_core::DEFAULT_MIN_FLING_VELOCITY,
            nested_scrolling_enabled: true,
            engine: EngineConfig::default(),
        }
    }
}

struct PanelInner {
    state: PanelState,
    /// If the current state is `Dragging`, the state it was entered from.
    /// Used when persisting a "paused mid-drag" session.
    last_non_dragging: PanelState,
    anchor_point: f32,
    min_fling_velocity: f32,
    enabled: bool,
    first_layout: bool,
    listeners: Vec<Rc<dyn PanelSlideListener>>,
}

type ListenerSnapshot = SmallVec<[Rc<dyn PanelSlideListener>; 4]>;

fn snapshot_listeners(inner: &Rc<RefCell<PanelInner>>) -> ListenerSnapshot {
    inner.borrow().listeners.iter().cloned().collect()
}

/// Update the discrete state and notify listeners if it changed.
///
/// Dispatch iterates over a snapshot of the listener list, so listeners
/// may add or remove listeners (including themselves) from within a
/// callback; changes affect only future dispatches.
fn set_state_internal(inner: &Rc<RefCell<PanelInner>>, new: PanelState) {
    let (previous, listeners) = {
        let mut guard = inner.borrow_mut();
        if guard.state == new {
            return;
        }
        let previous = guard.state;
        guard.state = new;
        (previous, guard.listeners.iter().cloned().collect::<ListenerSnapshot>())
    };
    log::debug!("panel state {previous:?} -> {new:?}");
    for listener in listeners {
        listener.on_panel_state_changed(previous, new);
    }
}

/// Host adapter between the engine and the panel state machine. Geometry
/// queries go to the user-supplied provider; notifications drive the
/// state machine and the listeners.
struct PanelHost {
    inner: Rc<RefCell<PanelInner>>,
    geometry: Rc<dyn GeometryProvider>,
}

impl GeometryProvider for PanelHost {
    fn drag_range(&self) -> f32 {
        self.geometry.drag_range()
    }

    fn compute_panel_top(&self, offset: f32) -> f32 {
        self.geometry.compute_panel_top(offset)
    }

    fn is_within_drag_region(&self, x: f32, y: f32) -> bool {
        let touchable = {
            let inner = self.inner.borrow();
            inner.enabled && inner.state != PanelState::Hidden
        };
        touchable && self.geometry.is_within_drag_region(x, y)
    }

    fn apply_geometry(&self, offset: f32) {
        self.geometry.apply_geometry(offset);
    }
}

impl SlideHost for PanelHost {
    fn on_drag_started(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.state != PanelState::Dragging {
                inner.last_non_dragging = inner.state;
            }
        }
        set_state_internal(&self.inner, PanelState::Dragging);
    }

    fn on_offset_changed(&self, offset: f32) {
        for listener in snapshot_listeners(&self.inner) {
            listener.on_panel_slide(offset);
        }
    }

    fn on_view_settled(&self, offset: f32) {
        let state = if offset_eq(offset, 1.0) {
            PanelState::Expanded
        } else if offset_eq(offset, 0.0) {
            PanelState::Collapsed
        } else if offset_eq(offset, -1.0) {
            PanelState::Hidden
        } else {
            PanelState::Anchored
        };
        set_state_internal(&self.inner, state);
    }

    fn is_fling(&self, velocity: f32) -> bool {
        velocity.abs() > self.inner.borrow().min_fling_velocity
    }

    fn calculate_snap_point(&self, offset: f32, fling_up: bool, fling_down: bool) -> f32 {
        snap_target(offset, self.inner.borrow().anchor_point, fling_up, fling_down)
    }
}

/// The sliding panel: gesture engine plus discrete state machine.
///
/// The host forwards pointer events, nested-scroll callbacks and layout
/// passes; application code drives the panel through [`set_state`] and
/// observes it through [`PanelSlideListener`]s.
///
/// [`set_state`]: SlidingPanel::set_state
pub struct SlidingPanel {
    inner: Rc<RefCell<PanelInner>>,
    engine: SlideEngine,
    geometry: Rc<dyn GeometryProvider>,
}

impl SlidingPanel {
    pub fn new(
        geometry: Rc<dyn GeometryProvider>,
        scheduler: Rc<dyn FrameScheduler>,
        config: PanelConfig,
    ) -> Self {
        // Dragging is engine-derived; it cannot be the configured start.
        let initial_state = match config.initial_state {
            PanelState::Dragging => PanelState::Collapsed,
            state => state,
        };
        let anchor_point = if config.anchor_point > 0.0 && config.anchor_point <= 1.0 {
            config.anchor_point
        } else {
            1.0
        };
        let inner = Rc::new(RefCell::new(PanelInner {
            state: initial_state,
            last_non_dragging: initial_state,
            anchor_point,
            min_fling_velocity: config.min_fling_velocity,
            enabled: true,
            first_layout: true,
            listeners: Vec::new(),
        }));
        let host = Rc::new(PanelHost {
            inner: Rc::clone(&inner),
            geometry: Rc::clone(&geometry),
        });
        let engine = SlideEngine::new(host, scheduler, config.engine);
        engine.set_nested_scrolling_enabled(config.nested_scrolling_enabled);
        Self {
            inner,
            engine,
            geometry,
        }
    }

    /// The current discrete state.
    pub fn state(&self) -> PanelState {
        self.inner.borrow().state
    }

    /// The current continuous slide offset.
    pub fn slide_offset(&self) -> f32 {
        self.engine.slide_offset()
    }

    /// Request a state change.
    ///
    /// Rejects [`PanelState::Dragging`]. Before the first layout the state
    /// is applied directly; afterwards the panel animates and the discrete
    /// state only updates once the animation settles. Requesting the
    /// current state is a no-op.
    pub fn set_state(&self, target: PanelState) -> Result<(), PanelError> {
        if target == PanelState::Dragging {
            return Err(PanelError::InvalidTargetState);
        }
        let (enabled, first_layout, current, anchor) = {
            let inner = self.inner.borrow();
            (
                inner.enabled,
                inner.first_layout,
                inner.state,
                inner.anchor_point,
            )
        };
        if !enabled || current == target {
            return Ok(());
        }
        if first_layout {
            self.inner.borrow_mut().last_non_dragging = target;
            set_state_internal(&self.inner, target);
        } else {
            self.engine.slide_to(canonical_offset(target, anchor));
        }
        Ok(())
    }

    /// Collapse an open panel, or open a collapsed one to the anchor if
    /// one is configured, else fully expand it.
    pub fn toggle(&self) {
        if !self.is_touch_enabled() {
            return;
        }
        let (state, anchor) = {
            let inner = self.inner.borrow();
            (inner.state, inner.anchor_point)
        };
        let target = match state {
            PanelState::Expanded | PanelState::Anchored => PanelState::Collapsed,
            _ if anchor < 1.0 => PanelState::Anchored,
            _ => PanelState::Expanded,
        };
        // Cannot fail: the target is never Dragging.
        let _ = self.set_state(target);
    }

    /// Notify the panel that the host completed a layout pass.
    ///
    /// The first layout after construction (or after the anchor changed,
    /// or state was restored) establishes the offset matching the current
    /// discrete state without animating.
    pub fn on_layout(&self) {
        let (first_layout, state, anchor) = {
            let inner = self.inner.borrow();
            (inner.first_layout, inner.state, inner.anchor_point)
        };
        if !first_layout {
            return;
        }
        let offset = match state {
            PanelState::Expanded => 1.0,
            PanelState::Hidden => -1.0,
            PanelState::Anchored => {
                if self.geometry.drag_range() > 0.0 {
                    anchor
                } else {
                    0.0
                }
            }
            PanelState::Collapsed | PanelState::Dragging => 0.0,
        };
        self.inner.borrow_mut().first_layout = false;
        self.engine.set_slide_offset(offset);
    }

    /// Set the anchor point, which must lie in `(0, 1]`. Out-of-range
    /// values are ignored and the prior anchor is retained.
    pub fn set_anchor_point(&self, anchor: f32) {
        if anchor > 0.0 && anchor <= 1.0 {
            let mut inner = self.inner.borrow_mut();
            inner.anchor_point = anchor;
            // Re-arm the layout pass so the host repositions the panel.
            inner.first_layout = true;
        } else {
            log::debug!("ignoring out-of-range anchor point {anchor}");
        }
    }

    pub fn anchor_point(&self) -> f32 {
        self.inner.borrow().anchor_point
    }

    pub fn set_min_fling_velocity(&self, velocity: f32) {
        self.inner.borrow_mut().min_fling_velocity = velocity;
    }

    pub fn min_fling_velocity(&self) -> f32 {
        self.inner.borrow().min_fling_velocity
    }

    /// Enable or disable the sliding gesture.
    pub fn set_touch_enabled(&self, enabled: bool) {
        self.inner.borrow_mut().enabled = enabled;
    }

    pub fn is_touch_enabled(&self) -> bool {
        let inner = self.inner.borrow();
        inner.enabled && inner.state != PanelState::Hidden
    }

    pub fn set_nested_scrolling_enabled(&self, enabled: bool) {
        self.engine.set_nested_scrolling_enabled(enabled);
    }

    pub fn is_nested_scrolling_enabled(&self) -> bool {
        self.engine.is_nested_scrolling_enabled()
    }

    pub fn add_panel_slide_listener(&self, listener: Rc<dyn PanelSlideListener>) {
        self.inner.borrow_mut().listeners.push(listener);
    }

    pub fn remove_panel_slide_listener(&self, listener: &Rc<dyn PanelSlideListener>) {
        self.inner
            .borrow_mut()
            .listeners
            .retain(|existing| !Rc::ptr_eq(existing, listener));
    }

    /// The state to persist across a suspend/resume boundary. Never
    /// `Dragging`; a paused mid-drag session saves the state the drag
    /// started from.
    pub fn serializable_state(&self) -> PanelState {
        let inner = self.inner.borrow();
        if inner.state == PanelState::Dragging {
            inner.last_non_dragging
        } else {
            inner.state
        }
    }

    /// Restore a previously persisted state. A missing or invalid value
    /// falls back to `Collapsed`. The next layout pass positions the
    /// panel; no listeners fire.
    pub fn restore_state(&self, saved: Option<PanelState>) {
        let state = match saved {
            None | Some(PanelState::Dragging) => PanelState::Collapsed,
            Some(state) => state,
        };
        let mut inner = self.inner.borrow_mut();
        inner.state = state;
        inner.last_non_dragging = state;
        inner.first_layout = true;
    }

    // Input forwarding; these mirror the engine surface so hosts only
    // need to hold the panel.

    pub fn on_pointer_event(&self, event: &PointerEvent) -> bool {
        self.engine.on_pointer_event(event)
    }

    pub fn on_nested_scroll_accept(&self, orientation: Orientation) -> bool {
        self.engine.on_nested_scroll_accept(orientation)
    }

    pub fn on_nested_scroll_begin(&self) {
        self.engine.on_nested_scroll_begin()
    }

    pub fn on_nested_pre_scroll(&self, dy: f32) -> f32 {
        self.engine.on_nested_pre_scroll(dy)
    }

    pub fn on_nested_scroll(&self, unconsumed_dy: f32) -> f32 {
        self.engine.on_nested_scroll(unconsumed_dy)
    }

    pub fn on_nested_scroll_end(&self) {
        self.engine.on_nested_scroll_end()
    }
}

fn canonical_offset(state: PanelState, anchor: f32) -> f32 {
    match state {
        PanelState::Expanded => 1.0,
        PanelState::Collapsed => 0.0,
        PanelState::Hidden => -1.0,
        PanelState::Anchored => anchor,
        // Dragging has no canonical offset and is rejected before this.
        PanelState::Dragging => 0.0,
    }
}

#[cfg(test)]
#[path = "tests/panel_tests.rs"]
mod tests;
