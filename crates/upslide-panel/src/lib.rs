//! Draggable, snap-to-position sliding panel.
//!
//! The panel occupies a vertical range between a collapsed "peek"
//! position and a fully expanded position, optionally stopping at one
//! configurable anchor point, or being fully hidden. It responds to
//! direct drag gestures, to fling velocity and to scroll gestures
//! delegated from a nested scrollable child, unifying all three into one
//! continuous slide offset in `[-1, 1]`:
//!
//! * `-1`: fully hidden
//! * ` 0`: collapsed, only the peek height visible
//! * ` 1`: fully expanded
//!
//! [`engine::SlideEngine`] translates gestures into that offset;
//! [`panel::SlidingPanel`] derives the discrete [`PanelState`] from it
//! and notifies listeners. Layout, rendering and input plumbing stay on
//! the host side behind [`engine::GeometryProvider`] and
//! [`upslide_core::FrameScheduler`].

use thiserror::Error;

pub mod engine;
pub mod panel;

pub use engine::{
    EngineConfig, GeometryProvider, PointerEvent, PointerEventKind, PointerId, SlideEngine,
    SlideHost,
};
pub use panel::{snap_target, PanelConfig, PanelSlideListener, SlidingPanel};

pub use upslide_core::{Easing, FrameScheduler, ManualScheduler, Orientation, Point};

/// Discrete state of the sliding panel.
///
/// `Dragging` is transient: it is entered the instant a drag or a
/// delegated scroll begins and left only when the panel settles. It is
/// derived by the engine and never a valid programmatic target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelState {
    Expanded,
    Collapsed,
    Anchored,
    Hidden,
    Dragging,
}

impl Default for PanelState {
    fn default() -> Self {
        PanelState::Collapsed
    }
}

/// Errors surfaced by the public panel API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PanelError {
    /// `Dragging` was passed to [`panel::SlidingPanel::set_state`]; the
    /// dragging state is engine-derived only.
    #[error("panel state cannot be set to Dragging")]
    InvalidTargetState,
}
