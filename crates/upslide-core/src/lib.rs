//! Core building blocks for the upslide sliding panel.
//!
//! This crate hosts the pieces of the panel that are independent of any
//! particular host or layout system: easing curves, the fixed-duration
//! snap tween, the 1D velocity tracker used for fling detection, and the
//! frame-scheduler abstraction that drives animations one tick at a time.

pub mod constants;
pub mod easing;
pub mod scheduler;
pub mod tween;
pub mod types;
pub mod velocity;

pub use constants::{
    DEFAULT_MIN_FLING_VELOCITY, DEFAULT_SNAP_DURATION_MS, MAX_FLING_VELOCITY, TOUCH_SLOP,
};
pub use easing::Easing;
pub use scheduler::{FrameCallback, FrameRequest, FrameRequestId, FrameScheduler, ManualScheduler};
pub use tween::Tween;
pub use types::{Orientation, Point};
pub use velocity::VelocityTracker;
