//! Shared gesture and animation constants.
//!
//! These values are in logical pixels (or pixels per second) and match
//! common platform conventions for touch handling. Hosts with unusual
//! input hardware can override them through the engine configuration.

/// Minimum vertical pointer travel before a touch is treated as a drag
/// rather than a tap.
///
/// Matches the ~8dp touch slop used by Android's `ViewConfiguration`;
/// large enough to ignore finger jitter, small enough to feel responsive.
pub const TOUCH_SLOP: f32 = 8.0;

/// Release velocity above which a gesture is classified as a fling,
/// in pixels per second.
pub const DEFAULT_MIN_FLING_VELOCITY: f32 = 400.0;

/// Upper bound applied to computed fling velocities, in pixels per second.
pub const MAX_FLING_VELOCITY: f32 = 8_000.0;

/// Duration of the snap animation that settles the panel on a stop.
pub const DEFAULT_SNAP_DURATION_MS: u64 = 300;
