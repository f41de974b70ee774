//! Fixed-duration tween between two slide offsets.

use crate::easing::Easing;

/// Interpolates from a start to an end offset over a fixed duration.
///
/// The tween has no clock of its own: it latches the first frame time it
/// observes as its start and reports completion once the elapsed time
/// reaches the configured duration. Driving it from a host scheduler
/// keeps the animation deterministic and testable.
#[derive(Debug, Clone)]
pub struct Tween {
    start: f32,
    end: f32,
    duration_nanos: u64,
    easing: Easing,
    start_time_nanos: Option<u64>,
    finished: bool,
}

impl Tween {
    pub fn new(start: f32, end: f32, duration_ms: u64, easing: Easing) -> Self {
        Self {
            start,
            end,
            // A zero duration would divide by zero; treat it as "instant".
            duration_nanos: (duration_ms * 1_000_000).max(1),
            easing,
            start_time_nanos: None,
            finished: false,
        }
    }

    /// The offset this tween is animating towards.
    pub fn target(&self) -> f32 {
        self.end
    }

    /// Whether the last `tick` reached the end of the animation.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Advance to `frame_time_nanos` and return the interpolated value.
    ///
    /// The first call latches the start time, so the initial frame always
    /// yields the start value.
    pub fn tick(&mut self, frame_time_nanos: u64) -> f32 {
        let start_time = *self.start_time_nanos.get_or_insert(frame_time_nanos);
        let elapsed = frame_time_nanos.saturating_sub(start_time);
        let linear = (elapsed as f32 / self.duration_nanos as f32).clamp(0.0, 1.0);
        self.finished = linear >= 1.0;
        if self.finished {
            return self.end;
        }
        let progress = self.easing.transform(linear);
        self.start + (self.end - self.start) * progress
    }
}
