//! Frame scheduling abstraction.
//!
//! The panel never blocks or sleeps: its snap animation is a sequence of
//! discrete ticks issued by whatever drives frames in the host (a vsync
//! callback, a timer, or a test pumping frames by hand). The engine only
//! depends on the [`FrameScheduler`] trait, keeping it free of any
//! particular rendering or timer mechanism.

use std::cell::RefCell;
use std::rc::Rc;

/// Callback invoked with the current frame time in nanoseconds.
pub type FrameCallback = Box<dyn FnOnce(u64)>;

/// Identifier for a pending frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequestId(u64);

/// Source of animation ticks.
///
/// Callbacks fire at most once; an animation that spans several frames
/// re-registers itself from inside each tick.
pub trait FrameScheduler {
    /// Register `callback` to run on the next frame.
    fn request_frame(&self, callback: FrameCallback) -> FrameRequestId;

    /// Cancel a pending request. Unknown (already delivered or cancelled)
    /// ids are ignored.
    fn cancel_frame(&self, id: FrameRequestId);
}

/// RAII handle for a pending frame request; cancels it on drop.
pub struct FrameRequest {
    scheduler: Rc<dyn FrameScheduler>,
    id: Option<FrameRequestId>,
}

impl FrameRequest {
    pub fn new(scheduler: Rc<dyn FrameScheduler>, id: FrameRequestId) -> Self {
        Self {
            scheduler,
            id: Some(id),
        }
    }

    pub fn cancel(mut self) {
        if let Some(id) = self.id.take() {
            self.scheduler.cancel_frame(id);
        }
    }
}

impl Drop for FrameRequest {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.scheduler.cancel_frame(id);
        }
    }
}

/// Scheduler that queues callbacks until the owner pumps a frame.
///
/// Hosts without a native frame clock can pump this from their event
/// loop; tests pump it with synthetic times to drive animations
/// deterministically.
pub struct ManualScheduler {
    inner: RefCell<ManualInner>,
}

#[derive(Default)]
struct ManualInner {
    next_id: u64,
    pending: Vec<(FrameRequestId, FrameCallback)>,
}

impl ManualScheduler {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            inner: RefCell::new(ManualInner::default()),
        })
    }

    /// Whether any callbacks are waiting for the next frame.
    pub fn has_pending(&self) -> bool {
        !self.inner.borrow().pending.is_empty()
    }

    /// Deliver one frame at `frame_time_nanos` to every queued callback.
    ///
    /// Callbacks registered while pumping (an animation continuing itself)
    /// are deferred to the next frame. Returns the number of callbacks run.
    pub fn pump(&self, frame_time_nanos: u64) -> usize {
        let pending = std::mem::take(&mut self.inner.borrow_mut().pending);
        let count = pending.len();
        log::trace!("pumping frame at {frame_time_nanos}ns ({count} callbacks)");
        for (_, callback) in pending {
            callback(frame_time_nanos);
        }
        count
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameRequestId {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = FrameRequestId(inner.next_id);
        inner.pending.push((id, callback));
        id
    }

    fn cancel_frame(&self, id: FrameRequestId) {
        self.inner
            .borrow_mut()
            .pending
            .retain(|(pending_id, _)| *pending_id != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn pump_runs_queued_callbacks_with_frame_time() {
        let scheduler = ManualScheduler::new();
        let seen = Rc::new(Cell::new(0u64));
        let seen_clone = Rc::clone(&seen);
        scheduler.request_frame(Box::new(move |time| seen_clone.set(time)));

        assert!(scheduler.has_pending());
        assert_eq!(scheduler.pump(42), 1);
        assert_eq!(seen.get(), 42);
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn cancelled_callback_never_runs() {
        let scheduler = ManualScheduler::new();
        let ran = Rc::new(Cell::new(false));
        let ran_clone = Rc::clone(&ran);
        let id = scheduler.request_frame(Box::new(move |_| ran_clone.set(true)));
        scheduler.cancel_frame(id);

        assert_eq!(scheduler.pump(0), 0);
        assert!(!ran.get());
    }

    #[test]
    fn reregistration_runs_on_the_next_pump() {
        let scheduler = ManualScheduler::new();
        let ticks = Rc::new(Cell::new(0u32));

        fn tick(scheduler: &Rc<ManualScheduler>, ticks: &Rc<Cell<u32>>) {
            ticks.set(ticks.get() + 1);
            if ticks.get() < 3 {
                let scheduler_clone = Rc::clone(scheduler);
                let ticks_clone = Rc::clone(ticks);
                scheduler.request_frame(Box::new(move |_| {
                    tick(&scheduler_clone, &ticks_clone);
                }));
            }
        }

        let scheduler_clone = Rc::clone(&scheduler);
        let ticks_clone = Rc::clone(&ticks);
        scheduler.request_frame(Box::new(move |_| tick(&scheduler_clone, &ticks_clone)));

        assert_eq!(scheduler.pump(0), 1);
        assert_eq!(ticks.get(), 1);
        assert_eq!(scheduler.pump(1), 1);
        assert_eq!(scheduler.pump(2), 1);
        assert_eq!(ticks.get(), 3);
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn dropping_a_request_cancels_it() {
        let scheduler = ManualScheduler::new();
        let ran = Rc::new(Cell::new(false));
        let ran_clone = Rc::clone(&ran);
        let id = scheduler.request_frame(Box::new(move |_| ran_clone.set(true)));
        let request = FrameRequest::new(scheduler.clone(), id);
        drop(request);

        assert_eq!(scheduler.pump(0), 0);
        assert!(!ran.get());
    }
}
