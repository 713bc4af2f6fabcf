//! Frame tick scheduling.
//!
//! The engine never talks to a display loop directly. It asks a
//! [`TickScheduler`] for the next tick and cancels it on teardown, so a host
//! can back it with its animation-frame callback and tests can step frames
//! by hand with [`ManualScheduler`].

use lyrica_core::Millis;

/// Handle identifying one requested tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickHandle(pub u64);

pub trait TickScheduler {
    /// Ask for one tick on the next frame.
    fn request_tick(&mut self) -> TickHandle;

    /// Withdraw a pending tick. Cancelling an unknown or fired handle is a no-op.
    fn cancel_tick(&mut self, handle: TickHandle);
}

/// Deterministic scheduler driven by explicit [`step`](Self::step) calls on a
/// fixed frame interval.
#[derive(Debug, Clone)]
pub struct ManualScheduler {
    frame_interval: Millis,
    now: Millis,
    next_id: u64,
    pending: Vec<TickHandle>,
    requested: u64,
    cancelled: u64,
}

impl ManualScheduler {
    pub fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 60.0 };
        Self {
            frame_interval: 1000.0 / fps,
            now: 0.0,
            next_id: 0,
            pending: Vec::new(),
            requested: 0,
            cancelled: 0,
        }
    }

    /// Current clock time.
    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn frame_interval(&self) -> Millis {
        self.frame_interval
    }

    /// Advance the clock one frame and fire the oldest pending tick, if any.
    /// Returns the fired handle and the new clock time.
    pub fn step(&mut self) -> Option<(TickHandle, Millis)> {
        self.now += self.frame_interval;
        if self.pending.is_empty() {
            return None;
        }
        let handle = self.pending.remove(0);
        Some((handle, self.now))
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn requested(&self) -> u64 {
        self.requested
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new(60.0)
    }
}

impl TickScheduler for ManualScheduler {
    fn request_tick(&mut self) -> TickHandle {
        self.next_id += 1;
        self.requested += 1;
        let handle = TickHandle(self.next_id);
        self.pending.push(handle);
        handle
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        let before = self.pending.len();
        self.pending.retain(|h| *h != handle);
        if self.pending.len() != before {
            self.cancelled += 1;
        }
    }
}
