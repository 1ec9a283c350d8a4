// lib95hf/src/timer.rs

//! Time base, idle timeout and cooperative stop flag.
//!
//! Every wait in the crate goes through a [`Clock`] so that state machines
//! can be driven against virtual time in tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Millisecond time source with blocking delays.
pub trait Clock {
    /// Milliseconds elapsed since an arbitrary fixed origin
    fn now_ms(&self) -> u64;

    fn delay_ms(&self, ms: u64);

    fn delay_us(&self, us: u64);
}

/// Wall-clock implementation backed by `Instant` and `thread::sleep`.
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn delay_ms(&self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }

    fn delay_us(&self, us: u64) {
        std::thread::sleep(Duration::from_micros(us));
    }
}

/// Virtual clock for tests. Delays advance time instantly; `tick_ms` makes
/// every `now_ms` read advance time too, so busy loops without delays still
/// make progress. Clones share the same time line.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    now_us: Arc<AtomicU64>,
    tick_us: Arc<AtomicU64>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance time by `ms` on every `now_ms` call.
    pub fn with_tick_ms(self, ms: u64) -> Self {
        self.tick_us.store(ms * 1000, Ordering::SeqCst);
        self
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now_us.fetch_add(ms * 1000, Ordering::SeqCst);
    }

    /// Total virtual time elapsed, without ticking
    pub fn elapsed_ms(&self) -> u64 {
        self.now_us.load(Ordering::SeqCst) / 1000
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        let tick = self.tick_us.load(Ordering::SeqCst);
        let now = self.now_us.fetch_add(tick, Ordering::SeqCst);
        now / 1000
    }

    fn delay_ms(&self, ms: u64) {
        self.advance_ms(ms);
    }

    fn delay_us(&self, us: u64) {
        self.now_us.fetch_add(us, Ordering::SeqCst);
    }
}

/// One-shot countdown used as the card-emulation idle timeout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliTimeout {
    deadline_ms: Option<u64>,
}

impl AppliTimeout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the countdown for `ms` milliseconds from now.
    pub fn arm(&mut self, clock: &dyn Clock, ms: u64) {
        self.deadline_ms = Some(clock.now_ms().saturating_add(ms));
    }

    pub fn disarm(&mut self) {
        self.deadline_ms = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline_ms.is_some()
    }

    /// A disarmed timeout never expires.
    pub fn is_expired(&self, clock: &dyn Clock) -> bool {
        match self.deadline_ms {
            Some(deadline) => clock.now_ms() >= deadline,
            None => false,
        }
    }
}

/// Cooperative stop request shared between the caller and the running
/// session. Clone it to hand it to another thread.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the current session to stop at its next step boundary
    #[inline]
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Clear the flag; done at the start of every top-level session
    #[inline]
    pub fn reset(&self) {
        self.stopped.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}
