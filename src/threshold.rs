//! Decides whether a resource exhaustion event is worth killing the VM for.
//!
//! [`EventWindow`] keeps the timestamps of the last `count + 1` events in a
//! ring buffer and fires once more than `count` of them fall inside the
//! trailing `time` seconds. With `count = 0` every event fires.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

/// Turns a stream of exhaustion events into a kill decision.
pub trait Heuristic: Send {
    /// Records one event and returns whether the threshold has been exceeded.
    fn on_event(&mut self) -> bool;
}

/// Millisecond clock used by [`EventWindow`]. Must be monotonic.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_millis(&self) -> u64 {
        (**self).now_millis()
    }
}

/// Milliseconds elapsed since the clock was created, offset by one.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64 + 1
    }
}

/// A clock that only moves when told to. Shared through an `Arc` so a test
/// can advance it while an [`EventWindow`] owns a handle.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self { now: AtomicU64::new(start_millis.max(1)) }
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Ring buffer of the last `count + 1` event timestamps.
///
/// The buffer starts empty and grows one slot per event until it holds
/// `count + 1`, then overwrites the oldest slot. A huge `count` therefore
/// costs nothing up front, and unfilled slots never need a sentinel value.
#[derive(Debug)]
pub struct EventWindow<C: Clock = MonotonicClock> {
    clock: C,
    time_threshold_millis: u64,
    count_threshold: usize,
    // grows to count_threshold + 1 slots, then wraps
    events: Vec<u64>,
    capacity: usize,
    cursor: usize,
}

impl EventWindow<MonotonicClock> {
    pub fn new(time_threshold_secs: u64, count_threshold: usize) -> Self {
        Self::with_clock(time_threshold_secs, count_threshold, MonotonicClock::new())
    }
}

impl<C: Clock> EventWindow<C> {
    pub fn with_clock(time_threshold_secs: u64, count_threshold: usize, clock: C) -> Self {
        Self {
            clock,
            time_threshold_millis: time_threshold_secs.saturating_mul(1000),
            count_threshold,
            events: Vec::new(),
            capacity: count_threshold.saturating_add(1),
            cursor: 0,
        }
    }

    fn record(&mut self, now: u64) {
        if self.events.len() < self.capacity {
            self.events.push(now);
        } else {
            self.events[self.cursor] = now;
        }
        self.cursor = (self.cursor + 1) % self.capacity;
    }

    fn count_in_window(&self, now: u64) -> usize {
        let cutoff = now.saturating_sub(self.time_threshold_millis);
        self.events
            .iter()
            .filter(|&&t| t >= cutoff)
            .count()
    }
}

impl<C: Clock> Heuristic for EventWindow<C> {
    fn on_event(&mut self) -> bool {
        let now = self.clock.now_millis();
        self.record(now);

        let in_window = self.count_in_window(now);
        info!("ResourceExhausted! ({}/{})", in_window, self.count_threshold);

        in_window > self.count_threshold
    }
}
