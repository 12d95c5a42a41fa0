//! Virtual-Clock Timer Queue
//!
//! A min-heap of timers keyed by due time. Nothing here sleeps: owners call
//! [`TimerQueue::pop_due`] with the current virtual time and sleep themselves
//! until [`TimerQueue::next_deadline`]. Timers due at the same instant fire in
//! the order they were scheduled.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use parking_lot::Mutex;

/// The driver's notion of the current virtual time
///
/// Owners of a [`TimerQueue`] are told the time by their driver. A clock
/// lets them ask for it after an await that may have taken a while.
pub trait Clock: Send + Sync {
    /// Current virtual time
    fn now(&self) -> Duration;
}

/// A clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    /// A clock at time zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to `now`
    pub fn set(&self, now: Duration) {
        *self.now.lock() = now;
    }

    /// Move forward by `by`, returning the new time
    pub fn advance(&self, by: Duration) -> Duration {
        let mut now = self.now.lock();
        *now += by;
        *now
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

/// A scheduled payload
#[derive(Debug)]
struct Entry<T> {
    due: Duration,
    seq: u64,
    payload: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // Reversed so the BinaryHeap (a max-heap) pops the earliest timer first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Timer queue driven by an explicit clock
#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    now: Duration,
    next_seq: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    /// Create an empty queue at time zero
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            now: Duration::ZERO,
            next_seq: 0,
        }
    }

    /// Current virtual time (the latest time passed to `pop_due`)
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `payload` to fire `delay` after the current virtual time
    pub fn schedule(&mut self, delay: Duration, payload: T) {
        let due = self.now + delay;
        self.schedule_at(due, payload);
    }

    /// Schedule `payload` at an absolute virtual time
    pub fn schedule_at(&mut self, due: Duration, payload: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { due, seq, payload });
    }

    /// Earliest pending due time
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.heap.peek().map(|entry| entry.due)
    }

    /// Pop the earliest timer due at or before `now`
    ///
    /// Advances the clock to the popped timer's due time, so timers scheduled
    /// from inside a callback are relative to when that callback fired rather
    /// than to `now`. Once nothing more is due the clock settles on `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<T> {
        let ready = self.heap.peek().is_some_and(|entry| entry.due <= now);
        if !ready {
            self.now = self.now.max(now);
            return None;
        }
        let entry = self.heap.pop()?;
        self.now = self.now.max(entry.due);
        Some(entry.payload)
    }

    /// Move the clock forward without firing anything
    pub fn advance_clock(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    /// Drop every pending timer
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Drop pending timers that fail the predicate
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.heap.retain(|entry| keep(&entry.payload));
    }

    /// Number of pending timers
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True when nothing is pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
