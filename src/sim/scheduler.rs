//! Discrete-event scheduler.
//!
//! Events are kept in a min-heap ordered by time, with an insertion sequence
//! number as tie-breaker so events scheduled for the same instant run in FIFO
//! order. Execution is strictly serialized: the caller pops one event, handles
//! it to completion, then pops the next.
//!
//! Periodic work registers a single repeating timer with a stop condition
//! instead of one event per future tick; the timer re-arms itself each time it
//! fires.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::types::{Clock, SimTime};

/// Re-arm rule carried by repeating events
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Repeat {
    pub interval: SimTime,
    /// The timer stops once the next fire time would reach this bound
    pub stop_before: SimTime,
}

#[derive(Debug)]
struct Scheduled<E> {
    at: SimTime,
    seq: u64,
    repeat: Option<Repeat>,
    event: E,
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    // Reversed so BinaryHeap (a max-heap) pops the earliest event first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .total_cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Single-threaded event queue that also acts as the simulation clock
#[derive(Debug)]
pub struct EventQueue<E> {
    heap: BinaryHeap<Scheduled<E>>,
    now: SimTime,
    next_seq: u64,
    executed: u64,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            now: 0.0,
            next_seq: 0,
            executed: 0,
        }
    }
}

impl<E: Clone> EventQueue<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `event` to run `delay` seconds from now
    pub fn schedule(&mut self, delay: SimTime, event: E) {
        let at = self.now + delay.max(0.0);
        self.push(at, None, event);
    }

    /// Schedule `event` at `first_at` and every `interval` seconds after,
    /// while the fire time stays strictly below `stop_before`.
    ///
    /// Nothing is scheduled if `first_at` is already past the stop bound.
    pub fn schedule_repeating(&mut self, first_at: SimTime, interval: SimTime, stop_before: SimTime, event: E) {
        if first_at >= stop_before || interval <= 0.0 {
            return;
        }
        self.push(first_at, Some(Repeat { interval, stop_before }), event);
    }

    /// Pop the next event, advancing the clock to its time.
    ///
    /// Repeating events are re-armed before being returned.
    pub fn pop(&mut self) -> Option<(SimTime, E)> {
        let scheduled = self.heap.pop()?;
        self.now = scheduled.at;
        self.executed += 1;

        if let Some(repeat) = scheduled.repeat {
            let next = scheduled.at + repeat.interval;
            // An interval too small to move the clock would re-arm at the same instant forever
            if next > scheduled.at && next < repeat.stop_before {
                self.push(next, Some(repeat), scheduled.event.clone());
            }
        }

        Some((scheduled.at, scheduled.event))
    }

    /// Time of the next pending event
    pub fn peek_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|s| s.at)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.heap.len()
    }

    /// Number of events popped so far
    pub fn executed(&self) -> u64 {
        self.executed
    }

    fn push(&mut self, at: SimTime, repeat: Option<Repeat>, event: E) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled { at, seq, repeat, event });
    }
}

impl<E> Clock for EventQueue<E> {
    fn now(&self) -> SimTime {
        self.now
    }
}
