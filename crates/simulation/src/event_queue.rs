//! Event queue with deterministic ordering.
//!
//! A binary heap keyed by `(time, sequence)`. Cancellation is lazy: a
//! cancelled event is removed from the pending set in O(1) and its heap entry
//! is discarded when it surfaces. Stale entries are compacted once they
//! outnumber the live ones.

use crate::SimError;
use netsim_types::SimTime;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

/// Below this heap size stale entries are never compacted.
const COMPACTION_THRESHOLD: usize = 64;

/// Key for ordering events in the queue.
///
/// Events are ordered by:
/// 1. Time (earlier first)
/// 2. Sequence number (FIFO for equal times)
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct EventKey {
    /// When this event should be processed.
    pub time: SimTime,
    /// Assigned at insertion, strictly increasing.
    pub sequence: u64,
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.time.cmp(&other.time) {
            Ordering::Equal => {}
            ord => return ord,
        }

        self.sequence.cmp(&other.sequence)
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Handle to a scheduled event, used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(EventKey);

impl EventHandle {
    /// The time the event is scheduled for.
    pub fn time(&self) -> SimTime {
        self.0.time
    }

    /// The event's tie-break sequence number.
    pub fn sequence(&self) -> u64 {
        self.0.sequence
    }
}

/// An event popped from the queue.
#[derive(Debug)]
pub struct Event<T> {
    key: EventKey,
    payload: T,
}

impl<T> Event<T> {
    pub fn time(&self) -> SimTime {
        self.key.time
    }

    pub fn sequence(&self) -> u64 {
        self.key.sequence
    }

    pub fn key(&self) -> EventKey {
        self.key
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}

// Heap ordering looks at the key only; payloads are opaque.
impl<T> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for Event<T> {}

impl<T> Ord for Event<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl<T> PartialOrd for Event<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pending events ordered by `(time, sequence)`.
pub struct EventQueue<T> {
    /// Min-heap of entries, including cancelled ones not yet skipped.
    heap: BinaryHeap<Reverse<Event<T>>>,
    /// Sequence numbers of events that are still live.
    pending: HashSet<u64>,
    /// Next sequence number to hand out.
    next_sequence: u64,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            pending: HashSet::new(),
            next_sequence: 0,
        }
    }

    /// Insert an event at `time`.
    ///
    /// `now` is the scheduler's current virtual time; scheduling before it
    /// fails with [`SimError::InvalidTime`] and leaves the queue untouched.
    pub fn insert(
        &mut self,
        now: SimTime,
        time: SimTime,
        payload: T,
    ) -> Result<EventHandle, SimError> {
        if time < now {
            return Err(SimError::InvalidTime {
                requested: time,
                now,
            });
        }

        let key = EventKey {
            time,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;

        self.pending.insert(key.sequence);
        self.heap.push(Reverse(Event { key, payload }));
        Ok(EventHandle(key))
    }

    /// Cancel an event.
    ///
    /// Returns `true` if the event was pending. Cancelling an event that was
    /// already cancelled or executed is a no-op returning `false`.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        let removed = self.pending.remove(&handle.sequence());
        if removed {
            self.maybe_compact();
        }
        removed
    }

    /// Whether the event is still waiting to run.
    pub fn is_pending(&self, handle: EventHandle) -> bool {
        self.pending.contains(&handle.sequence())
    }

    /// Remove and return the earliest live event.
    pub fn pop_earliest(&mut self) -> Option<Event<T>> {
        while let Some(Reverse(event)) = self.heap.pop() {
            if self.pending.remove(&event.key.sequence) {
                return Some(event);
            }
        }
        None
    }

    /// Time of the earliest live event, discarding cancelled entries on top.
    pub fn peek_time(&mut self) -> Option<SimTime> {
        self.skip_cancelled();
        self.heap.peek().map(|Reverse(event)| event.key.time)
    }

    /// Number of live events.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if no live events remain.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending event, returning how many were live.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.heap.clear();
        dropped
    }

    fn skip_cancelled(&mut self) {
        while let Some(Reverse(top)) = self.heap.peek() {
            if self.pending.contains(&top.key.sequence) {
                break;
            }
            self.heap.pop();
        }
    }

    fn maybe_compact(&mut self) {
        if self.heap.len() > COMPACTION_THRESHOLD && self.heap.len() > 2 * self.pending.len() {
            let pending = &self.pending;
            self.heap
                .retain(|Reverse(event)| pending.contains(&event.key.sequence));
        }
    }
}

impl<T> std::fmt::Debug for EventQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("live", &self.pending.len())
            .field("entries", &self.heap.len())
            .field("next_sequence", &self.next_sequence)
            .finish()
    }
}
