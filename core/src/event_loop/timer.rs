//! Timer heap for the event loop's timers phase.

use crate::common::slots::{Slots, Token};
use crate::event_loop::Callback;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::{Debug, Formatter};
use std::time::Instant;

const STALE_SLACK: usize = 16;

/// Identifies one scheduled timer, see [`crate::event_loop::Handle::clear_timeout`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TimerId(Token);

#[derive(Debug, Clone, Eq, PartialEq)]
struct TimerEntry {
    deadline: Instant,
    token: Token,
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed, the heap pops the earliest deadline first
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.token.generation().cmp(&self.token.generation()))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A min-heap of timers ordered by deadline, then by insertion.
///
/// Cancelled timers leave their heap entry behind; it is skipped once it
/// reaches the top, and the heap is compacted once stale entries outnumber
/// live ones.
#[derive(Default)]
pub(crate) struct TimerHeap {
    heap: BinaryHeap<TimerEntry>,
    callbacks: Slots<Callback>,
}

impl Debug for TimerHeap {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHeap")
            .field("live", &self.callbacks.len())
            .field("entries", &self.heap.len())
            .finish()
    }
}

impl TimerHeap {
    pub(crate) fn insert(&mut self, deadline: Instant, callback: Callback) -> TimerId {
        let token = self.callbacks.insert(callback);
        self.heap.push(TimerEntry { deadline, token });
        TimerId(token)
    }

    pub(crate) fn cancel(&mut self, id: TimerId) -> bool {
        let cancelled = self.callbacks.remove(id.0).is_some();
        if self.callbacks.is_empty() {
            self.heap.clear();
        } else if self.heap.len() > 2 * self.callbacks.len() + STALE_SLACK {
            let callbacks = &self.callbacks;
            self.heap.retain(|entry| callbacks.contains(entry.token));
        }
        cancelled
    }

    pub(crate) fn len(&self) -> usize {
        self.callbacks.len()
    }

    #[cfg(test)]
    fn entries(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub(crate) fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(entry) = self.heap.peek() {
            if self.callbacks.contains(entry.token) {
                return Some(entry.deadline);
            }
            _ = self.heap.pop();
        }
        None
    }

    /// Pops the callbacks of every live timer with `deadline <= now`.
    pub(crate) fn pop_expired(&mut self, now: Instant) -> Vec<Callback> {
        let mut expired = Vec::new();
        while let Some(entry) = self.heap.peek() {
            if entry.deadline > now {
                break;
            }
            let token = entry.token;
            _ = self.heap.pop();
            if let Some(callback) = self.callbacks.remove(token) {
                expired.push(callback);
            }
        }
        expired
    }

    pub(crate) fn clear(&mut self) {
        self.heap.clear();
        self.callbacks.clear();
    }
}
