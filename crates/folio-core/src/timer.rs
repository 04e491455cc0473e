#![forbid(unsafe_code)]

//! Deterministic timer queue.
//!
//! Every timer-driven effect on the page (typing ticks, counter ticks,
//! notification phases, deferred source fetches) is a [`TimerQueue`] entry
//! rather than a host `setTimeout`. The queue owns the page clock: the host
//! advances it explicitly and the queue hands back due timers one at a time,
//! so each component's timeline stays strictly sequential and every pending
//! tick can be cancelled.
//!
//! # Invariants
//!
//! 1. Timers fire in `(deadline, scheduling sequence)` order.
//! 2. The clock never moves backwards.
//! 3. A cancelled timer never fires.
//! 4. A timer scheduled from inside a callback with a deadline inside the
//!    current advance window fires within the same advance.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::notification::NotificationId;

/// Handle for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// Raw sequence number (monotonic per queue).
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// The component a timer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerTarget {
    /// Next typing tick.
    Typing,
    /// Next tick of the counter at this slot index.
    Counter(usize),
    /// Next phase transition of a notification.
    Notification(NotificationId),
    /// Deferred project-source request.
    GalleryFetch,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    id: TimerId,
    target: TimerTarget,
}

/// A timer that came due during [`TimerQueue::pop_due`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueTimer {
    pub id: TimerId,
    pub target: TimerTarget,
    /// Deadline the timer was scheduled for (equals the clock when popped).
    pub deadline: Duration,
}

/// Virtual-clock timer queue.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now: Duration,
    next_seq: u64,
    pending: BTreeMap<(Duration, u64), Entry>,
    deadlines: HashMap<TimerId, (Duration, u64)>,
}

impl TimerQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current page time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `target` to fire `delay` after the current time.
    pub fn schedule(&mut self, delay: Duration, target: TimerTarget) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        let id = TimerId(seq);
        let deadline = self.now.saturating_add(delay);
        self.pending.insert((deadline, seq), Entry { id, target });
        self.deadlines.insert(id, (deadline, seq));
        tracing::trace!(timer = seq, ?target, deadline_ms = deadline.as_millis() as u64, "timer scheduled");
        id
    }

    /// Cancel a pending timer. Returns `false` if it already fired or was
    /// cancelled before.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(key) => {
                self.pending.remove(&key);
                true
            }
            None => false,
        }
    }

    /// Whether the timer is still waiting to fire.
    #[must_use]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    /// Number of pending timers.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Deadline of the earliest pending timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Pop the earliest timer whose deadline is at or before `until`,
    /// moving the clock to that deadline.
    ///
    /// Call repeatedly until `None`, then [`settle`](Self::settle) to move
    /// the clock to `until`.
    pub fn pop_due(&mut self, until: Duration) -> Option<DueTimer> {
        let (&key, _) = self.pending.iter().next()?;
        if key.0 > until {
            return None;
        }
        let entry = self.pending.remove(&key)?;
        self.deadlines.remove(&entry.id);
        self.now = self.now.max(key.0);
        Some(DueTimer {
            id: entry.id,
            target: entry.target,
            deadline: key.0,
        })
    }

    /// Move the clock forward to `until` (never backwards).
    pub fn settle(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }

    /// Cancel every pending timer. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.deadlines.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn fires_in_deadline_then_sequence_order() {
        let mut q = TimerQueue::new();
        let late = q.schedule(ms(50), TimerTarget::Typing);
        let early = q.schedule(ms(10), TimerTarget::Counter(0));
        let tie = q.schedule(ms(10), TimerTarget::Counter(1));

        let order: Vec<TimerId> = std::iter::from_fn(|| q.pop_due(ms(100)).map(|t| t.id)).collect();
        assert_eq!(order, vec![early, tie, late]);
        assert_eq!(q.now(), ms(50));
    }

    #[test]
    fn pop_due_respects_window() {
        let mut q = TimerQueue::new();
        q.schedule(ms(20), TimerTarget::Typing);
        assert!(q.pop_due(ms(19)).is_none());
        q.settle(ms(19));
        assert_eq!(q.now(), ms(19));
        let due = q.pop_due(ms(20)).expect("due at 20");
        assert_eq!(due.deadline, ms(20));
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut q = TimerQueue::new();
        let id = q.schedule(ms(5), TimerTarget::Typing);
        assert!(q.cancel(id));
        assert!(!q.cancel(id));
        assert!(!q.is_pending(id));
        assert!(q.pop_due(ms(1_000)).is_none());
    }

    #[test]
    fn schedule_is_relative_to_current_clock() {
        let mut q = TimerQueue::new();
        q.settle(ms(1_000));
        q.schedule(ms(100), TimerTarget::GalleryFetch);
        assert_eq!(q.next_deadline(), Some(ms(1_100)));
    }

    #[test]
    fn clock_never_moves_backwards() {
        let mut q = TimerQueue::new();
        q.settle(ms(500));
        q.settle(ms(200));
        assert_eq!(q.now(), ms(500));
    }

    #[test]
    fn clear_drops_everything() {
        let mut q = TimerQueue::new();
        q.schedule(ms(1), TimerTarget::Typing);
        q.schedule(ms(2), TimerTarget::Counter(3));
        assert_eq!(q.clear(), 2);
        assert_eq!(q.pending_count(), 0);
        assert_eq!(q.next_deadline(), None);
    }
}
