//! Delayed and repeating timers on a virtual clock.
//!
//! Game rules never sleep. Anything that happens "later" (a step finishing,
//! a freeze wearing off, a guard's next patrol step) is scheduled as a typed
//! event and handed back to the caller when its time comes. Every timer has
//! a [`TimerId`] so whoever armed it can cancel it when the owning entity
//! resolves first.
//!
//! ```
//! use std::time::Duration;
//! use garage_logic::scheduler::{Scheduler, TimerQueue};
//!
//! let mut timers = TimerQueue::new();
//! let id = timers.schedule_after(Duration::from_millis(100), "unfreeze");
//! timers.schedule_every(Duration::from_millis(40), "tick");
//! assert!(timers.cancel(id));
//!
//! let fired: Vec<_> = timers.advance(Duration::from_millis(100)).into_iter().map(|(_, e)| e).collect();
//! assert_eq!(fired, vec!["tick", "tick"]);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Handle for cancelling a scheduled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(u64);

/// Something that can run events later.
pub trait Scheduler<E> {
    /// Fire `event` once after `delay`.
    fn schedule_after(&mut self, delay: Duration, event: E) -> TimerId;

    /// Fire `event` every `interval` until cancelled. A zero interval is
    /// treated as one millisecond.
    fn schedule_every(&mut self, interval: Duration, event: E) -> TimerId;

    /// Cancel a pending timer. Returns `false` if it already fired or was
    /// never armed.
    fn cancel(&mut self, id: TimerId) -> bool;
}

struct Entry<E> {
    event: E,
    repeat: Option<Duration>,
}

/// Deterministic timer queue driven by [`TimerQueue::advance`].
///
/// Events due at the same instant fire in the order they were scheduled.
pub struct TimerQueue<E> {
    now: Duration,
    next_id: u64,
    /// (due, id) -> entry. Ids grow monotonically so they break ties.
    pending: BTreeMap<(Duration, u64), Entry<E>>,
    /// id -> due, for cancellation.
    due_by_id: HashMap<u64, Duration>,
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            pending: BTreeMap::new(),
            due_by_id: HashMap::new(),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of armed timers.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.due_by_id.contains_key(&id.0)
    }

    /// Time left until `id` fires.
    pub fn remaining(&self, id: TimerId) -> Option<Duration> {
        self.due_by_id
            .get(&id.0)
            .map(|due| due.saturating_sub(self.now))
    }

    fn insert(&mut self, due: Duration, id: u64, entry: Entry<E>) {
        self.pending.insert((due, id), entry);
        self.due_by_id.insert(id, due);
    }

    fn arm(&mut self, delay: Duration, event: E, repeat: Option<Duration>) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.insert(self.now + delay, id, Entry { event, repeat });
        TimerId(id)
    }

    /// Drop every timer without firing it.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.due_by_id.clear();
    }
}

impl<E: Clone> TimerQueue<E> {
    /// Move the clock forward and return every event that came due, in due
    /// order. A repeating timer fires once per elapsed interval.
    pub fn advance(&mut self, delta: Duration) -> Vec<(TimerId, E)> {
        let target = self.now + delta;
        let mut fired = Vec::new();

        loop {
            let Some((&(due, id), _)) = self.pending.iter().next() else {
                break;
            };
            if due > target {
                break;
            }
            let Some(entry) = self.pending.remove(&(due, id)) else {
                break;
            };
            self.due_by_id.remove(&id);
            self.now = due;

            if let Some(interval) = entry.repeat {
                self.insert(due + interval, id, Entry {
                    event: entry.event.clone(),
                    repeat: Some(interval),
                });
            }
            fired.push((TimerId(id), entry.event));
        }

        self.now = target;
        fired
    }
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> for TimerQueue<E> {
    fn schedule_after(&mut self, delay: Duration, event: E) -> TimerId {
        self.arm(delay, event, None)
    }

    fn schedule_every(&mut self, interval: Duration, event: E) -> TimerId {
        let interval = interval.max(Duration::from_millis(1));
        self.arm(interval, event, Some(interval))
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        match self.due_by_id.remove(&id.0) {
            Some(due) => self.pending.remove(&(due, id.0)).is_some(),
            None => false,
        }
    }
}
