//! Explicit single-threaded tick scheduling.
//!
//! Sessions and games need countdowns, per-second clocks, spawn intervals
//! and reaction deadlines. Instead of implicit re-scheduling chains, every
//! timer lives in an owned scheduler that is advanced with the current
//! wall-clock time and cancelled wholesale when its owner's lifecycle
//! ends. A timer that outlives its session is a correctness bug (duplicate
//! scoring), not just a leak.
//!
//! The scheduler never blocks: `advance_to` drains everything due at or
//! before the given time, in deadline order, and returns the tokens.

/// Handle to a scheduled timer, usable for targeted cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Entry<T> {
    id: TimerId,
    deadline_ms: u64,
    /// Re-arm interval for repeating timers.
    every_ms: Option<u64>,
    token: T,
}

/// Deadline queue for cooperative, wall-clock-driven ticks.
///
/// `T` is the caller's token type, returned when a timer fires.
#[derive(Debug, Clone)]
pub struct TickScheduler<T> {
    entries: Vec<Entry<T>>,
    next_id: u64,
}

impl<T: Copy> TickScheduler<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Schedules a one-shot timer at `deadline_ms`.
    pub fn schedule_once(&mut self, token: T, deadline_ms: u64) -> TimerId {
        self.insert(token, deadline_ms, None)
    }

    /// Schedules a repeating timer: first fire at `first_ms`, then every
    /// `every_ms` after each fire.
    pub fn schedule_repeating(&mut self, token: T, first_ms: u64, every_ms: u64) -> TimerId {
        // A zero interval would fire forever within one advance.
        self.insert(token, first_ms, Some(every_ms.max(1)))
    }

    fn insert(&mut self, token: T, deadline_ms: u64, every_ms: Option<u64>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            deadline_ms,
            every_ms,
            token,
        });
        id
    }

    /// Cancels a single timer. Unknown ids are ignored.
    pub fn cancel(&mut self, id: TimerId) {
        self.entries.retain(|e| e.id != id);
    }

    /// Cancels everything. Called when the owning session leaves `playing`.
    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    /// Fires every timer due at or before `now_ms`, in deadline order.
    ///
    /// Repeating timers re-arm relative to their own deadline (not to
    /// `now_ms`), so a late advance catches up on all missed ticks. Ties
    /// fire in scheduling order.
    pub fn advance_to(&mut self, now_ms: u64) -> Vec<T> {
        let mut fired = Vec::new();

        loop {
            // Earliest due entry; stable tie-break on insertion order.
            let next = self
                .entries
                .iter()
                .enumerate()
                .filter(|(_, e)| e.deadline_ms <= now_ms)
                .min_by_key(|(idx, e)| (e.deadline_ms, *idx))
                .map(|(idx, _)| idx);

            let Some(idx) = next else { break };

            let entry = &mut self.entries[idx];
            fired.push(entry.token);
            match entry.every_ms {
                Some(every) => entry.deadline_ms += every,
                None => {
                    self.entries.swap_remove(idx);
                }
            }
        }

        fired
    }

    /// Deadline of the soonest pending timer.
    pub fn next_deadline(&self) -> Option<u64> {
        self.entries.iter().map(|e| e.deadline_ms).min()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<T: Copy> Default for TickScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
