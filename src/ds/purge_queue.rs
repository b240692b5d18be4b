//! Append-only log of pending evictions with batched, re-entry-safe draining.
//!
//! Evicted entries are never disposed while the cache is mid-mutation. They are
//! appended here instead and handed to the eviction callback later, once the
//! cache invariants hold again.
//!
//! ## Layout
//!
//! ```text
//!   slots: Vec<Option<T>>
//!
//!   0                 processed                    end = slots.len()
//!   ├─────────────────────┼──────────────────────────────┤
//!   │  dispatched (None)  │  pending, oldest first       │ ◄── push
//!   └─────────────────────┴──────────────────────────────┘
//! ```
//!
//! - `[0, processed)` has already been handed out and is garbage awaiting
//!   compaction.
//! - `[processed, end)` waits for dispatch in FIFO order.
//! - A drain pass takes a [`DrainTicket`] that freezes its upper bound; anything
//!   pushed while the pass runs lands after that bound and waits for the next
//!   pass.
//! - `active_drains` turns a nested [`begin_drain`](PurgeQueue::begin_drain)
//!   into a no-op, and compaction only runs once the counter is back to zero so
//!   an active ticket's indices never move.

/// Default bound on callbacks dispatched by one automatic drain pass.
pub const DEFAULT_MAX_PENDING_CALLBACKS: usize = 8192;

/// Largest accepted value for the per-pass dispatch bound.
pub const MAX_PENDING_CALLBACKS_LIMIT: usize = u16::MAX as usize;

/// How far a drain pass may go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainLimit {
    /// At most `max_pending` entries.
    Bounded,
    /// Everything pending when the pass starts.
    Unbounded,
}

/// Upper bound of one drain pass, valid until the matching
/// [`finish_drain`](PurgeQueue::finish_drain).
#[derive(Debug)]
pub struct DrainTicket {
    end: usize,
}

#[derive(Debug)]
pub struct PurgeQueue<T> {
    slots: Vec<Option<T>>,
    processed: usize,
    active_drains: usize,
    max_pending: usize,
}

impl<T> PurgeQueue<T> {
    /// Creates an empty queue with the default per-pass bound.
    pub fn new() -> Self {
        Self::with_max_pending(DEFAULT_MAX_PENDING_CALLBACKS)
    }

    /// Creates an empty queue dispatching at most `max_pending` entries per
    /// bounded pass (clamped to `1..=MAX_PENDING_CALLBACKS_LIMIT`).
    pub fn with_max_pending(max_pending: usize) -> Self {
        Self {
            slots: Vec::new(),
            processed: 0,
            active_drains: 0,
            max_pending: max_pending.clamp(1, MAX_PENDING_CALLBACKS_LIMIT),
        }
    }

    /// Appends a pending eviction at the end of the log.
    pub fn push(&mut self, item: T) {
        self.slots.push(Some(item));
    }

    /// Number of entries awaiting dispatch.
    pub fn pending(&self) -> usize {
        self.slots.len() - self.processed
    }

    pub fn has_pending(&self) -> bool {
        self.pending() > 0
    }

    /// Raw storage length, dispatched-but-uncompacted slots included.
    pub fn storage_len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` while a drain pass holds a ticket.
    pub fn is_draining(&self) -> bool {
        self.active_drains > 0
    }

    pub fn max_pending(&self) -> usize {
        self.max_pending
    }

    /// Sets the per-pass bound; values outside `1..=MAX_PENDING_CALLBACKS_LIMIT`
    /// are clamped.
    pub fn set_max_pending(&mut self, max_pending: usize) {
        self.max_pending = max_pending.clamp(1, MAX_PENDING_CALLBACKS_LIMIT);
    }

    /// Starts a drain pass.
    ///
    /// Returns `None` when another pass is already active or nothing is
    /// pending; in both cases the queue is left untouched.
    pub fn begin_drain(&mut self, limit: DrainLimit) -> Option<DrainTicket> {
        if self.is_draining() || !self.has_pending() {
            return None;
        }
        let budget = match limit {
            DrainLimit::Bounded => self.pending().min(self.max_pending),
            DrainLimit::Unbounded => self.pending(),
        };
        self.active_drains += 1;
        Some(DrainTicket {
            end: self.processed + budget,
        })
    }

    /// Hands out the oldest pending entry within the ticket's bound.
    pub fn next_in(&mut self, ticket: &DrainTicket) -> Option<T> {
        while self.processed < ticket.end {
            let slot = self.slots[self.processed].take();
            self.processed += 1;
            if slot.is_some() {
                return slot;
            }
        }
        None
    }

    /// Ends a drain pass; compacts dispatched slots once no pass is active.
    pub fn finish_drain(&mut self, ticket: DrainTicket) {
        debug_assert!(ticket.end <= self.slots.len());
        self.active_drains = self.active_drains.saturating_sub(1);
        if self.active_drains == 0 {
            self.compact();
        }
    }

    fn compact(&mut self) {
        if self.processed == 0 {
            return;
        }
        if self.processed == self.slots.len() {
            self.slots.clear();
        } else {
            self.slots.drain(..self.processed);
        }
        self.processed = 0;
    }
}

impl<T> Default for PurgeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain_all<T>(queue: &mut PurgeQueue<T>, limit: DrainLimit) -> Vec<T> {
        let mut out = Vec::new();
        if let Some(ticket) = queue.begin_drain(limit) {
            while let Some(item) = queue.next_in(&ticket) {
                out.push(item);
            }
            queue.finish_drain(ticket);
        }
        out
    }

    #[test]
    fn purge_queue_dispatches_fifo() {
        let mut queue = PurgeQueue::new();
        queue.push("a");
        queue.push("b");
        queue.push("c");
        assert_eq!(queue.pending(), 3);
        assert_eq!(drain_all(&mut queue, DrainLimit::Bounded), vec!["a", "b", "c"]);
        assert_eq!(queue.pending(), 0);
        assert_eq!(queue.storage_len(), 0);
    }

    #[test]
    fn purge_queue_bounded_pass_leaves_remainder() {
        let mut queue = PurgeQueue::with_max_pending(2);
        for i in 0..5 {
            queue.push(i);
        }
        assert_eq!(drain_all(&mut queue, DrainLimit::Bounded), vec![0, 1]);
        assert_eq!(queue.pending(), 3);
        assert_eq!(queue.storage_len(), 3);
        assert_eq!(drain_all(&mut queue, DrainLimit::Unbounded), vec![2, 3, 4]);
        assert!(!queue.has_pending());
    }

    #[test]
    fn purge_queue_nested_begin_is_noop() {
        let mut queue = PurgeQueue::new();
        queue.push(1);
        queue.push(2);

        let ticket = queue.begin_drain(DrainLimit::Bounded).unwrap();
        assert!(queue.is_draining());
        assert!(queue.begin_drain(DrainLimit::Unbounded).is_none());

        assert_eq!(queue.next_in(&ticket), Some(1));
        queue.push(3);
        assert_eq!(queue.next_in(&ticket), Some(2));
        // Pushed during the pass: beyond this ticket's bound.
        assert_eq!(queue.next_in(&ticket), None);
        queue.finish_drain(ticket);

        assert!(!queue.is_draining());
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.storage_len(), 1);
        assert_eq!(drain_all(&mut queue, DrainLimit::Bounded), vec![3]);
    }

    #[test]
    fn purge_queue_no_compaction_while_draining() {
        let mut queue = PurgeQueue::new();
        queue.push('x');
        queue.push('y');
        let ticket = queue.begin_drain(DrainLimit::Bounded).unwrap();
        assert_eq!(queue.next_in(&ticket), Some('x'));
        assert_eq!(queue.storage_len(), 2);
        queue.finish_drain(ticket);
        assert_eq!(queue.storage_len(), 1);
    }

    #[test]
    fn purge_queue_empty_begin_returns_none() {
        let mut queue: PurgeQueue<u8> = PurgeQueue::default();
        assert!(queue.begin_drain(DrainLimit::Unbounded).is_none());
        assert!(!queue.is_draining());
    }

    #[test]
    fn purge_queue_max_pending_is_clamped() {
        let mut queue: PurgeQueue<u8> = PurgeQueue::with_max_pending(0);
        assert_eq!(queue.max_pending(), 1);
        queue.set_max_pending(1_000_000);
        assert_eq!(queue.max_pending(), MAX_PENDING_CALLBACKS_LIMIT);
        queue.set_max_pending(10);
        assert_eq!(queue.max_pending(), 10);
    }
}
