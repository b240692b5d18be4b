use std::cell::Cell;

/// A metrics-only counter cell.
///
/// Lets `&self` cache methods bump counters. The owning cache is `!Sync`, so
/// every access is already confined to one thread at a time; wrapping the
/// cache in a lock keeps that true across threads.
#[repr(transparent)]
#[derive(Debug, Default)]
pub struct MetricsCell(Cell<u64>);

impl MetricsCell {
    #[inline]
    pub fn new() -> Self {
        Self(Cell::new(0))
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0.get()
    }

    #[inline]
    pub fn incr(&self) {
        self.add(1);
    }

    #[inline]
    pub fn add(&self, n: u64) {
        self.0.set(self.0.get().wrapping_add(n));
    }

    #[inline]
    pub fn reset(&self) {
        self.0.set(0);
    }
}
