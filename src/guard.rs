//! Fail-fast reentrancy guard for the cache critical section.
//!
//! Every mutating cache call brackets its critical section with
//! [`ReentrancyGuard::enter`]. While the returned [`BusyToken`] is alive the
//! guard is *busy*; a second `enter` on the same guard is rejected with
//! [`LruError::Busy`] as long as conflict detection is on.
//!
//! The token restores the previous flag value on drop, so the flag is cleared
//! on every exit path, unwinding included.
//!
//! The guard is a diagnostic, not a lock. It never blocks, and the cache does
//! not rely on it for memory safety: the state it protects lives in a
//! `RefCell`, whose own borrow check backs it up when detection is off.

use std::cell::Cell;

use crate::error::LruError;

#[derive(Debug)]
pub(crate) struct ReentrancyGuard {
    busy: Cell<bool>,
    detect_conflict: Cell<bool>,
}

impl ReentrancyGuard {
    pub(crate) fn new(detect_conflict: bool) -> Self {
        Self {
            busy: Cell::new(false),
            detect_conflict: Cell::new(detect_conflict),
        }
    }

    /// Marks the guard busy, or fails with [`LruError::Busy`] if it already is
    /// and conflict detection is on.
    pub(crate) fn enter(&self) -> Result<BusyToken<'_>, LruError> {
        let prev = self.busy.get();
        if prev && self.detect_conflict.get() {
            log::debug!("rejected reentrant call into busy cache");
            return Err(LruError::Busy);
        }
        self.busy.set(true);
        Ok(BusyToken {
            flag: &self.busy,
            prev,
        })
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.busy.get()
    }

    pub(crate) fn detect_conflict(&self) -> bool {
        self.detect_conflict.get()
    }

    pub(crate) fn set_detect_conflict(&self, on: bool) {
        self.detect_conflict.set(on);
    }
}

/// Proof that the critical section is held; clears the busy flag on drop.
#[derive(Debug)]
pub(crate) struct BusyToken<'a> {
    flag: &'a Cell<bool>,
    prev: bool,
}

impl Drop for BusyToken<'_> {
    fn drop(&mut self) {
        self.flag.set(self.prev);
    }
}
