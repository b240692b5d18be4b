//! # LruDict: bounded LRU mapping with deferred eviction callbacks
//!
//! [`LruDict`] wraps an [`LruCore`] with everything needed to run user code
//! safely around it: an eviction callback, a purge queue that defers disposal
//! of evicted entries, a fail-fast reentrancy guard, and hit/miss statistics.
//!
//! ## Architecture
//!
//! ```text
//!   ┌───────────────────────────────────────────────────────────────────────┐
//!   │                          LruDict<K, V, S>                             │
//!   │                                                                       │
//!   │   hash(key) ── computed with S before entering ──┐                    │
//!   │                                                  ▼                    │
//!   │   ┌────────────────────┐   enter   ┌──────────────────────────────┐   │
//!   │   │ ReentrancyGuard    │ ────────► │ RefCell<LruCore<K, V>>       │   │
//!   │   │ busy / detect flag │           │ index + recency list         │   │
//!   │   └────────────────────┘           └──────────────┬───────────────┘   │
//!   │                                                   │ evicted entries   │
//!   │              disposal-safe and no callback? ──────┤                   │
//!   │                 yes: release now                  │ no                │
//!   │                                                   ▼                   │
//!   │                                    ┌──────────────────────────────┐   │
//!   │   guard released, then drain ────► │ RefCell<PurgeQueue<(K, V)>>  │   │
//!   │                                    └──────────────┬───────────────┘   │
//!   │                                                   ▼                   │
//!   │                                    callback(key, value), FIFO         │
//!   └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Call Lifecycle
//!
//! 1. Convert inputs and hash the key. `Hash` runs outside the critical
//!    section.
//! 2. Enter the guard. With conflict detection on, a call that arrives while
//!    another is mid-mutation fails with [`LruError::Busy`] and changes
//!    nothing.
//! 3. Mutate the core. Evicted entries are queued or, when that is provably
//!    unobservable, released immediately.
//! 4. Leave the guard, then release replaced values and duplicate keys.
//! 5. After a call that can evict, drain the purge queue unless purging is
//!    suspended. Callbacks run here, with no borrow of the cache state held,
//!    so a callback may call back into the same cache.
//!
//! ## Callback Failures
//!
//! | Result from callback               | Effect                                         |
//! |------------------------------------|------------------------------------------------|
//! | `Ok(())`                           | next pending entry                             |
//! | `Err(CallbackError::Failed(_))`    | `log::warn!`, suppressed, next pending entry   |
//! | `Err(fatal)`                       | drain stops, rest stays queued, caller gets    |
//! |                                    | [`LruError::FatalCallback`]                    |
//!
//! ## Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use lrudict::policy::lru_dict::LruDict;
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&log);
//! let cache = LruDict::builder(2)
//!     .callback(move |key: &'static str, value: Arc<i32>| {
//!         sink.lock().unwrap().push((key, *value));
//!         Ok(())
//!     })
//!     .try_build()
//!     .unwrap();
//!
//! cache.set("a", 1).unwrap();
//! cache.set("b", 2).unwrap();
//! cache.set("c", 3).unwrap();
//!
//! assert_eq!(cache.keys().unwrap(), vec!["c", "b"]);
//! assert_eq!(*log.lock().unwrap(), vec![("a", 1)]);
//! ```
//!
//! ## Thread Safety
//!
//! `LruDict` is `Send` but not `Sync`. Share it across threads through
//! `ConcurrentLruDict` (feature `concurrency`), which serialises every call
//! behind a re-entrant lock.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use rustc_hash::FxBuildHasher;

use crate::builder::LruDictBuilder;
use crate::dispose::entry_is_disposal_safe;
use crate::ds::purge_queue::{DrainLimit, DrainTicket, PurgeQueue};
use crate::error::{CallbackError, ConfigError, InvariantError, LruError};
use crate::guard::{BusyToken, ReentrancyGuard};
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::LruDictMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::LruDictMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{LruDictMetricsRecorder, MetricsReset, MetricsSnapshotProvider};
use crate::policy::lru::{Entry, LruCore, Upsert};

pub use crate::ds::purge_queue::{DEFAULT_MAX_PENDING_CALLBACKS, MAX_PENDING_CALLBACKS_LIMIT};

/// Pairs pulled from the source per critical section in [`LruDict::update`].
pub const UPDATE_BATCH: usize = 64;

/// Eviction callback, invoked once per evicted pair in eviction order.
pub type EvictionCallback<K, V> =
    Arc<dyn Fn(K, Arc<V>) -> Result<(), CallbackError> + Send + Sync>;

/// Lookup counters returned by [`LruDict::stats`]. Both wrap on overflow.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that found their key.
    pub hits: u64,
    /// Lookups that did not.
    pub misses: u64,
}

/// Bounded mapping kept in recency order that hands evicted pairs to an
/// optional callback once the mutating call has finished.
pub struct LruDict<K, V, S = FxBuildHasher> {
    core: RefCell<LruCore<K, V>>,
    // Borrows of the queue and the callback slot never span user code.
    queue: RefCell<PurgeQueue<(K, Arc<V>)>>,
    callback: RefCell<Option<EvictionCallback<K, V>>>,
    guard: ReentrancyGuard,
    hasher: S,
    hits: Cell<u64>,
    misses: Cell<u64>,
    len: Cell<usize>,
    capacity: Cell<usize>,
    suspend_purge: Cell<bool>,
    disposal_safe: bool,
    #[cfg(feature = "metrics")]
    metrics: LruDictMetrics,
}

/// Closes a drain pass on every exit path, unwinding included.
struct DrainPass<'a, T> {
    queue: &'a RefCell<PurgeQueue<T>>,
    ticket: Option<DrainTicket>,
}

impl<T> Drop for DrainPass<'_, T> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.queue.borrow_mut().finish_drain(ticket);
        }
    }
}

impl<K, V> LruDict<K, V, FxBuildHasher>
where
    K: Eq + Hash + Clone + 'static,
    V: 'static,
{
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// Conflict detection is on, purging is automatic, and there is no
    /// callback.
    ///
    /// # Example
    ///
    /// ```
    /// use lrudict::error::LruError;
    /// use lrudict::policy::lru_dict::LruDict;
    ///
    /// let cache: LruDict<u32, String> = LruDict::new(16).unwrap();
    /// assert_eq!(cache.capacity(), 16);
    /// assert!(matches!(LruDict::<u32, String>::new(0), Err(LruError::InvalidCapacity)));
    /// ```
    pub fn new(capacity: usize) -> Result<Self, LruError> {
        if capacity == 0 {
            return Err(LruError::InvalidCapacity);
        }
        Ok(Self::from_parts(
            capacity,
            FxBuildHasher,
            None,
            true,
            false,
            DEFAULT_MAX_PENDING_CALLBACKS,
        ))
    }

    /// Creates a cache with an eviction callback.
    pub fn with_callback<F>(capacity: usize, callback: F) -> Result<Self, LruError>
    where
        F: Fn(K, Arc<V>) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        let cache = Self::new(capacity)?;
        let callback: EvictionCallback<K, V> = Arc::new(callback);
        *cache.callback.borrow_mut() = Some(callback);
        Ok(cache)
    }

    /// Starts a builder for a cache of `capacity` entries.
    pub fn builder(capacity: usize) -> LruDictBuilder<K, V> {
        LruDictBuilder::new(capacity)
    }
}

impl<K, V, S> LruDict<K, V, S>
where
    K: Eq + Hash + Clone + 'static,
    V: 'static,
    S: BuildHasher,
{
    pub(crate) fn from_parts(
        capacity: usize,
        hasher: S,
        callback: Option<EvictionCallback<K, V>>,
        detect_conflict: bool,
        suspend_purge: bool,
        max_pending_callbacks: usize,
    ) -> Self {
        Self {
            core: RefCell::new(LruCore::new(capacity)),
            queue: RefCell::new(PurgeQueue::with_max_pending(max_pending_callbacks)),
            callback: RefCell::new(callback),
            guard: ReentrancyGuard::new(detect_conflict),
            hasher,
            hits: Cell::new(0),
            misses: Cell::new(0),
            len: Cell::new(0),
            capacity: Cell::new(capacity),
            suspend_purge: Cell::new(suspend_purge),
            disposal_safe: entry_is_disposal_safe::<K, V>(),
            #[cfg(feature = "metrics")]
            metrics: LruDictMetrics::default(),
        }
    }

    // -----------------------------------------------------------------
    // Critical-section plumbing
    // -----------------------------------------------------------------

    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }

    fn reject_busy(&self) -> LruError {
        #[cfg(feature = "metrics")]
        self.metrics.record_busy_rejection();
        log::debug!("cache state already borrowed; rejecting reentrant call");
        LruError::Busy
    }

    fn enter(&self) -> Result<BusyToken<'_>, LruError> {
        self.guard.enter().inspect_err(|_| {
            #[cfg(feature = "metrics")]
            self.metrics.record_busy_rejection();
        })
    }

    fn core_mut(&self) -> Result<RefMut<'_, LruCore<K, V>>, LruError> {
        self.core.try_borrow_mut().map_err(|_| self.reject_busy())
    }

    fn core_ref(&self) -> Result<Ref<'_, LruCore<K, V>>, LruError> {
        self.core.try_borrow().map_err(|_| self.reject_busy())
    }

    /// Runs `f` inside the critical section and refreshes the length mirror.
    fn with_core<R>(&self, f: impl FnOnce(&mut LruCore<K, V>) -> R) -> Result<R, LruError> {
        let _token = self.enter()?;
        let mut core = self.core_mut()?;
        let out = f(&mut core);
        self.len.set(core.len());
        Ok(out)
    }

    /// Hands an evicted entry to the purge queue, or releases it on the spot
    /// when no callback is registered and dropping it cannot run user code.
    fn retire(&self, entry: Entry<K, V>) {
        #[cfg(feature = "metrics")]
        self.metrics.record_evicted_entry();
        let has_callback = self
            .callback
            .try_borrow()
            .map_or(true, |callback| callback.is_some());
        if self.disposal_safe && !has_callback {
            #[cfg(feature = "metrics")]
            self.metrics.record_eviction_released();
            drop(entry);
        } else {
            #[cfg(feature = "metrics")]
            self.metrics.record_eviction_queued();
            self.queue.borrow_mut().push(entry.into_pair());
        }
    }

    fn record_lookup(&self, hit: bool) {
        if hit {
            self.hits.set(self.hits.get().wrapping_add(1));
            #[cfg(feature = "metrics")]
            self.metrics.record_get_hit();
        } else {
            self.misses.set(self.misses.get().wrapping_add(1));
            #[cfg(feature = "metrics")]
            self.metrics.record_get_miss();
        }
    }

    #[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
    fn record_upsert(&self, outcome: &Upsert<K, V>) {
        #[cfg(feature = "metrics")]
        match outcome {
            Upsert::Inserted { .. } => self.metrics.record_insert_new(),
            Upsert::Replaced { .. } => self.metrics.record_insert_update(),
        };
    }

    fn auto_purge(&self) -> Result<(), LruError> {
        if self.suspend_purge.get() {
            return Ok(());
        }
        self.drain(DrainLimit::Bounded).map(|_| ())
    }

    // -----------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------

    /// Returns the value for `key` and marks it most recently used.
    ///
    /// Counts a hit or a miss. A miss fails with [`LruError::KeyNotFound`].
    pub fn get(&self, key: &K) -> Result<Arc<V>, LruError> {
        let hash = self.hash_key(key);
        let found = self.with_core(|core| core.get(hash, key))?;
        self.record_lookup(found.is_some());
        found.ok_or(LruError::KeyNotFound)
    }

    /// Like [`get`](Self::get), but returns `default` on a miss.
    ///
    /// The miss is still counted in [`stats`](Self::stats).
    pub fn get_or(&self, key: &K, default: impl Into<Arc<V>>) -> Result<Arc<V>, LruError> {
        let default = default.into();
        let hash = self.hash_key(key);
        let found = self.with_core(|core| core.get(hash, key))?;
        self.record_lookup(found.is_some());
        Ok(found.unwrap_or(default))
    }

    /// Returns `true` if `key` is cached. Does not touch recency or stats.
    pub fn contains(&self, key: &K) -> Result<bool, LruError> {
        let hash = self.hash_key(key);
        Ok(self.core_ref()?.contains(hash, key))
    }

    /// Returns the most recently used pair without reordering.
    pub fn peek_first(&self) -> Result<(K, Arc<V>), LruError> {
        let core = self.core_ref()?;
        core.peek_mru()
            .map(|entry| (entry.key.clone(), Arc::clone(&entry.value)))
            .ok_or(LruError::EmptyCache { op: "peek_first" })
    }

    /// Returns the least recently used pair without reordering.
    pub fn peek_last(&self) -> Result<(K, Arc<V>), LruError> {
        let core = self.core_ref()?;
        core.peek_lru()
            .map(|entry| (entry.key.clone(), Arc::clone(&entry.value)))
            .ok_or(LruError::EmptyCache { op: "peek_last" })
    }

    // -----------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------

    /// Inserts or replaces `key`, making it most recently used.
    ///
    /// Returns the replaced value, if any. Inserting into a full cache evicts
    /// the least recently used entry. Only an insertion drains the purge
    /// queue afterwards, so a replacement always hands back the old value; an
    /// `Err` from that drain means the insertion was applied but a callback
    /// failed fatally.
    pub fn set(&self, key: K, value: impl Into<Arc<V>>) -> Result<Option<Arc<V>>, LruError> {
        let value = value.into();
        let hash = self.hash_key(&key);
        let outcome = self.with_core(|core| {
            let outcome = core.upsert(hash, key, value);
            self.record_upsert(&outcome);
            match outcome {
                Upsert::Inserted { evicted } => {
                    if let Some(entry) = evicted {
                        self.retire(entry);
                    }
                    None
                },
                Upsert::Replaced {
                    old_value,
                    spare_key,
                } => Some((spare_key, old_value)),
            }
        })?;
        match outcome {
            Some((spare_key, old_value)) => {
                drop(spare_key);
                Ok(Some(old_value))
            },
            None => {
                self.auto_purge()?;
                Ok(None)
            },
        }
    }

    /// Removes `key` and releases its pair right away, without the callback.
    pub fn delete(&self, key: &K) -> Result<(), LruError> {
        let hash = self.hash_key(key);
        let removed = self.with_core(|core| core.remove(hash, key))?;
        match removed {
            Some(entry) => {
                drop(entry);
                Ok(())
            },
            None => Err(LruError::KeyNotFound),
        }
    }

    /// Removes `key` and returns its value. Counts a hit or a miss.
    pub fn pop(&self, key: &K) -> Result<Arc<V>, LruError> {
        let hash = self.hash_key(key);
        let removed = self.with_core(|core| core.remove(hash, key))?;
        self.record_lookup(removed.is_some());
        removed
            .map(|entry| entry.into_pair().1)
            .ok_or(LruError::KeyNotFound)
    }

    /// Like [`pop`](Self::pop), but returns `default` when `key` is absent.
    pub fn pop_or(&self, key: &K, default: impl Into<Arc<V>>) -> Result<Arc<V>, LruError> {
        let default = default.into();
        match self.pop(key) {
            Err(LruError::KeyNotFound) => Ok(default),
            other => other,
        }
    }

    /// Removes and returns the least (`least_recent = true`) or most recently
    /// used pair.
    pub fn popitem(&self, least_recent: bool) -> Result<(K, Arc<V>), LruError> {
        let removed = self.with_core(|core| {
            if least_recent {
                core.pop_lru()
            } else {
                core.pop_mru()
            }
        })?;
        removed
            .map(Entry::into_pair)
            .ok_or(LruError::EmptyCache { op: "popitem" })
    }

    /// Returns the cached value for `key`, or inserts `default` and returns it.
    ///
    /// The key is hashed once for both branches. A hit counts in
    /// [`stats`](Self::stats); an insertion does not count as a miss.
    pub fn setdefault(&self, key: K, default: impl Into<Arc<V>>) -> Result<Arc<V>, LruError> {
        let default = default.into();
        let hash = self.hash_key(&key);
        let (value, hit, leftovers) = {
            let _token = self.enter()?;
            let mut core = self.core_mut()?;
            let result = match core.get(hash, &key) {
                Some(value) => (value, true, Some((key, default))),
                None => {
                    let outcome = core.upsert(hash, key, Arc::clone(&default));
                    self.record_upsert(&outcome);
                    match outcome {
                        Upsert::Inserted { evicted } => {
                            if let Some(entry) = evicted {
                                self.retire(entry);
                            }
                            (default, false, None)
                        },
                        Upsert::Replaced {
                            old_value,
                            spare_key,
                        } => (default, false, Some((spare_key, old_value))),
                    }
                },
            };
            self.len.set(core.len());
            result
        };
        if hit {
            self.record_lookup(true);
        }
        drop(leftovers);
        self.auto_purge()?;
        Ok(value)
    }

    /// Imports `pairs` in iteration order with [`set`](Self::set) semantics.
    ///
    /// Pairs are pulled and hashed outside the critical section, applied
    /// [`UPDATE_BATCH`] at a time, and each batch is followed by an automatic
    /// drain. Replaced values are released between batches, so peak memory
    /// and callback bursts stay proportional to the batch size.
    pub fn update<I, T>(&self, pairs: I) -> Result<(), LruError>
    where
        I: IntoIterator<Item = (K, T)>,
        T: Into<Arc<V>>,
    {
        let mut pairs = pairs.into_iter();
        let mut batch: Vec<(u64, K, Arc<V>)> = Vec::with_capacity(UPDATE_BATCH);
        loop {
            for (key, value) in pairs.by_ref().take(UPDATE_BATCH) {
                let hash = self.hash_key(&key);
                batch.push((hash, key, value.into()));
            }
            if batch.is_empty() {
                return Ok(());
            }
            let replaced = self.with_core(|core| {
                let mut replaced = Vec::new();
                for (hash, key, value) in batch.drain(..) {
                    let outcome = core.upsert(hash, key, value);
                    self.record_upsert(&outcome);
                    match outcome {
                        Upsert::Inserted { evicted } => {
                            if let Some(entry) = evicted {
                                self.retire(entry);
                            }
                        },
                        Upsert::Replaced {
                            old_value,
                            spare_key,
                        } => replaced.push((spare_key, old_value)),
                    }
                }
                replaced
            })?;
            drop(replaced);
            self.auto_purge()?;
        }
    }

    /// Changes the capacity, evicting least recently used entries that no
    /// longer fit. `0` fails with [`LruError::InvalidCapacity`].
    pub fn resize(&self, capacity: usize) -> Result<(), LruError> {
        if capacity == 0 {
            return Err(LruError::InvalidCapacity);
        }
        let evicted = self.with_core(|core| {
            let evicted = core.set_capacity(capacity);
            let count = evicted.len();
            for entry in evicted {
                self.retire(entry);
            }
            self.capacity.set(capacity);
            count
        })?;
        if evicted > 0 {
            log::debug!("resize to {capacity} evicted {evicted} entries");
        }
        self.auto_purge()
    }

    /// Drops every entry without invoking the callback and resets
    /// [`stats`](Self::stats). Pending evictions stay queued.
    pub fn clear(&self) -> Result<(), LruError> {
        let entries = self.with_core(|core| core.take_all())?;
        self.hits.set(0);
        self.misses.set(0);
        #[cfg(feature = "metrics")]
        self.metrics.record_clear();
        log::debug!("cleared {} entries", entries.len());
        drop(entries);
        Ok(())
    }

    /// Replaces the eviction callback; `None` disables it.
    ///
    /// Pairs already queued are delivered to whichever callback is set when
    /// they are drained.
    pub fn set_callback(&self, callback: Option<EvictionCallback<K, V>>) -> Result<(), LruError> {
        let previous = {
            let _token = self.enter()?;
            let mut slot = self
                .callback
                .try_borrow_mut()
                .map_err(|_| self.reject_busy())?;
            std::mem::replace(&mut *slot, callback)
        };
        drop(previous);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------

    /// Keys ordered most to least recently used.
    pub fn keys(&self) -> Result<Vec<K>, LruError> {
        let core = self.core_ref()?;
        Ok(core.iter().map(|entry| entry.key.clone()).collect())
    }

    /// Values ordered most to least recently used.
    pub fn values(&self) -> Result<Vec<Arc<V>>, LruError> {
        let core = self.core_ref()?;
        Ok(core.iter().map(|entry| Arc::clone(&entry.value)).collect())
    }

    /// Pairs ordered most to least recently used.
    pub fn items(&self) -> Result<Vec<(K, Arc<V>)>, LruError> {
        let core = self.core_ref()?;
        Ok(core
            .iter()
            .map(|entry| (entry.key.clone(), Arc::clone(&entry.value)))
            .collect())
    }

    /// Collects the pairs into any mapping, fed least to most recently used.
    ///
    /// Re-inserting the result into a fresh cache reproduces this cache's
    /// recency order.
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use std::sync::Arc;
    /// use lrudict::policy::lru_dict::LruDict;
    ///
    /// let cache: LruDict<i32, &str> = LruDict::new(4).unwrap();
    /// cache.update([(1, "a"), (2, "b"), (3, "c")]).unwrap();
    ///
    /// let ordered: Vec<(i32, Arc<&str>)> = cache.to_mapping().unwrap();
    /// assert_eq!(ordered.iter().map(|(k, _)| *k).collect::<Vec<_>>(), vec![1, 2, 3]);
    ///
    /// let map: BTreeMap<i32, Arc<&str>> = cache.to_mapping().unwrap();
    /// assert_eq!(map.len(), 3);
    /// ```
    pub fn to_mapping<B>(&self) -> Result<B, LruError>
    where
        B: FromIterator<(K, Arc<V>)>,
    {
        let pairs: Vec<(K, Arc<V>)> = {
            let core = self.core_ref()?;
            core.iter_lru()
                .map(|entry| (entry.key.clone(), Arc::clone(&entry.value)))
                .collect()
        };
        Ok(pairs.into_iter().collect())
    }

    /// Verifies index, list, capacity and the length mirror agree.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let core = self
            .core
            .try_borrow()
            .map_err(|_| InvariantError::new("cache state is mutably borrowed"))?;
        core.check_invariants()?;
        if core.len() != self.len.get() {
            return Err(InvariantError::new(format!(
                "length mirror {} disagrees with core length {}",
                self.len.get(),
                core.len()
            )));
        }
        if core.capacity() != self.capacity.get() {
            return Err(InvariantError::new(format!(
                "capacity mirror {} disagrees with core capacity {}",
                self.capacity.get(),
                core.capacity()
            )));
        }
        Ok(())
    }
}

impl<K, V, S> LruDict<K, V, S> {
    // -----------------------------------------------------------------
    // Purge queue
    // -----------------------------------------------------------------

    /// Dispatches pending evictions, oldest first.
    ///
    /// A drain started while another is active is a no-op returning `0`.
    fn drain(&self, limit: DrainLimit) -> Result<usize, LruError> {
        let Some(ticket) = self.queue.borrow_mut().begin_drain(limit) else {
            return Ok(0);
        };
        let pass = DrainPass {
            queue: &self.queue,
            ticket: Some(ticket),
        };
        #[cfg(feature = "metrics")]
        self.metrics.record_drain_pass();

        let callback = self.callback.borrow().clone();
        let mut dispatched = 0usize;
        loop {
            let next = match &pass.ticket {
                Some(ticket) => self.queue.borrow_mut().next_in(ticket),
                None => None,
            };
            let Some((key, value)) = next else {
                break;
            };
            dispatched += 1;
            let Some(callback) = &callback else {
                drop((key, value));
                continue;
            };
            #[cfg(feature = "metrics")]
            self.metrics.record_callback_dispatched();
            if let Err(err) = callback(key, value) {
                if err.is_fatal() {
                    #[cfg(feature = "metrics")]
                    self.metrics.record_callback_fatal();
                    log::trace!("drain aborted after {dispatched} entries");
                    return Err(LruError::FatalCallback(err));
                }
                #[cfg(feature = "metrics")]
                self.metrics.record_callback_error();
                log::warn!("exception ignored in eviction callback: {err}");
            }
        }
        drop(pass);
        log::trace!(
            "drain dispatched {dispatched} entries, {} still pending",
            self.queue.borrow().pending()
        );
        Ok(dispatched)
    }

    /// Drains the purge queue now, ignoring suspension and the per-pass bound.
    ///
    /// Returns the number of pending evictions processed, including those
    /// released without a callback. Returns `0` when called from inside a
    /// callback, since the outer drain owns the queue.
    pub fn purge(&self) -> Result<usize, LruError> {
        self.drain(DrainLimit::Unbounded)
    }

    /// Number of evictions waiting for dispatch.
    pub fn purge_queue_len(&self) -> usize {
        self.queue.borrow().pending()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len.get()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len.get() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Returns `(hits, misses)` accumulated since construction or the last
    /// [`clear`](Self::clear).
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
        }
    }

    /// Returns the current eviction callback.
    pub fn callback(&self) -> Option<EvictionCallback<K, V>> {
        self.callback.borrow().clone()
    }

    pub fn suspend_purge(&self) -> bool {
        self.suspend_purge.get()
    }

    /// Suspends or resumes automatic draining after mutating calls.
    /// Evictions still happen; only callback dispatch is deferred.
    pub fn set_suspend_purge(&self, suspend: bool) {
        self.suspend_purge.set(suspend);
    }

    pub fn detect_conflict(&self) -> bool {
        self.guard.detect_conflict()
    }

    /// Turns reentrancy detection on or off.
    ///
    /// With detection off, only externally serialised use is supported.
    /// A reentrant call that still collides with an active borrow fails
    /// with [`LruError::Busy`] rather than corrupting state.
    pub fn set_detect_conflict(&self, on: bool) {
        self.guard.set_detect_conflict(on);
    }

    pub fn max_pending_callbacks(&self) -> usize {
        self.queue.borrow().max_pending()
    }

    /// Bounds the callbacks dispatched per automatic drain pass.
    pub fn set_max_pending_callbacks(&self, max_pending: usize) -> Result<(), ConfigError> {
        validate_max_pending(max_pending)?;
        self.queue.borrow_mut().set_max_pending(max_pending);
        Ok(())
    }

    /// Returns `true` while a mutating call holds the critical section.
    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }
}

pub(crate) fn validate_max_pending(max_pending: usize) -> Result<(), ConfigError> {
    if (1..=MAX_PENDING_CALLBACKS_LIMIT).contains(&max_pending) {
        Ok(())
    } else {
        Err(ConfigError::new(format!(
            "max_pending_callbacks must be in 1..={MAX_PENDING_CALLBACKS_LIMIT}, got {max_pending}"
        )))
    }
}

impl<K, V, S> Drop for LruDict<K, V, S> {
    fn drop(&mut self) {
        if let Err(err) = self.drain(DrainLimit::Unbounded) {
            log::error!("eviction callback failed during cache teardown: {err}");
        }
    }
}

impl<K, V, S> fmt::Debug for LruDict<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruDict")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("pending", &self.purge_queue_len())
            .field("detect_conflict", &self.detect_conflict())
            .field("suspend_purge", &self.suspend_purge())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "metrics")]
impl<K, V, S> MetricsSnapshotProvider<LruDictMetricsSnapshot> for LruDict<K, V, S> {
    fn snapshot(&self) -> LruDictMetricsSnapshot {
        let m = &self.metrics;
        LruDictMetricsSnapshot {
            get_hits: m.get_hits.get(),
            get_misses: m.get_misses.get(),
            insert_new: m.insert_new.get(),
            insert_updates: m.insert_updates.get(),
            evicted_entries: m.evicted_entries.get(),
            evictions_queued: m.evictions_queued.get(),
            evictions_released: m.evictions_released.get(),
            callbacks_dispatched: m.callbacks_dispatched.get(),
            callback_errors: m.callback_errors.get(),
            callback_fatal: m.callback_fatal.get(),
            drain_passes: m.drain_passes.get(),
            busy_rejections: m.busy_rejections.get(),
            clear_calls: m.clear_calls.get(),
            cache_len: self.len(),
            capacity: self.capacity(),
            purge_queue_len: self.purge_queue_len(),
        }
    }
}

#[cfg(feature = "metrics")]
impl<K, V, S> MetricsReset for LruDict<K, V, S> {
    fn reset_metrics(&self) {
        self.metrics.reset_metrics();
    }
}

// ---------------------------------------------------------------------------
// ConcurrentLruDict
// ---------------------------------------------------------------------------

/// Thread-safe [`LruDict`] behind a `parking_lot::ReentrantMutex`.
///
/// The lock is re-entrant on the owning thread, so an eviction callback may
/// still call back into the same handle; the busy flag keeps its fail-fast
/// meaning for anything that re-enters mid-mutation.
#[cfg(feature = "concurrency")]
pub struct ConcurrentLruDict<K, V, S = FxBuildHasher> {
    inner: Arc<parking_lot::ReentrantMutex<LruDict<K, V, S>>>,
}

#[cfg(feature = "concurrency")]
impl<K, V, S> Clone for ConcurrentLruDict<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(feature = "concurrency")]
impl<K, V, S> fmt::Debug for ConcurrentLruDict<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.inner.lock();
        f.debug_struct("ConcurrentLruDict")
            .field("len", &cache.len())
            .field("capacity", &cache.capacity())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "concurrency")]
impl<K, V> ConcurrentLruDict<K, V, FxBuildHasher>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + Sync + 'static,
{
    /// Creates a thread-safe cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Result<Self, LruError> {
        Ok(Self::from_dict(LruDict::new(capacity)?))
    }
}

#[cfg(feature = "concurrency")]
impl<K, V, S> ConcurrentLruDict<K, V, S>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + Sync + 'static,
    S: BuildHasher + Send,
{
    /// Wraps an existing cache.
    pub fn from_dict(dict: LruDict<K, V, S>) -> Self {
        Self {
            inner: Arc::new(parking_lot::ReentrantMutex::new(dict)),
        }
    }

    /// Runs `f` with the lock held, for multi-step operations.
    pub fn with_lock<R>(&self, f: impl FnOnce(&LruDict<K, V, S>) -> R) -> R {
        let cache = self.inner.lock();
        f(&cache)
    }

    pub fn get(&self, key: &K) -> Result<Arc<V>, LruError> {
        self.inner.lock().get(key)
    }

    pub fn get_or(&self, key: &K, default: impl Into<Arc<V>>) -> Result<Arc<V>, LruError> {
        self.inner.lock().get_or(key, default)
    }

    pub fn set(&self, key: K, value: impl Into<Arc<V>>) -> Result<Option<Arc<V>>, LruError> {
        self.inner.lock().set(key, value)
    }

    pub fn delete(&self, key: &K) -> Result<(), LruError> {
        self.inner.lock().delete(key)
    }

    pub fn contains(&self, key: &K) -> Result<bool, LruError> {
        self.inner.lock().contains(key)
    }

    pub fn pop(&self, key: &K) -> Result<Arc<V>, LruError> {
        self.inner.lock().pop(key)
    }

    pub fn popitem(&self, least_recent: bool) -> Result<(K, Arc<V>), LruError> {
        self.inner.lock().popitem(least_recent)
    }

    pub fn setdefault(&self, key: K, default: impl Into<Arc<V>>) -> Result<Arc<V>, LruError> {
        self.inner.lock().setdefault(key, default)
    }

    pub fn keys(&self) -> Result<Vec<K>, LruError> {
        self.inner.lock().keys()
    }

    pub fn resize(&self, capacity: usize) -> Result<(), LruError> {
        self.inner.lock().resize(capacity)
    }

    pub fn clear(&self) -> Result<(), LruError> {
        self.inner.lock().clear()
    }

    pub fn purge(&self) -> Result<usize, LruError> {
        self.inner.lock().purge()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }
}
