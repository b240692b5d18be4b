//! Builder for [`LruDict`] configuration.
//!
//! Collects capacity, callback, hasher and the three runtime toggles, then
//! validates them all at once in [`LruDictBuilder::try_build`].
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use lrudict::builder::LruDictBuilder;
//!
//! let cache = LruDictBuilder::<u64, String>::new(100)
//!     .detect_conflict(true)
//!     .suspend_purge(false)
//!     .max_pending_callbacks(256)
//!     .callback(|key, value: Arc<String>| {
//!         println!("evicted {key} -> {value}");
//!         Ok(())
//!     })
//!     .try_build()
//!     .unwrap();
//!
//! cache.set(1, "hello".to_string()).unwrap();
//! assert_eq!(cache.get(&1).unwrap().as_str(), "hello");
//! assert_eq!(cache.max_pending_callbacks(), 256);
//! ```
//!
//! ## Defaults
//!
//! | Setting                 | Default                         |
//! |-------------------------|---------------------------------|
//! | `callback`              | none                            |
//! | `detect_conflict`       | `true`                          |
//! | `suspend_purge`         | `false`                         |
//! | `max_pending_callbacks` | [`DEFAULT_MAX_PENDING_CALLBACKS`] |
//! | `hasher`                | `rustc_hash::FxBuildHasher`     |

use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use rustc_hash::FxBuildHasher;

use crate::error::{CallbackError, ConfigError};
use crate::policy::lru_dict::{
    validate_max_pending, EvictionCallback, LruDict, DEFAULT_MAX_PENDING_CALLBACKS,
};

pub struct LruDictBuilder<K, V, S = FxBuildHasher> {
    capacity: usize,
    callback: Option<EvictionCallback<K, V>>,
    detect_conflict: bool,
    suspend_purge: bool,
    max_pending_callbacks: usize,
    hasher: S,
}

impl<K, V> LruDictBuilder<K, V, FxBuildHasher> {
    /// Starts a builder for a cache of `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            callback: None,
            detect_conflict: true,
            suspend_purge: false,
            max_pending_callbacks: DEFAULT_MAX_PENDING_CALLBACKS,
            hasher: FxBuildHasher,
        }
    }
}

impl<K, V, S> LruDictBuilder<K, V, S> {
    /// Registers the eviction callback.
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(K, Arc<V>) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        let callback: EvictionCallback<K, V> = Arc::new(callback);
        self.callback = Some(callback);
        self
    }

    /// Registers an already shared callback, or clears it with `None`.
    pub fn shared_callback(mut self, callback: Option<EvictionCallback<K, V>>) -> Self {
        self.callback = callback;
        self
    }

    pub fn detect_conflict(mut self, on: bool) -> Self {
        self.detect_conflict = on;
        self
    }

    pub fn suspend_purge(mut self, suspend: bool) -> Self {
        self.suspend_purge = suspend;
        self
    }

    pub fn max_pending_callbacks(mut self, max_pending: usize) -> Self {
        self.max_pending_callbacks = max_pending;
        self
    }

    /// Swaps the hash function used for keys.
    pub fn hasher<S2>(self, hasher: S2) -> LruDictBuilder<K, V, S2> {
        LruDictBuilder {
            capacity: self.capacity,
            callback: self.callback,
            detect_conflict: self.detect_conflict,
            suspend_purge: self.suspend_purge,
            max_pending_callbacks: self.max_pending_callbacks,
            hasher,
        }
    }
}

impl<K, V, S> LruDictBuilder<K, V, S>
where
    K: Eq + Hash + Clone + 'static,
    V: 'static,
    S: BuildHasher,
{
    /// Validates the configuration and builds the cache.
    ///
    /// Fails when `capacity` is zero or `max_pending_callbacks` is outside
    /// `1..=65535`.
    pub fn try_build(self) -> Result<LruDict<K, V, S>, ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::new("capacity must be greater than zero"));
        }
        validate_max_pending(self.max_pending_callbacks)?;
        Ok(LruDict::from_parts(
            self.capacity,
            self.hasher,
            self.callback,
            self.detect_conflict,
            self.suspend_purge,
            self.max_pending_callbacks,
        ))
    }
}

impl<K, V, S: fmt::Debug> fmt::Debug for LruDictBuilder<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruDictBuilder")
            .field("capacity", &self.capacity)
            .field("has_callback", &self.callback.is_some())
            .field("detect_conflict", &self.detect_conflict)
            .field("suspend_purge", &self.suspend_purge)
            .field("max_pending_callbacks", &self.max_pending_callbacks)
            .field("hasher", &self.hasher)
            .finish()
    }
}
