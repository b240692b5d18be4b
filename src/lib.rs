//! lrudict: a bounded LRU mapping with deferred, re-entry-safe eviction
//! callbacks.
//!
//! See `DESIGN.md` for internal architecture and invariants.

pub mod builder;
pub mod dispose;
pub mod ds;
pub mod error;
mod guard;
pub mod policy;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;

pub use crate::builder::LruDictBuilder;
pub use crate::error::{CallbackError, ConfigError, InvariantError, LruError};
#[cfg(feature = "metrics")]
pub use crate::metrics::snapshot::LruDictMetricsSnapshot;
#[cfg(feature = "concurrency")]
pub use crate::policy::lru_dict::ConcurrentLruDict;
pub use crate::policy::lru_dict::{CacheStats, EvictionCallback, LruDict};
