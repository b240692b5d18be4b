pub use crate::builder::LruDictBuilder;
pub use crate::dispose::is_disposal_safe;
pub use crate::error::{CallbackError, ConfigError, LruError};
#[cfg(feature = "concurrency")]
pub use crate::policy::lru_dict::ConcurrentLruDict;
pub use crate::policy::lru_dict::{
    CacheStats, EvictionCallback, LruDict, DEFAULT_MAX_PENDING_CALLBACKS,
    MAX_PENDING_CALLBACKS_LIMIT, UPDATE_BATCH,
};

#[cfg(feature = "metrics")]
pub use crate::metrics::traits::{MetricsExporter, MetricsReset, MetricsSnapshotProvider};
