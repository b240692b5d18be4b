//! # Metrics Trait Hierarchy
//!
//! Separates *recording*, *snapshotting*, and *export* into small traits so
//! the cache engine only ever writes counters and never knows who reads them.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────┐
//!   │   LruDictMetricsRecorder     │   written by LruDict (&self, interior)
//!   │   lookups/inserts/evictions  │
//!   │   purge queue/guard signals  │
//!   └──────────────┬───────────────┘
//!                  │
//!   Consumption (decoupled from recording):
//!   ┌──────────────┴───────────────┐    ┌──────────────────────────────┐
//!   │ MetricsSnapshotProvider<S>   │───►│ MetricsExporter<S>           │
//!   │ (bench/test)                 │    │ (production monitoring)      │
//!   └──────────────────────────────┘    └──────────────────────────────┘
//! ```
//!
//! ## Design Goals
//! - **Single responsibility**: recorders only write counters; providers only
//!   read/snapshot; exporters only publish to monitoring systems.
//! - **`&self` recording**: every cache operation takes `&self`, so recorders
//!   use interior mutability ([`MetricsCell`](super::cell::MetricsCell)).

/// Counters written by the cache engine.
pub trait LruDictMetricsRecorder {
    fn record_get_hit(&self);
    fn record_get_miss(&self);
    fn record_insert_new(&self);
    fn record_insert_update(&self);
    fn record_evicted_entry(&self);
    /// Evicted entry appended to the purge queue.
    fn record_eviction_queued(&self);
    /// Evicted entry released on the spot (disposal-safe, no callback).
    fn record_eviction_released(&self);
    fn record_callback_dispatched(&self);
    fn record_callback_error(&self);
    fn record_callback_fatal(&self);
    fn record_drain_pass(&self);
    fn record_busy_rejection(&self);
    fn record_clear(&self);
}

/// Snapshot provider for bench/testing.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Reset metrics between tests or benchmark iterations.
pub trait MetricsReset {
    fn reset_metrics(&self);
}

/// Export/publish metrics to production monitoring backends.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
