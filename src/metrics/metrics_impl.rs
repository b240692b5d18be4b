use crate::metrics::cell::MetricsCell;
use crate::metrics::traits::{LruDictMetricsRecorder, MetricsReset};

#[derive(Debug, Default)]
pub struct LruDictMetrics {
    pub get_hits: MetricsCell,
    pub get_misses: MetricsCell,
    pub insert_new: MetricsCell,
    pub insert_updates: MetricsCell,
    pub evicted_entries: MetricsCell,
    pub evictions_queued: MetricsCell,
    pub evictions_released: MetricsCell,
    pub callbacks_dispatched: MetricsCell,
    pub callback_errors: MetricsCell,
    pub callback_fatal: MetricsCell,
    pub drain_passes: MetricsCell,
    pub busy_rejections: MetricsCell,
    pub clear_calls: MetricsCell,
}

impl LruDictMetricsRecorder for LruDictMetrics {
    fn record_get_hit(&self) {
        self.get_hits.incr();
    }

    fn record_get_miss(&self) {
        self.get_misses.incr();
    }

    fn record_insert_new(&self) {
        self.insert_new.incr();
    }

    fn record_insert_update(&self) {
        self.insert_updates.incr();
    }

    fn record_evicted_entry(&self) {
        self.evicted_entries.incr();
    }

    fn record_eviction_queued(&self) {
        self.evictions_queued.incr();
    }

    fn record_eviction_released(&self) {
        self.evictions_released.incr();
    }

    fn record_callback_dispatched(&self) {
        self.callbacks_dispatched.incr();
    }

    fn record_callback_error(&self) {
        self.callback_errors.incr();
    }

    fn record_callback_fatal(&self) {
        self.callback_fatal.incr();
    }

    fn record_drain_pass(&self) {
        self.drain_passes.incr();
    }

    fn record_busy_rejection(&self) {
        self.busy_rejections.incr();
    }

    fn record_clear(&self) {
        self.clear_calls.incr();
    }
}

impl MetricsReset for LruDictMetrics {
    fn reset_metrics(&self) {
        for cell in [
            &self.get_hits,
            &self.get_misses,
            &self.insert_new,
            &self.insert_updates,
            &self.evicted_entries,
            &self.evictions_queued,
            &self.evictions_released,
            &self.callbacks_dispatched,
            &self.callback_errors,
            &self.callback_fatal,
            &self.drain_passes,
            &self.busy_rejections,
            &self.clear_calls,
        ] {
            cell.reset();
        }
    }
}
