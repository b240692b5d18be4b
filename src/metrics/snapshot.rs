/// Point-in-time copy of an [`LruDict`](crate::policy::lru_dict::LruDict)'s
/// counters plus gauges captured at snapshot time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LruDictMetricsSnapshot {
    pub get_hits: u64,
    pub get_misses: u64,

    pub insert_new: u64,
    pub insert_updates: u64,

    pub evicted_entries: u64,
    pub evictions_queued: u64,
    pub evictions_released: u64,

    pub callbacks_dispatched: u64,
    pub callback_errors: u64,
    pub callback_fatal: u64,
    pub drain_passes: u64,

    pub busy_rejections: u64,
    pub clear_calls: u64,

    // gauges captured at snapshot time
    pub cache_len: usize,
    pub capacity: usize,
    pub purge_queue_len: usize,
}

impl LruDictMetricsSnapshot {
    /// Fraction of lookups that hit, or `0.0` before the first lookup.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.get_hits + self.get_misses;
        if total == 0 {
            0.0
        } else {
            self.get_hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_ratio_handles_zero_lookups() {
        let snap = LruDictMetricsSnapshot::default();
        assert_eq!(snap.hit_ratio(), 0.0);
    }

    #[test]
    fn hit_ratio_counts_hits() {
        let snap = LruDictMetricsSnapshot {
            get_hits: 3,
            get_misses: 1,
            ..Default::default()
        };
        assert!((snap.hit_ratio() - 0.75).abs() < f64::EPSILON);
    }
}
