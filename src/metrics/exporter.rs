use std::io::Write;
use std::sync::{Mutex, PoisonError};

use crate::metrics::snapshot::LruDictMetricsSnapshot;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for cache metrics snapshots.
///
/// This exporter writes in the Prometheus text exposition format so it can be
/// scraped by Prometheus or forwarded to an OpenTelemetry collector.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send + Sync> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send + Sync> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the exporter and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_metric(&self, kind: &str, name: &str, value: u64) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(writer, "# TYPE {} {}", name, kind);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn write_counter(&self, suffix: &str, value: u64) {
        self.write_metric("counter", &self.metric_name(suffix), value);
    }

    fn write_gauge(&self, suffix: &str, value: u64) {
        self.write_metric("gauge", &self.metric_name(suffix), value);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send + Sync> MetricsExporter<LruDictMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &LruDictMetricsSnapshot) {
        self.write_counter("get_hits_total", snapshot.get_hits);
        self.write_counter("get_misses_total", snapshot.get_misses);
        self.write_counter("insert_new_total", snapshot.insert_new);
        self.write_counter("insert_updates_total", snapshot.insert_updates);
        self.write_counter("evicted_entries_total", snapshot.evicted_entries);
        self.write_counter("evictions_queued_total", snapshot.evictions_queued);
        self.write_counter("evictions_released_total", snapshot.evictions_released);
        self.write_counter("callbacks_dispatched_total", snapshot.callbacks_dispatched);
        self.write_counter("callback_errors_total", snapshot.callback_errors);
        self.write_counter("callback_fatal_total", snapshot.callback_fatal);
        self.write_counter("drain_passes_total", snapshot.drain_passes);
        self.write_counter("busy_rejections_total", snapshot.busy_rejections);
        self.write_counter("clear_calls_total", snapshot.clear_calls);
        self.write_gauge("cache_len", snapshot.cache_len as u64);
        self.write_gauge("capacity", snapshot.capacity as u64);
        self.write_gauge("purge_queue_len", snapshot.purge_queue_len as u64);
    }
}
