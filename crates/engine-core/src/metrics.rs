use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    records_read: AtomicU64,
    bytes_batched: AtomicU64,
    batches_dispatched: AtomicU64,
    records_inserted: AtomicU64,
    failure_count: AtomicU64,
}

/// Run-wide counters shared by readers and workers.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_read: u64,
    pub bytes_batched: u64,
    pub batches_dispatched: u64,
    pub records_inserted: u64,
    pub failure_count: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn increment_records_read(&self, count: u64) {
        self.inner.records_read.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_bytes(&self, count: u64) {
        self.inner.bytes_batched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_batches(&self, count: u64) {
        self.inner
            .batches_dispatched
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_records_inserted(&self, count: u64) {
        self.inner
            .records_inserted
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_failures(&self, count: u64) {
        self.inner.failure_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_read: self.inner.records_read.load(Ordering::Relaxed),
            bytes_batched: self.inner.bytes_batched.load(Ordering::Relaxed),
            batches_dispatched: self.inner.batches_dispatched.load(Ordering::Relaxed),
            records_inserted: self.inner.records_inserted.load(Ordering::Relaxed),
            failure_count: self.inner.failure_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_counters() {
        let metrics = Metrics::new();
        let other = metrics.clone();
        metrics.increment_records_read(3);
        other.increment_records_read(2);
        other.increment_batches(1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.records_read, 5);
        assert_eq!(snapshot.batches_dispatched, 1);
        assert_eq!(snapshot.failure_count, 0);
    }
}
