use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Process-wide request counters, served at /stats.
pub struct Metrics {
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    failed_requests: AtomicUsize,
    documents_processed: AtomicUsize,
    total_ocr_time_us: AtomicU64,
    ocr_calls: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_requests: AtomicUsize::new(0),
            successful_requests: AtomicUsize::new(0),
            failed_requests: AtomicUsize::new(0),
            documents_processed: AtomicUsize::new(0),
            total_ocr_time_us: AtomicU64::new(0),
            ocr_calls: AtomicUsize::new(0),
        })
    }

    pub fn record_request(&self, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_document(&self) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ocr_call(&self, duration: Duration) {
        self.total_ocr_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.ocr_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let calls = self.ocr_calls.load(Ordering::Relaxed);
        let total_us = self.total_ocr_time_us.load(Ordering::Relaxed);
        let avg_ocr_time_ms = if calls > 0 {
            total_us as f64 / calls as f64 / 1000.0
        } else {
            0.0
        };
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            documents_processed: self.documents_processed.load(Ordering::Relaxed),
            ocr_calls: calls,
            avg_ocr_time_ms,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub documents_processed: usize,
    pub ocr_calls: usize,
    pub avg_ocr_time_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = Metrics::new();
        metrics.record_request(true);
        metrics.record_request(false);
        metrics.record_document();
        metrics.record_ocr_call(Duration::from_millis(10));
        metrics.record_ocr_call(Duration::from_millis(20));

        let snap = metrics.snapshot();
        assert_eq!(snap.total_requests, 2);
        assert_eq!(snap.successful_requests, 1);
        assert_eq!(snap.failed_requests, 1);
        assert_eq!(snap.documents_processed, 1);
        assert_eq!(snap.ocr_calls, 2);
        assert!((snap.avg_ocr_time_ms - 15.0).abs() < 0.01);
    }

    #[test]
    fn empty_snapshot_has_zero_average() {
        let snap = Metrics::new().snapshot();
        assert_eq!(snap.avg_ocr_time_ms, 0.0);
    }
}
