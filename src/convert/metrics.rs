//! Conversion instrumentation.
//!
//! The converter records every conversion into an injected [`MetricsSink`]
//! instead of module-level globals, so tests can assert on call counts
//! without cross-test pollution. Counters are monotonic; concurrent readers
//! are safe.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::model::DataFormat;

/// Sink for conversion counters and timings.
pub trait MetricsSink: Send + Sync {
    /// Record one completed conversion.
    fn record_conversion(&self, source: DataFormat, target: DataFormat, duration: Duration);

    /// Total conversions recorded since construction.
    fn conversion_count(&self) -> u64;

    /// Rolling average conversion time in milliseconds.
    fn average_duration_ms(&self) -> f64;
}

/// Sink that discards everything; the converter's default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_conversion(&self, _source: DataFormat, _target: DataFormat, _duration: Duration) {}

    fn conversion_count(&self) -> u64 {
        0
    }

    fn average_duration_ms(&self) -> f64 {
        0.0
    }
}

/// Recent-timing ring capacity.
const RECENT_CAPACITY: usize = 256;

/// Atomic counters plus a bounded ring of recent timings.
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    count: AtomicU64,
    total_micros: AtomicU64,
    recent_micros: Mutex<VecDeque<u64>>,
}

impl AtomicMetrics {
    /// Create an empty metrics recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Timings of the most recent conversions, oldest first.
    pub fn recent_durations(&self) -> Vec<Duration> {
        self.recent_micros
            .lock()
            .map(|ring| ring.iter().map(|m| Duration::from_micros(*m)).collect())
            .unwrap_or_default()
    }
}

impl MetricsSink for AtomicMetrics {
    fn record_conversion(&self, _source: DataFormat, _target: DataFormat, duration: Duration) {
        let micros = duration.as_micros() as u64;
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_micros.fetch_add(micros, Ordering::Relaxed);

        if let Ok(mut ring) = self.recent_micros.lock() {
            if ring.len() == RECENT_CAPACITY {
                ring.pop_front();
            }
            ring.push_back(micros);
        }
    }

    fn conversion_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn average_duration_ms(&self) -> f64 {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let total = self.total_micros.load(Ordering::Relaxed);
        (total as f64 / count as f64) / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_noop_metrics_records_nothing() {
        let sink = NoopMetrics;
        sink.record_conversion(
            DataFormat::Graph,
            DataFormat::Table,
            Duration::from_millis(5),
        );
        assert_eq!(sink.conversion_count(), 0);
        assert_eq!(sink.average_duration_ms(), 0.0);
    }

    #[test]
    fn test_atomic_metrics_counts_and_averages() {
        let sink = AtomicMetrics::new();
        sink.record_conversion(
            DataFormat::Graph,
            DataFormat::Table,
            Duration::from_millis(10),
        );
        sink.record_conversion(
            DataFormat::Table,
            DataFormat::Graph,
            Duration::from_millis(20),
        );
        assert_eq!(sink.conversion_count(), 2);
        assert!((sink.average_duration_ms() - 15.0).abs() < 0.01);
        assert_eq!(sink.recent_durations().len(), 2);
    }

    #[test]
    fn test_atomic_metrics_ring_is_bounded() {
        let sink = AtomicMetrics::new();
        for _ in 0..(RECENT_CAPACITY + 10) {
            sink.record_conversion(
                DataFormat::Vector,
                DataFormat::Table,
                Duration::from_millis(1),
            );
        }
        assert_eq!(sink.conversion_count(), (RECENT_CAPACITY + 10) as u64);
        assert_eq!(sink.recent_durations().len(), RECENT_CAPACITY);
    }

    #[test]
    fn test_atomic_metrics_concurrent_increments() {
        let sink = Arc::new(AtomicMetrics::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let sink = Arc::clone(&sink);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    sink.record_conversion(
                        DataFormat::Graph,
                        DataFormat::Vector,
                        Duration::from_micros(500),
                    );
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sink.conversion_count(), 800);
    }
}
