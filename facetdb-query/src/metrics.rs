//! Metrics collection and reporting for the query service

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Thread-safe metrics collector for the query service
#[derive(Debug)]
pub struct QueryMetricsCollector {
    /// Dimension-name discovery requests
    pub name_queries_total: AtomicU64,

    /// Dimension-value discovery requests
    pub value_queries_total: AtomicU64,

    /// Measurement query requests
    pub measurement_queries_total: AtomicU64,

    /// Total query errors
    pub errors_total: AtomicU64,

    /// Total rows/records returned
    pub rows_returned_total: AtomicU64,

    /// Total query execution time
    pub query_time_total_ms: AtomicU64,

    /// Slow queries (above threshold)
    pub slow_queries_total: AtomicU64,

    /// Service start time
    start_time: Instant,
}

/// Which of the three exposed operations a sample belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    DimensionNames,
    DimensionValues,
    Measurements,
}

impl Default for QueryMetricsCollector {
    fn default() -> Self {
        Self {
            name_queries_total: AtomicU64::new(0),
            value_queries_total: AtomicU64::new(0),
            measurement_queries_total: AtomicU64::new(0),
            errors_total: AtomicU64::new(0),
            rows_returned_total: AtomicU64::new(0),
            query_time_total_ms: AtomicU64::new(0),
            slow_queries_total: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl QueryMetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed query
    pub fn record_query(
        &self,
        operation: Operation,
        duration: Duration,
        rows_returned: usize,
        slow_query_threshold_ms: u64,
    ) {
        let counter = match operation {
            Operation::DimensionNames => &self.name_queries_total,
            Operation::DimensionValues => &self.value_queries_total,
            Operation::Measurements => &self.measurement_queries_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.rows_returned_total
            .fetch_add(rows_returned as u64, Ordering::Relaxed);

        let duration_ms = duration.as_millis() as u64;
        self.query_time_total_ms
            .fetch_add(duration_ms, Ordering::Relaxed);
        if duration_ms > slow_query_threshold_ms {
            self.slow_queries_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a query error
    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> QueryMetricsSnapshot {
        let uptime = self.start_time.elapsed();
        let names = self.name_queries_total.load(Ordering::Relaxed);
        let values = self.value_queries_total.load(Ordering::Relaxed);
        let measurements = self.measurement_queries_total.load(Ordering::Relaxed);
        let queries = names + values + measurements;
        let total_time = self.query_time_total_ms.load(Ordering::Relaxed);

        QueryMetricsSnapshot {
            name_queries_total: names,
            value_queries_total: values,
            measurement_queries_total: measurements,
            errors_total: self.errors_total.load(Ordering::Relaxed),
            rows_returned_total: self.rows_returned_total.load(Ordering::Relaxed),
            query_time_total_ms: total_time,
            slow_queries_total: self.slow_queries_total.load(Ordering::Relaxed),
            uptime_seconds: uptime.as_secs(),
            avg_query_time_ms: if queries > 0 {
                total_time as f64 / queries as f64
            } else {
                0.0
            },
        }
    }

    /// Generate Prometheus format metrics
    pub fn prometheus_format(&self) -> String {
        let snapshot = self.snapshot();

        format!(
            "# HELP facetdb_query_dimension_name_queries_total Dimension name discovery requests\n\
             # TYPE facetdb_query_dimension_name_queries_total counter\n\
             facetdb_query_dimension_name_queries_total {}\n\
             \n\
             # HELP facetdb_query_dimension_value_queries_total Dimension value discovery requests\n\
             # TYPE facetdb_query_dimension_value_queries_total counter\n\
             facetdb_query_dimension_value_queries_total {}\n\
             \n\
             # HELP facetdb_query_measurement_queries_total Measurement query requests\n\
             # TYPE facetdb_query_measurement_queries_total counter\n\
             facetdb_query_measurement_queries_total {}\n\
             \n\
             # HELP facetdb_query_errors_total Total number of query errors\n\
             # TYPE facetdb_query_errors_total counter\n\
             facetdb_query_errors_total {}\n\
             \n\
             # HELP facetdb_query_rows_returned_total Total rows and records returned\n\
             # TYPE facetdb_query_rows_returned_total counter\n\
             facetdb_query_rows_returned_total {}\n\
             \n\
             # HELP facetdb_query_time_total_ms Total query execution time in milliseconds\n\
             # TYPE facetdb_query_time_total_ms counter\n\
             facetdb_query_time_total_ms {}\n\
             \n\
             # HELP facetdb_query_slow_queries_total Total number of slow queries\n\
             # TYPE facetdb_query_slow_queries_total counter\n\
             facetdb_query_slow_queries_total {}\n\
             \n\
             # HELP facetdb_query_uptime_seconds Service uptime in seconds\n\
             # TYPE facetdb_query_uptime_seconds gauge\n\
             facetdb_query_uptime_seconds {}\n\
             \n\
             # HELP facetdb_query_avg_time_ms Average query execution time in milliseconds\n\
             # TYPE facetdb_query_avg_time_ms gauge\n\
             facetdb_query_avg_time_ms {}\n",
            snapshot.name_queries_total,
            snapshot.value_queries_total,
            snapshot.measurement_queries_total,
            snapshot.errors_total,
            snapshot.rows_returned_total,
            snapshot.query_time_total_ms,
            snapshot.slow_queries_total,
            snapshot.uptime_seconds,
            snapshot.avg_query_time_ms
        )
    }
}

/// Snapshot of query metrics at a point in time
#[derive(Debug, Clone)]
pub struct QueryMetricsSnapshot {
    pub name_queries_total: u64,
    pub value_queries_total: u64,
    pub measurement_queries_total: u64,
    pub errors_total: u64,
    pub rows_returned_total: u64,
    pub query_time_total_ms: u64,
    pub slow_queries_total: u64,
    pub uptime_seconds: u64,
    pub avg_query_time_ms: f64,
}

/// Helper for timing query operations
pub struct QueryTimer {
    start: Instant,
}

impl QueryTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Finish timing and record to the collector
    pub fn finish(
        self,
        collector: &QueryMetricsCollector,
        operation: Operation,
        rows_returned: usize,
        slow_threshold_ms: u64,
    ) {
        collector.record_query(operation, self.elapsed(), rows_returned, slow_threshold_ms);
    }
}
