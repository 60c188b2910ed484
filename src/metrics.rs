//! Operation counters shared by every table of one client.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ClientError;

/// Point-in-time copy of [`ClientMetrics`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ClientMetricsSnapshot {
    /// Put requests dispatched.
    pub puts: u64,
    /// Single-row gets dispatched.
    pub gets: u64,
    /// Batched get calls.
    pub batch_gets: u64,
    /// Rows requested across all batched gets.
    pub batch_rows: u64,
    /// Destination groups dispatched by batched gets.
    pub batch_groups: u64,
    /// Scanners handed out by `Table::scan`.
    pub scanners_opened: u64,
    /// Scanners explicitly closed.
    pub scanners_closed: u64,
    /// Region scans opened on servers.
    pub region_scans: u64,
    /// Scan fetch round trips.
    pub scan_fetches: u64,
    /// Rows returned by scanners.
    pub scan_rows: u64,
    /// Failures by kind.
    pub errors: ErrorCounts,
}

/// Failure counters keyed by [`ClientError`] kind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ErrorCounts {
    pub routing: u64,
    pub timeout: u64,
    pub remote: u64,
    pub protocol: u64,
    pub other: u64,
}

#[derive(Debug, Default)]
pub struct ClientMetrics {
    puts: AtomicU64,
    gets: AtomicU64,
    batch_gets: AtomicU64,
    batch_rows: AtomicU64,
    batch_groups: AtomicU64,
    scanners_opened: AtomicU64,
    scanners_closed: AtomicU64,
    region_scans: AtomicU64,
    scan_fetches: AtomicU64,
    scan_rows: AtomicU64,
    routing_errors: AtomicU64,
    timeout_errors: AtomicU64,
    remote_errors: AtomicU64,
    protocol_errors: AtomicU64,
    other_errors: AtomicU64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl ClientMetrics {
    pub(crate) fn record_put(&self) {
        bump(&self.puts, 1);
    }

    pub(crate) fn record_get(&self) {
        bump(&self.gets, 1);
    }

    pub(crate) fn record_batch(&self, rows: usize, groups: usize) {
        bump(&self.batch_gets, 1);
        bump(&self.batch_rows, rows as u64);
        bump(&self.batch_groups, groups as u64);
    }

    pub(crate) fn record_scanner_opened(&self) {
        bump(&self.scanners_opened, 1);
    }

    pub(crate) fn record_scanner_closed(&self) {
        bump(&self.scanners_closed, 1);
    }

    pub(crate) fn record_region_scan(&self) {
        bump(&self.region_scans, 1);
    }

    pub(crate) fn record_fetch(&self) {
        bump(&self.scan_fetches, 1);
    }

    pub(crate) fn record_scan_row(&self) {
        bump(&self.scan_rows, 1);
    }

    pub(crate) fn record_error(&self, err: &ClientError) {
        let counter = match err {
            ClientError::Routing(_) => &self.routing_errors,
            ClientError::Timeout(_) => &self.timeout_errors,
            ClientError::Remote { .. } => &self.remote_errors,
            ClientError::Protocol(_) => &self.protocol_errors,
            _ => &self.other_errors,
        };
        bump(counter, 1);
    }

    pub fn snapshot(&self) -> ClientMetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        ClientMetricsSnapshot {
            puts: load(&self.puts),
            gets: load(&self.gets),
            batch_gets: load(&self.batch_gets),
            batch_rows: load(&self.batch_rows),
            batch_groups: load(&self.batch_groups),
            scanners_opened: load(&self.scanners_opened),
            scanners_closed: load(&self.scanners_closed),
            region_scans: load(&self.region_scans),
            scan_fetches: load(&self.scan_fetches),
            scan_rows: load(&self.scan_rows),
            errors: ErrorCounts {
                routing: load(&self.routing_errors),
                timeout: load(&self.timeout_errors),
                remote: load(&self.remote_errors),
                protocol: load(&self.protocol_errors),
                other: load(&self.other_errors),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ClientMetrics;
    use crate::error::ClientError;

    #[test]
    fn counters_accumulate() {
        let metrics = ClientMetrics::default();
        metrics.record_put();
        metrics.record_put();
        metrics.record_batch(10, 3);
        metrics.record_error(&ClientError::Timeout(Duration::from_millis(1)));
        metrics.record_error(&ClientError::Closed("table"));

        let snap = metrics.snapshot();
        assert_eq!(snap.puts, 2);
        assert_eq!(snap.batch_gets, 1);
        assert_eq!(snap.batch_rows, 10);
        assert_eq!(snap.batch_groups, 3);
        assert_eq!(snap.errors.timeout, 1);
        assert_eq!(snap.errors.other, 1);
        assert_eq!(snap.errors.routing, 0);
    }
}
