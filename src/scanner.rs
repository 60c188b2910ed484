//! Resumable cursor over a table key range.
//!
//! A [`Scanner`] walks the range region by region. Each refill asks the
//! current region scan for up to `caching` rows and buffers them; [`Scanner::next`]
//! hands them out one at a time. The remaining range doubles as the cursor:
//! after row `R` is returned the range starts at `Excluded(R)`, so reopening a
//! region scan after a failure resumes exactly behind the last returned row.
//!
//! ```text
//!            next() with rows          end of last region
//!   Open ───────────────────▶ Open ───────────────────────▶ Exhausted
//!    │                                                          │
//!    └──────────────── close() ──────────▶ Closed ◀── close() ──┘
//! ```

use std::{collections::VecDeque, fmt, ops::Bound};

use async_stream::try_stream;
use futures_core::Stream;
use ulid::Ulid;

use crate::{
    assembler::ResultAssembler,
    dispatch::{timed, CellFrame, FetchOutcome, ScanHandle, ScanRequest},
    error::ClientError,
    get::ColumnFilter,
    observability::{log_debug, log_warn},
    result::RowResult,
    row::RowKey,
    scan::KeyRange,
    table::Table,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerState {
    /// More rows may exist upstream.
    Open,
    /// Every region in range reported its end.
    Exhausted,
    /// `close` was called.
    Closed,
}

/// Result of one [`Scanner::next`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Row(RowResult),
    /// No more rows in the scan range.
    EndOfScan,
}

impl ScanOutcome {
    pub fn into_row(self) -> Option<RowResult> {
        match self {
            ScanOutcome::Row(row) => Some(row),
            ScanOutcome::EndOfScan => None,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, ScanOutcome::EndOfScan)
    }
}

/// Sequential cursor produced by [`Table::scan`].
///
/// A scanner is not meant to be shared: `next` and `close` take `&mut self`.
/// Any number of scanners may run against one table at the same time.
pub struct Scanner<'t> {
    table: &'t Table,
    id: Ulid,
    range: KeyRange<RowKey>,
    columns: ColumnFilter,
    caching: usize,
    buffer: VecDeque<RowResult>,
    assembler: ResultAssembler,
    handle: Option<ScanHandle>,
    /// Set while a fetch on `handle` is awaited. Still set on entry to
    /// `refill` means that fetch was abandoned and its rows may have been
    /// consumed server side.
    in_flight: bool,
    state: ScannerState,
    fetches: u64,
}

impl fmt::Debug for Scanner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("table", self.table.name())
            .field("id", &self.id)
            .field("range", &self.range)
            .field("state", &self.state)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

impl<'t> Scanner<'t> {
    pub(crate) fn new(
        table: &'t Table,
        range: KeyRange<RowKey>,
        columns: ColumnFilter,
        caching: usize,
    ) -> Self {
        let state = if range.is_empty() {
            ScannerState::Exhausted
        } else {
            ScannerState::Open
        };
        Self {
            table,
            id: Ulid::new(),
            range,
            columns,
            caching,
            buffer: VecDeque::new(),
            assembler: ResultAssembler::new(),
            handle: None,
            in_flight: false,
            state,
            fetches: 0,
        }
    }

    pub fn state(&self) -> ScannerState {
        self.state
    }

    /// Whether `close` was called, as opposed to the range running out.
    pub fn close_called(&self) -> bool {
        self.state == ScannerState::Closed
    }

    /// Fetch round trips issued so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches
    }

    /// Rows per fetch.
    pub fn caching(&self) -> usize {
        self.caching
    }

    /// Return the next row, or [`ScanOutcome::EndOfScan`] once the range is
    /// done.
    ///
    /// A failed fetch is returned as an error and leaves the scanner open;
    /// calling `next` again retries from just after the last returned row.
    pub async fn next(&mut self) -> Result<ScanOutcome, ClientError> {
        if self.state != ScannerState::Open {
            return Ok(ScanOutcome::EndOfScan);
        }
        if let Err(err) = self.table.ensure_open() {
            self.release_region().await;
            return Err(err);
        }

        if self.buffer.is_empty() {
            match self.refill().await {
                Ok(true) => {}
                Ok(false) => {
                    self.state = ScannerState::Exhausted;
                    log_debug!(
                        component = "scanner",
                        event = "scanner_exhausted",
                        table = %self.table.name(),
                        scanner = %self.id,
                        fetches = self.fetches,
                    );
                    return Ok(ScanOutcome::EndOfScan);
                }
                Err(err) => {
                    self.table.shared.metrics.record_error(&err);
                    log_warn!(
                        component = "scanner",
                        event = "fetch_failed",
                        table = %self.table.name(),
                        scanner = %self.id,
                        kind = err.kind(),
                        error = %err,
                    );
                    return Err(err);
                }
            }
            if let Err(err) = self.table.ensure_open() {
                self.buffer.clear();
                self.release_region().await;
                return Err(err);
            }
        }

        match self.buffer.pop_front() {
            Some(row) => {
                self.range = self.range.after(row.row());
                self.table.shared.metrics.record_scan_row();
                Ok(ScanOutcome::Row(row))
            }
            None => Ok(ScanOutcome::EndOfScan),
        }
    }

    /// Release the server-side scan, if any. Calling it again does nothing.
    pub async fn close(&mut self) {
        if self.state == ScannerState::Closed {
            return;
        }
        self.release_region().await;
        self.buffer.clear();
        self.state = ScannerState::Closed;
        self.table.shared.metrics.record_scanner_closed();
        log_debug!(
            component = "scanner",
            event = "scanner_closed",
            table = %self.table.name(),
            scanner = %self.id,
            fetches = self.fetches,
        );
    }

    /// Consume the scanner as a stream of rows. The scanner is closed when
    /// the stream ends; a failed fetch ends the stream with that error.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<RowResult, ClientError>> + 't {
        try_stream! {
            while let ScanOutcome::Row(row) = self.next().await? {
                yield row;
            }
            self.close().await;
        }
    }

    /// Fill the buffer with at least one row. `Ok(false)` means the range is
    /// exhausted.
    async fn refill(&mut self) -> Result<bool, ClientError> {
        if self.in_flight {
            log_debug!(
                component = "scanner",
                event = "abandoned_fetch_reset",
                table = %self.table.name(),
                scanner = %self.id,
            );
            self.release_region().await;
        }
        loop {
            if self.range.is_empty() {
                self.release_region().await;
                return Ok(false);
            }
            let handle = match self.handle.clone() {
                Some(handle) => handle,
                None => self.open_region().await?,
            };

            self.fetches += 1;
            self.table.shared.metrics.record_fetch();
            let timeout = self.table.shared.options.scanner_timeout;
            self.in_flight = true;
            let fetched = timed(
                timeout,
                self.table
                    .shared
                    .dispatcher
                    .fetch_next(&handle, self.caching),
            )
            .await;
            self.in_flight = false;

            match fetched {
                Ok(FetchOutcome::Frames(frames)) if !frames.is_empty() => {
                    match self.absorb(frames) {
                        Ok(rows) if rows.is_empty() => continue,
                        Ok(rows) => {
                            self.buffer.extend(rows);
                            return Ok(true);
                        }
                        Err(err) => {
                            self.release_region().await;
                            return Err(err);
                        }
                    }
                }
                Ok(_) => {
                    let finished = self.assembler.finish();
                    self.release_region().await;
                    finished?;
                    let region = &handle.destination.region;
                    if region.is_last() || !self.range.extends_to(&region.end_key) {
                        return Ok(false);
                    }
                    if !self.range.starts_before(&region.end_key) {
                        return Err(ClientError::Protocol(format!(
                            "region {} ends at {} which is not past the scan position",
                            region.name, region.end_key
                        )));
                    }
                    self.range = self.range.from_key(&region.end_key);
                    continue;
                }
                Err(err) => {
                    self.release_region().await;
                    return Err(err);
                }
            }
        }
    }

    /// Run one fetch's frames through the assembler. Rows are only kept if
    /// the whole batch is well formed.
    fn absorb(&mut self, frames: Vec<CellFrame>) -> Result<Vec<RowResult>, ClientError> {
        let mut rows = Vec::with_capacity(frames.len());
        for frame in frames {
            if let Some(row) = self.assembler.push(frame)? {
                if !self.range.contains(row.row()) {
                    return Err(ClientError::Protocol(format!(
                        "row {} is outside the remaining scan range",
                        row.row()
                    )));
                }
                rows.push(row);
            }
        }
        Ok(rows)
    }

    async fn open_region(&mut self) -> Result<ScanHandle, ClientError> {
        let start = match &self.range.start {
            Bound::Included(key) | Bound::Excluded(key) => key.clone(),
            Bound::Unbounded => RowKey::default(),
        };
        let shared = &self.table.shared;
        let destination = timed(
            shared.options.operation_timeout,
            shared.dispatcher.resolve(self.table.name(), &start),
        )
        .await?;
        let request = ScanRequest {
            table: self.table.name().clone(),
            range: self.range.clone(),
            columns: self.columns.clone(),
        };
        let handle = timed(
            shared.options.scanner_timeout,
            shared.dispatcher.open_scan(&destination, &request),
        )
        .await?;
        shared.metrics.record_region_scan();
        log_debug!(
            component = "scanner",
            event = "region_opened",
            table = %self.table.name(),
            scanner = %self.id,
            destination = %destination,
            handle = handle.id,
        );
        self.assembler = ResultAssembler::new();
        self.handle = Some(handle.clone());
        Ok(handle)
    }

    /// Close the current region scan. Failures are logged, not returned: the
    /// cursor is unaffected and the next refill opens a fresh scan.
    async fn release_region(&mut self) {
        self.in_flight = false;
        self.assembler.discard_partial();
        let Some(handle) = self.handle.take() else {
            return;
        };
        let shared = &self.table.shared;
        let id = handle.id;
        if let Err(err) = timed(
            shared.options.scanner_timeout,
            shared.dispatcher.close_scan(handle),
        )
        .await
        {
            log_warn!(
                component = "scanner",
                event = "region_close_failed",
                table = %self.table.name(),
                scanner = %self.id,
                handle = id,
                error = %err,
            );
        }
    }
}

impl Drop for Scanner<'_> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        log_warn!(
            component = "scanner",
            event = "scanner_dropped_open",
            table = %self.table.name(),
            scanner = %self.id,
            handle = handle.id,
        );
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let dispatcher = self.table.shared.dispatcher.clone();
            let timeout = self.table.shared.options.scanner_timeout;
            runtime.spawn(async move {
                let _ = timed(timeout, dispatcher.close_scan(handle)).await;
            });
        }
    }
}
