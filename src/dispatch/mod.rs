//! Boundary to the routing and connection layer.
//!
//! The table core never talks to the network directly. It asks a
//! [`RequestDispatcher`] where a row lives and hands it one request at a time.
//! Region location caching, wire encoding, authentication and retries all live
//! behind this trait.

pub mod memory;

use std::{fmt, future::Future, time::Duration};

use async_trait::async_trait;

use crate::{
    error::ClientError,
    get::{ColumnFilter, Get},
    mutation::Put,
    row::{Cell, RowKey},
    scan::KeyRange,
    table::TableName,
};

/// Address of a server process.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerName(pub String);

impl fmt::Display for ServerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A contiguous slice of a table's key space, `[start_key, end_key)`.
/// An empty `end_key` means the region extends to the end of the table.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionInfo {
    pub name: String,
    pub start_key: RowKey,
    pub end_key: RowKey,
}

impl RegionInfo {
    pub fn contains(&self, row: &RowKey) -> bool {
        row >= &self.start_key && (self.end_key.is_empty() || row < &self.end_key)
    }

    /// Whether this is the last region of its table.
    pub fn is_last(&self) -> bool {
        self.end_key.is_empty()
    }
}

/// The server and region responsible for a row.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Destination {
    pub server: ServerName,
    pub region: RegionInfo,
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.region.name, self.server)
    }
}

/// A single round trip's worth of work.
#[derive(Clone, Debug)]
pub enum Request {
    Mutate { table: TableName, put: Put },
    /// Lookups that all route to the same destination.
    Get { table: TableName, gets: Vec<Get> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// The mutation was applied.
    Ack,
    /// One cell list per lookup, in request order. An empty list means the
    /// row does not exist.
    Rows(Vec<Vec<Cell>>),
}

/// Parameters for opening a server-side scan over one region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanRequest {
    pub table: TableName,
    /// Remaining range; the server clamps it to the region.
    pub range: KeyRange<RowKey>,
    pub columns: ColumnFilter,
}

/// Server-side scan resource returned by [`RequestDispatcher::open_scan`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScanHandle {
    pub id: u64,
    pub destination: Destination,
}

/// Part or all of one row's cells.
///
/// Large rows may be split over several frames, possibly over several
/// fetches; only the last frame of a row has `complete` set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellFrame {
    pub row: RowKey,
    pub cells: Vec<Cell>,
    pub complete: bool,
}

impl CellFrame {
    /// A frame carrying a whole row.
    pub fn whole(row: RowKey, cells: Vec<Cell>) -> Self {
        Self {
            row,
            cells,
            complete: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Frames in key order. An empty batch is treated like `EndOfRegion`.
    Frames(Vec<CellFrame>),
    /// The region holds no more rows within the requested range.
    EndOfRegion,
}

/// Routing and transport used by tables and scanners.
///
/// Every method is a single attempt; implementations must not retry.
#[async_trait]
pub trait RequestDispatcher: Send + Sync {
    /// Locate the destination owning `row`.
    async fn resolve(&self, table: &TableName, row: &RowKey) -> Result<Destination, ClientError>;

    /// Send one request and await its response.
    async fn send(&self, destination: &Destination, request: Request)
        -> Result<Response, ClientError>;

    /// Allocate a server-side scan over the part of `request.range` served by
    /// `destination`.
    async fn open_scan(
        &self,
        destination: &Destination,
        request: &ScanRequest,
    ) -> Result<ScanHandle, ClientError>;

    /// Fetch up to `max_rows` frames from an open scan.
    async fn fetch_next(
        &self,
        handle: &ScanHandle,
        max_rows: usize,
    ) -> Result<FetchOutcome, ClientError>;

    /// Release a server-side scan.
    async fn close_scan(&self, handle: ScanHandle) -> Result<(), ClientError>;
}

/// Bound one dispatcher call by `limit`.
pub(crate) async fn timed<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Timeout(limit)),
    }
}
