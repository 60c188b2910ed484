//! Table access and scanning core for a partitioned, row-keyed KV store.
//!
//! A [`Client`] owns a [`Configuration`] and a [`RequestDispatcher`], the
//! boundary to whatever locates regions and talks to servers. From it callers
//! open [`Table`]s and issue puts, single and batched gets, and range scans.
//!
//! ```ignore
//! let client = Client::new(conf, dispatcher)?;
//! let table = client.table("test_table")?;
//! table.put(Put::new("row_1").add_column("f", "q", "v")).await?;
//! let found = table.get(Get::new("row_1")).await?;
//!
//! let mut scanner = table.scan(Scan::new().with_start_row("row_0"))?;
//! while let ScanOutcome::Row(row) = scanner.next().await? {
//!     println!("{}", display::ResultDisplay(&row));
//! }
//! scanner.close().await;
//! ```
//!
//! Each dispatched request carries its own timeout. Nothing is retried here;
//! retry policy belongs to the dispatcher or the caller.

mod observability;

pub mod assembler;
pub mod batcher;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod get;
pub mod metrics;
pub mod mutation;
pub mod result;
pub mod row;
pub mod scan;
pub mod scanner;
pub mod table;

pub use crate::{
    client::Client,
    config::Configuration,
    dispatch::{memory::InMemoryCluster, RequestDispatcher},
    error::ClientError,
    get::Get,
    mutation::Put,
    result::RowResult,
    row::{Cell, RowKey},
    scan::Scan,
    scanner::{ScanOutcome, Scanner, ScannerState},
    table::{Table, TableName},
};
