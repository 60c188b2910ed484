//! Per-table request routing.

use std::{
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::{
    assembler::assemble_row,
    batcher::RequestBatcher,
    client::ClientShared,
    dispatch::{timed, Request, Response},
    error::ClientError,
    get::Get,
    metrics::ClientMetricsSnapshot,
    mutation::Put,
    observability::{log_debug, log_info, log_warn},
    result::RowResult,
    scan::Scan,
    scanner::Scanner,
};

pub const DEFAULT_NAMESPACE: &str = "default";

/// Namespace-qualified table name, written `ns:table` or just `table` for the
/// default namespace.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableName {
    namespace: String,
    qualifier: String,
}

impl TableName {
    pub fn new(namespace: &str, qualifier: &str) -> Result<Self, ClientError> {
        validate_part(namespace)?;
        validate_part(qualifier)?;
        Ok(Self {
            namespace: namespace.to_string(),
            qualifier: qualifier.to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }
}

fn validate_part(part: &str) -> Result<(), ClientError> {
    let legal = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.');
    if part.is_empty() || !part.chars().all(legal) || part.starts_with('.') {
        return Err(ClientError::InvalidArgument(format!(
            "illegal table name component {part:?}"
        )));
    }
    Ok(())
}

impl FromStr for TableName {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((namespace, qualifier)) => TableName::new(namespace, qualifier),
            None => TableName::new(DEFAULT_NAMESPACE, s),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace == DEFAULT_NAMESPACE {
            f.write_str(&self.qualifier)
        } else {
            write!(f, "{}:{}", self.namespace, self.qualifier)
        }
    }
}

/// Handle for reading and writing one table.
///
/// A `Table` keeps no per-request state, so one instance can serve many
/// concurrent operations. It shares the owning [`crate::Client`]'s dispatcher
/// and stops accepting work once either itself or the client is closed.
pub struct Table {
    name: TableName,
    pub(crate) shared: Arc<ClientShared>,
    closed: AtomicBool,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Table {
    pub(crate) fn new(name: TableName, shared: Arc<ClientShared>) -> Self {
        Self {
            name,
            shared,
            closed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &TableName {
        &self.name
    }

    /// Whether this table or its client has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.shared.is_closed()
    }

    pub fn metrics(&self) -> ClientMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    pub(crate) fn ensure_open(&self) -> Result<(), ClientError> {
        if self.shared.is_closed() {
            return Err(ClientError::Closed("client"));
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::Closed("table"));
        }
        Ok(())
    }

    /// Write one row. Exactly one attempt is dispatched.
    pub async fn put(&self, put: Put) -> Result<(), ClientError> {
        self.ensure_open()?;
        put.validate()?;
        let result = self.put_inner(put).await;
        self.finish("put", result)
    }

    async fn put_inner(&self, put: Put) -> Result<(), ClientError> {
        let timeout = self.shared.options.operation_timeout;
        let dispatcher = self.shared.dispatcher.as_ref();
        let destination = timed(timeout, dispatcher.resolve(&self.name, put.row())).await?;
        let request = Request::Mutate {
            table: self.name.clone(),
            put,
        };
        self.shared.metrics.record_put();
        match timed(timeout, dispatcher.send(&destination, request)).await? {
            Response::Ack => Ok(()),
            Response::Rows(_) => Err(ClientError::Protocol(format!(
                "{destination} answered a mutation with rows"
            ))),
        }
    }

    /// Look up one row. A missing row is `Ok(None)`.
    pub async fn get(&self, get: Get) -> Result<Option<RowResult>, ClientError> {
        self.ensure_open()?;
        let result = self.get_inner(get).await;
        self.finish("get", result)
    }

    async fn get_inner(&self, get: Get) -> Result<Option<RowResult>, ClientError> {
        let timeout = self.shared.options.operation_timeout;
        let dispatcher = self.shared.dispatcher.as_ref();
        let row = get.row().clone();
        let destination = timed(timeout, dispatcher.resolve(&self.name, &row)).await?;
        let request = Request::Get {
            table: self.name.clone(),
            gets: vec![get],
        };
        self.shared.metrics.record_get();
        match timed(timeout, dispatcher.send(&destination, request)).await? {
            Response::Rows(rows) if rows.len() == 1 => {
                let cells = rows.into_iter().next().unwrap_or_default();
                assemble_row(&row, cells)
            }
            Response::Rows(rows) => Err(ClientError::Protocol(format!(
                "{destination} returned {} rows for a single get",
                rows.len()
            ))),
            Response::Ack => Err(ClientError::Protocol(format!(
                "{destination} answered a get without rows"
            ))),
        }
    }

    /// Look up many rows at once.
    ///
    /// The inner vector has one entry per lookup, in input order. Each entry
    /// succeeds or fails on its own; the outer error only reports a closed
    /// table.
    pub async fn get_batch(
        &self,
        gets: Vec<Get>,
    ) -> Result<Vec<Result<Option<RowResult>, ClientError>>, ClientError> {
        self.ensure_open()?;
        let rows = gets.len();
        let batcher = RequestBatcher::new(
            self.shared.dispatcher.as_ref(),
            &self.name,
            self.shared.options.operation_timeout,
        );
        let outcome = batcher.execute(gets).await;
        self.shared.metrics.record_batch(rows, outcome.groups);
        self.ensure_open()?;
        for err in outcome.results.iter().filter_map(|r| r.as_ref().err()) {
            self.shared.metrics.record_error(err);
        }
        log_debug!(
            component = "table",
            event = "batch_get_completed",
            table = %self.name,
            rows,
            groups = outcome.groups,
            failed = outcome.failed(),
        );
        Ok(outcome.results)
    }

    /// Create a scanner over `scan`'s range. Nothing is fetched until the
    /// first [`Scanner::next`].
    pub fn scan(&self, scan: Scan) -> Result<Scanner<'_>, ClientError> {
        self.ensure_open()?;
        let caching = match scan.caching() {
            Some(0) => {
                return Err(ClientError::InvalidArgument(
                    "scan caching must be at least one row".into(),
                ))
            }
            Some(rows) => rows,
            None => self.shared.options.scanner_caching,
        };
        self.shared.metrics.record_scanner_opened();
        Ok(Scanner::new(
            self,
            scan.key_range(),
            scan.columns().clone(),
            caching,
        ))
    }

    /// Stop accepting operations. Calling it again does nothing.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        log_info!(component = "table", event = "table_closed", table = %self.name);
    }

    /// Drop results of requests that completed after close, and count errors.
    fn finish<T>(
        &self,
        op: &'static str,
        result: Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        self.ensure_open()?;
        if let Err(err) = &result {
            self.shared.metrics.record_error(err);
            log_warn!(
                component = "table",
                event = "operation_failed",
                table = %self.name,
                op,
                kind = err.kind(),
                error = %err,
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::{TableName, DEFAULT_NAMESPACE};

    #[test]
    fn parse_table_names() {
        let plain: TableName = "test_table".parse().unwrap();
        assert_eq!(plain.namespace(), DEFAULT_NAMESPACE);
        assert_eq!(plain.qualifier(), "test_table");
        assert_eq!(plain.to_string(), "test_table");

        let qualified: TableName = "ns:t1".parse().unwrap();
        assert_eq!(qualified.namespace(), "ns");
        assert_eq!(qualified.to_string(), "ns:t1");
    }

    #[test]
    fn reject_illegal_names() {
        assert!("".parse::<TableName>().is_err());
        assert!("ns:".parse::<TableName>().is_err());
        assert!("bad name".parse::<TableName>().is_err());
        assert!(".hidden".parse::<TableName>().is_err());
    }
}
