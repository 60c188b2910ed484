//! In-process cluster implementing [`RequestDispatcher`].
//!
//! Tables are pre-split into regions spread over named servers, the way a
//! small test cluster would be laid out. Each column keeps its latest
//! version only. Faults can be injected per server or per fetch, and large
//! rows can be chunked into several frames to exercise row reassembly.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, VecDeque},
    ops::Bound,
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use super::{
    CellFrame, Destination, FetchOutcome, RegionInfo, Request, RequestDispatcher, Response,
    ScanHandle, ScanRequest, ServerName,
};
use crate::{
    error::ClientError,
    get::ColumnFilter,
    row::{Cell, RowKey, LATEST_TIMESTAMP},
    scan::KeyRange,
    table::TableName,
};

type Columns = BTreeMap<(Bytes, Bytes), (u64, Bytes)>;

/// Request counters observed by the cluster.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClusterStats {
    pub resolves: u64,
    pub mutate_requests: u64,
    pub get_requests: u64,
    pub scans_opened: u64,
    pub fetches: u64,
    pub scans_closed: u64,
    /// Scan handles currently held open.
    pub active_scans: usize,
}

#[derive(Default)]
struct TableData {
    regions: Vec<Destination>,
    rows: BTreeMap<RowKey, Columns>,
}

impl TableData {
    fn region_for(&self, row: &RowKey) -> Option<&Destination> {
        self.regions.iter().find(|d| d.region.contains(row))
    }
}

struct OpenScan {
    table: TableName,
    range: KeyRange<RowKey>,
    columns: ColumnFilter,
    position: Bound<RowKey>,
    pending: VecDeque<CellFrame>,
    drained: bool,
}

#[derive(Default)]
struct ClusterState {
    tables: BTreeMap<TableName, TableData>,
    scans: HashMap<u64, OpenScan>,
    next_scan_id: u64,
    clock: u64,
    down: BTreeSet<String>,
    delay: Option<Duration>,
    failing_fetches: usize,
    truncated_rows: usize,
    max_cells_per_frame: Option<usize>,
    stats: ClusterStats,
}

impl ClusterState {
    fn check_server(&self, server: &ServerName) -> Result<(), ClientError> {
        if self.down.contains(&server.0) {
            return Err(ClientError::remote(&server.0, "server unreachable"));
        }
        Ok(())
    }

    fn table(&self, name: &TableName) -> Result<&TableData, ClientError> {
        self.tables
            .get(name)
            .ok_or_else(|| ClientError::Routing(format!("table {name} does not exist")))
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// Region-partitioned in-memory store.
#[derive(Default)]
pub struct InMemoryCluster {
    state: Mutex<ClusterState>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) `table`, split before each of `split_keys`, with
    /// regions assigned round-robin to `servers` servers named `server-N`.
    pub fn create_table(&self, table: &TableName, split_keys: &[&str], servers: usize) {
        let servers = servers.max(1);
        let mut bounds: Vec<RowKey> = split_keys.iter().map(|k| RowKey::from(*k)).collect();
        bounds.sort();
        bounds.dedup();
        bounds.retain(|k| !k.is_empty());

        let mut starts = vec![RowKey::default()];
        starts.extend(bounds.iter().cloned());
        let mut ends = bounds;
        ends.push(RowKey::default());

        let regions = starts
            .into_iter()
            .zip(ends)
            .enumerate()
            .map(|(idx, (start_key, end_key))| Destination {
                server: ServerName(format!("server-{}", idx % servers)),
                region: RegionInfo {
                    name: format!("{table},{start_key},{idx}"),
                    start_key,
                    end_key,
                },
            })
            .collect();

        self.state.lock().tables.insert(
            table.clone(),
            TableData {
                regions,
                rows: BTreeMap::new(),
            },
        );
    }

    /// Write a cell directly, bypassing routing and fault injection.
    pub fn load(&self, table: &TableName, row: &str, family: &str, qualifier: &str, value: &str) {
        let mut state = self.state.lock();
        let ts = state.tick();
        if let Some(data) = state.tables.get_mut(table) {
            data.rows.entry(RowKey::from(row)).or_default().insert(
                (
                    Bytes::copy_from_slice(family.as_bytes()),
                    Bytes::copy_from_slice(qualifier.as_bytes()),
                ),
                (ts, Bytes::copy_from_slice(value.as_bytes())),
            );
        }
    }

    pub fn regions(&self, table: &TableName) -> Vec<Destination> {
        self.state
            .lock()
            .tables
            .get(table)
            .map(|data| data.regions.clone())
            .unwrap_or_default()
    }

    pub fn row_count(&self, table: &TableName) -> usize {
        self.state
            .lock()
            .tables
            .get(table)
            .map_or(0, |data| data.rows.len())
    }

    /// Make every request routed to `server` fail with a remote error.
    pub fn set_server_down(&self, server: &str, down: bool) {
        let mut state = self.state.lock();
        if down {
            state.down.insert(server.to_string());
        } else {
            state.down.remove(server);
        }
    }

    /// Delay every dispatcher call by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().delay = delay;
    }

    /// Fail the next `count` fetches with a remote error.
    pub fn fail_next_fetches(&self, count: usize) {
        self.state.lock().failing_fetches = count;
    }

    /// Cut off the next `count` scanned rows: their final frame is sent
    /// without `complete` set and nothing else of the row follows.
    pub fn truncate_next_rows(&self, count: usize) {
        self.state.lock().truncated_rows = count;
    }

    /// Split rows with more than `max` cells over several frames.
    pub fn set_max_cells_per_frame(&self, max: Option<usize>) {
        self.state.lock().max_cells_per_frame = max.map(|m| m.max(1));
    }

    pub fn stats(&self) -> ClusterStats {
        let state = self.state.lock();
        ClusterStats {
            active_scans: state.scans.len(),
            ..state.stats.clone()
        }
    }

    async fn pause(&self) {
        let delay = self.state.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn apply_put(
        state: &mut ClusterState,
        destination: &Destination,
        table: &TableName,
        cells: Vec<Cell>,
        row: RowKey,
    ) -> Result<Response, ClientError> {
        if !destination.region.contains(&row) {
            return Err(not_serving(destination, &row));
        }
        let mut stamped = Vec::with_capacity(cells.len());
        for cell in cells {
            let ts = if cell.timestamp == LATEST_TIMESTAMP {
                state.tick()
            } else {
                cell.timestamp
            };
            stamped.push((cell.family, cell.qualifier, ts, cell.value));
        }
        let data = state
            .tables
            .get_mut(table)
            .ok_or_else(|| ClientError::remote(&destination.server.0, "table not found"))?;
        let columns = data.rows.entry(row).or_default();
        for (family, qualifier, ts, value) in stamped {
            let slot = columns.entry((family, qualifier)).or_insert((0, Bytes::new()));
            if ts >= slot.0 {
                *slot = (ts, value);
            }
        }
        Ok(Response::Ack)
    }
}

fn not_serving(destination: &Destination, row: &RowKey) -> ClientError {
    ClientError::remote(
        &destination.server.0,
        format!("region {} does not serve row {row}", destination.region.name),
    )
}

fn select(row: &RowKey, columns: &Columns, filter: &ColumnFilter) -> Vec<Cell> {
    columns
        .iter()
        .filter(|((family, qualifier), _)| filter.matches(family, qualifier))
        .map(|((family, qualifier), (ts, value))| Cell {
            row: row.clone(),
            family: family.clone(),
            qualifier: qualifier.clone(),
            timestamp: *ts,
            value: value.clone(),
        })
        .collect()
}

fn clamp_to_region(range: &KeyRange<RowKey>, region: &RegionInfo) -> KeyRange<RowKey> {
    let start = match &range.start {
        Bound::Included(k) | Bound::Excluded(k) if k >= &region.start_key => range.start.clone(),
        _ => Bound::Included(region.start_key.clone()),
    };
    let end = if region.end_key.is_empty() {
        range.end.clone()
    } else {
        match &range.end {
            Bound::Included(k) | Bound::Excluded(k) if k < &region.end_key => range.end.clone(),
            _ => Bound::Excluded(region.end_key.clone()),
        }
    };
    KeyRange::new(start, end)
}

#[async_trait]
impl RequestDispatcher for InMemoryCluster {
    async fn resolve(&self, table: &TableName, row: &RowKey) -> Result<Destination, ClientError> {
        self.pause().await;
        let mut state = self.state.lock();
        state.stats.resolves += 1;
        let data = state.table(table)?;
        data.region_for(row)
            .cloned()
            .ok_or_else(|| ClientError::Routing(format!("no region of {table} holds {row}")))
    }

    async fn send(
        &self,
        destination: &Destination,
        request: Request,
    ) -> Result<Response, ClientError> {
        self.pause().await;
        let mut state = self.state.lock();
        match &request {
            Request::Mutate { .. } => state.stats.mutate_requests += 1,
            Request::Get { .. } => state.stats.get_requests += 1,
        }
        state.check_server(&destination.server)?;
        match request {
            Request::Mutate { table, put } => {
                let row = put.row().clone();
                Self::apply_put(&mut state, destination, &table, put.cells().to_vec(), row)
            }
            Request::Get { table, gets } => {
                let data = state
                    .tables
                    .get(&table)
                    .ok_or_else(|| ClientError::remote(&destination.server.0, "table not found"))?;
                let mut rows = Vec::with_capacity(gets.len());
                for get in &gets {
                    if !destination.region.contains(get.row()) {
                        return Err(not_serving(destination, get.row()));
                    }
                    let cells = data
                        .rows
                        .get(get.row())
                        .map(|columns| select(get.row(), columns, get.columns()))
                        .unwrap_or_default();
                    rows.push(cells);
                }
                Ok(Response::Rows(rows))
            }
        }
    }

    async fn open_scan(
        &self,
        destination: &Destination,
        request: &ScanRequest,
    ) -> Result<ScanHandle, ClientError> {
        self.pause().await;
        let mut state = self.state.lock();
        state.check_server(&destination.server)?;
        if !state.tables.contains_key(&request.table) {
            return Err(ClientError::remote(&destination.server.0, "table not found"));
        }
        let range = clamp_to_region(&request.range, &destination.region);
        state.next_scan_id += 1;
        let id = state.next_scan_id;
        state.scans.insert(
            id,
            OpenScan {
                table: request.table.clone(),
                position: range.start.clone(),
                range,
                columns: request.columns.clone(),
                pending: VecDeque::new(),
                drained: false,
            },
        );
        state.stats.scans_opened += 1;
        Ok(ScanHandle {
            id,
            destination: destination.clone(),
        })
    }

    async fn fetch_next(
        &self,
        handle: &ScanHandle,
        max_rows: usize,
    ) -> Result<FetchOutcome, ClientError> {
        self.pause().await;
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.check_server(&handle.destination.server)?;
        state.stats.fetches += 1;
        if state.failing_fetches > 0 {
            state.failing_fetches -= 1;
            return Err(ClientError::remote(
                &handle.destination.server.0,
                "injected fetch failure",
            ));
        }
        let chunk = state.max_cells_per_frame;
        let mut truncate = state.truncated_rows;
        let scan = state.scans.get_mut(&handle.id).ok_or_else(|| {
            ClientError::remote(&handle.destination.server.0, "unknown scanner")
        })?;
        let data = state
            .tables
            .get(&scan.table)
            .ok_or_else(|| ClientError::remote(&handle.destination.server.0, "table not found"))?;

        let mut frames = Vec::new();
        while frames.len() < max_rows.max(1) {
            if let Some(frame) = scan.pending.pop_front() {
                frames.push(frame);
                continue;
            }
            let remaining = KeyRange::new(scan.position.clone(), scan.range.end.clone());
            if scan.drained || remaining.is_empty() {
                break;
            }
            let next = data
                .rows
                .range((remaining.start, remaining.end))
                .map(|(row, columns)| (row.clone(), select(row, columns, &scan.columns)))
                .find(|(_, cells)| !cells.is_empty());
            let Some((row, cells)) = next else {
                scan.drained = true;
                break;
            };
            scan.position = Bound::Excluded(row.clone());
            match chunk {
                Some(max) if cells.len() > max => {
                    let mut parts = cells.chunks(max).peekable();
                    while let Some(part) = parts.next() {
                        scan.pending.push_back(CellFrame {
                            row: row.clone(),
                            cells: part.to_vec(),
                            complete: parts.peek().is_none(),
                        });
                    }
                }
                _ => scan.pending.push_back(CellFrame::whole(row, cells)),
            }
            if truncate > 0 {
                truncate -= 1;
                if let Some(last) = scan.pending.back_mut() {
                    last.complete = false;
                }
            }
        }
        state.truncated_rows = truncate;

        if frames.is_empty() {
            Ok(FetchOutcome::EndOfRegion)
        } else {
            Ok(FetchOutcome::Frames(frames))
        }
    }

    async fn close_scan(&self, handle: ScanHandle) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        match state.scans.remove(&handle.id) {
            Some(_) => {
                state.stats.scans_closed += 1;
                Ok(())
            }
            None => Err(ClientError::remote(
                &handle.destination.server.0,
                "unknown scanner",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ops::Bound;

    use super::{clamp_to_region, InMemoryCluster};
    use crate::{
        dispatch::{FetchOutcome, RegionInfo, RequestDispatcher, ScanRequest},
        get::ColumnFilter,
        row::RowKey,
        scan::KeyRange,
        table::TableName,
    };

    #[test]
    fn regions_cover_key_space() {
        let cluster = InMemoryCluster::new();
        let table: TableName = "t".parse().unwrap();
        cluster.create_table(&table, &["m", "f", "m"], 2);
        let regions = cluster.regions(&table);
        assert_eq!(regions.len(), 3);
        assert!(regions[0].region.start_key.is_empty());
        assert_eq!(regions[0].region.end_key, RowKey::from("f"));
        assert_eq!(regions[1].region.end_key, RowKey::from("m"));
        assert!(regions[2].region.is_last());
        assert_eq!(regions[2].server.0, "server-0");
    }

    #[test]
    fn clamp_range() {
        let region = RegionInfo {
            name: "r".into(),
            start_key: RowKey::from("f"),
            end_key: RowKey::from("m"),
        };
        let clamped = clamp_to_region(&KeyRange::all(), &region);
        assert_eq!(clamped.start, Bound::Included(RowKey::from("f")));
        assert_eq!(clamped.end, Bound::Excluded(RowKey::from("m")));

        let inner = KeyRange::new(
            Bound::Excluded(RowKey::from("g")),
            Bound::Excluded(RowKey::from("h")),
        );
        assert_eq!(clamp_to_region(&inner, &region), inner);
    }

    #[tokio::test]
    async fn chunked_rows_span_fetches() {
        let cluster = InMemoryCluster::new();
        let table: TableName = "t".parse().unwrap();
        cluster.create_table(&table, &[], 1);
        for q in ["a", "b", "c"] {
            cluster.load(&table, "row", "f", q, "v");
        }
        cluster.set_max_cells_per_frame(Some(2));

        let dest = cluster.resolve(&table, &RowKey::from("row")).await.unwrap();
        let handle = cluster
            .open_scan(
                &dest,
                &ScanRequest {
                    table: table.clone(),
                    range: KeyRange::all(),
                    columns: ColumnFilter::default(),
                },
            )
            .await
            .unwrap();

        let FetchOutcome::Frames(first) = cluster.fetch_next(&handle, 1).await.unwrap() else {
            panic!("expected frames");
        };
        assert_eq!(first.len(), 1);
        assert!(!first[0].complete);
        let FetchOutcome::Frames(second) = cluster.fetch_next(&handle, 1).await.unwrap() else {
            panic!("expected frames");
        };
        assert!(second[0].complete);
        assert_eq!(
            cluster.fetch_next(&handle, 1).await.unwrap(),
            FetchOutcome::EndOfRegion
        );
        cluster.close_scan(handle.clone()).await.unwrap();
        assert!(cluster.close_scan(handle).await.is_err());
        assert_eq!(cluster.stats().active_scans, 0);
    }
}
