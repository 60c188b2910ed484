//! Fan-out of independent row lookups.
//!
//! Lookups are grouped by the destination that owns them, each group goes out
//! as a single request, and all groups are in flight at once. Results are
//! scattered back to the caller's order. A failing group only fails its own
//! rows.

use std::{collections::BTreeMap, time::Duration};

use futures_util::future::join_all;

use crate::{
    assembler::assemble_row,
    dispatch::{timed, Destination, Request, RequestDispatcher, Response},
    error::ClientError,
    get::Get,
    observability::log_warn,
    result::RowResult,
    row::RowKey,
    table::TableName,
};

/// Per-row outcomes of a batched lookup.
#[derive(Debug)]
pub struct BatchOutcome {
    /// One entry per lookup, in input order.
    pub results: Vec<Result<Option<RowResult>, ClientError>>,
    /// Number of destination groups dispatched.
    pub groups: usize,
}

impl BatchOutcome {
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.is_err()).count()
    }
}

pub struct RequestBatcher<'a> {
    dispatcher: &'a dyn RequestDispatcher,
    table: &'a TableName,
    timeout: Duration,
}

struct Group {
    indices: Vec<usize>,
    rows: Vec<RowKey>,
    gets: Vec<Get>,
}

impl<'a> RequestBatcher<'a> {
    pub fn new(
        dispatcher: &'a dyn RequestDispatcher,
        table: &'a TableName,
        timeout: Duration,
    ) -> Self {
        Self {
            dispatcher,
            table,
            timeout,
        }
    }

    pub async fn execute(&self, gets: Vec<Get>) -> BatchOutcome {
        let mut slots: Vec<Option<Result<Option<RowResult>, ClientError>>> =
            (0..gets.len()).map(|_| None).collect();

        let resolved = join_all(gets.iter().map(|get| {
            timed(self.timeout, self.dispatcher.resolve(self.table, get.row()))
        }))
        .await;

        let mut groups: BTreeMap<Destination, Group> = BTreeMap::new();
        for (idx, (get, destination)) in gets.into_iter().zip(resolved).enumerate() {
            match destination {
                Ok(destination) => {
                    let group = groups.entry(destination).or_insert_with(|| Group {
                        indices: Vec::new(),
                        rows: Vec::new(),
                        gets: Vec::new(),
                    });
                    group.indices.push(idx);
                    group.rows.push(get.row().clone());
                    group.gets.push(get);
                }
                Err(err) => slots[idx] = Some(Err(err)),
            }
        }

        let group_count = groups.len();
        let responses = join_all(
            groups
                .into_iter()
                .map(|(destination, group)| self.dispatch_group(destination, group)),
        )
        .await;

        for (indices, results) in responses {
            for (idx, result) in indices.into_iter().zip(results) {
                slots[idx] = Some(result);
            }
        }

        let results = slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(ClientError::Protocol("lookup was never answered".into()))
                })
            })
            .collect();
        BatchOutcome {
            results,
            groups: group_count,
        }
    }

    async fn dispatch_group(
        &self,
        destination: Destination,
        group: Group,
    ) -> (Vec<usize>, Vec<Result<Option<RowResult>, ClientError>>) {
        let Group {
            indices,
            rows,
            gets,
        } = group;
        let request = Request::Get {
            table: self.table.clone(),
            gets,
        };
        let response = timed(self.timeout, self.dispatcher.send(&destination, request)).await;

        let results = match response {
            Ok(Response::Rows(cells)) if cells.len() == rows.len() => rows
                .iter()
                .zip(cells)
                .map(|(row, cells)| assemble_row(row, cells))
                .collect(),
            Ok(Response::Rows(cells)) => {
                let err = ClientError::Protocol(format!(
                    "{destination} returned {} rows for {} lookups",
                    cells.len(),
                    rows.len()
                ));
                vec![Err(err); rows.len()]
            }
            Ok(Response::Ack) => {
                let err =
                    ClientError::Protocol(format!("{destination} answered a get without rows"));
                vec![Err(err); rows.len()]
            }
            Err(err) => {
                log_warn!(
                    component = "batcher",
                    event = "group_failed",
                    table = %self.table,
                    destination = %destination,
                    rows = rows.len(),
                    kind = err.kind(),
                    error = %err,
                );
                vec![Err(err); rows.len()]
            }
        };
        (indices, results)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::RequestBatcher;
    use crate::{
        dispatch::memory::InMemoryCluster, error::ClientError, get::Get, table::TableName,
    };

    async fn cluster() -> (Arc<InMemoryCluster>, TableName) {
        let cluster = Arc::new(InMemoryCluster::new());
        let table: TableName = "t".parse().unwrap();
        cluster.create_table(&table, &["row_3", "row_6"], 3);
        for i in 0..9 {
            let row = format!("row_{i}");
            cluster.load(&table, &row, "f", "q", &row);
        }
        (cluster, table)
    }

    #[tokio::test]
    async fn groups_by_destination_and_keeps_order() {
        let (cluster, table) = cluster().await;
        let batcher = RequestBatcher::new(cluster.as_ref(), &table, Duration::from_secs(5));
        let keys = ["row_7", "row_0", "nope", "row_4", "row_1"];
        let outcome = batcher
            .execute(keys.iter().map(|k| Get::new(*k)).collect())
            .await;

        assert_eq!(outcome.groups, 3);
        assert_eq!(outcome.results.len(), keys.len());
        assert_eq!(cluster.stats().get_requests, 3);
        for (key, result) in keys.iter().zip(&outcome.results) {
            let found = result.as_ref().unwrap();
            if *key == "nope" {
                assert!(found.is_none());
            } else {
                assert_eq!(found.as_ref().unwrap().row().to_string(), *key);
            }
        }
    }

    #[tokio::test]
    async fn failed_group_only_fails_its_rows() {
        let (cluster, table) = cluster().await;
        cluster.set_server_down("server-1", true);
        let batcher = RequestBatcher::new(cluster.as_ref(), &table, Duration::from_secs(5));
        let outcome = batcher
            .execute(vec![Get::new("row_0"), Get::new("row_4"), Get::new("row_8")])
            .await;

        assert_eq!(outcome.failed(), 1);
        assert!(outcome.results[0].as_ref().unwrap().is_some());
        assert!(matches!(
            outcome.results[1],
            Err(ClientError::Remote { .. })
        ));
        assert!(outcome.results[2].as_ref().unwrap().is_some());
    }

    #[tokio::test]
    async fn routing_failure_is_per_row() {
        let (cluster, _) = cluster().await;
        let missing: TableName = "missing".parse().unwrap();
        let batcher = RequestBatcher::new(cluster.as_ref(), &missing, Duration::from_secs(5));
        let outcome = batcher.execute(vec![Get::new("a"), Get::new("b")]).await;
        assert_eq!(outcome.groups, 0);
        assert!(outcome
            .results
            .iter()
            .all(|r| matches!(r, Err(ClientError::Routing(_)))));
    }

    #[tokio::test]
    async fn empty_batch() {
        let (cluster, table) = cluster().await;
        let batcher = RequestBatcher::new(cluster.as_ref(), &table, Duration::from_secs(5));
        let outcome = batcher.execute(Vec::new()).await;
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.groups, 0);
    }
}
