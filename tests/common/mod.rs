//! Common helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use regionkv::{
    config::{Configuration, OPERATION_TIMEOUT_KEY},
    Client, InMemoryCluster, Table, TableName,
};

pub const TABLE: &str = "t";

pub fn row(i: usize) -> String {
    format!("row_{i}")
}

/// Cluster with table `t` split at `splits` over three servers, holding
/// `row_0..row_{rows-1}` with `f:q = <row key>`.
pub fn cluster_with_rows(rows: usize, splits: &[&str]) -> Arc<InMemoryCluster> {
    let cluster = Arc::new(InMemoryCluster::new());
    let name: TableName = TABLE.parse().expect("table name");
    cluster.create_table(&name, splits, 3);
    for i in 0..rows {
        let key = row(i);
        cluster.load(&name, &key, "f", "q", &key);
    }
    cluster
}

pub fn client(cluster: &Arc<InMemoryCluster>) -> Client {
    client_with(cluster, Configuration::new())
}

pub fn client_with(cluster: &Arc<InMemoryCluster>, conf: Configuration) -> Client {
    Client::new(conf, cluster.clone()).expect("client")
}

pub fn client_with_timeout_ms(cluster: &Arc<InMemoryCluster>, ms: i64) -> Client {
    client_with(cluster, Configuration::new().set_int(OPERATION_TIMEOUT_KEY, ms))
}

pub fn table(client: &Client) -> Table {
    client.table(TABLE).expect("table")
}
