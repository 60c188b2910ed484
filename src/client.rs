use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::{
    config::{ClientOptions, Configuration},
    dispatch::RequestDispatcher,
    error::ClientError,
    metrics::{ClientMetrics, ClientMetricsSnapshot},
    observability::log_info,
    table::{Table, TableName},
};

/// State shared by a client and every table it hands out.
pub(crate) struct ClientShared {
    pub(crate) dispatcher: Arc<dyn RequestDispatcher>,
    pub(crate) conf: Arc<Configuration>,
    pub(crate) options: ClientOptions,
    pub(crate) metrics: ClientMetrics,
    closed: AtomicBool,
}

impl ClientShared {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Owner of a configuration and a dispatcher.
///
/// Tables obtained from a client share its dispatcher. Closing the client
/// makes every one of its tables refuse new work.
pub struct Client {
    shared: Arc<ClientShared>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.shared.options)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Client {
    /// Build a client. Fails if a well-known configuration key holds a value
    /// that cannot be parsed.
    pub fn new(
        conf: Configuration,
        dispatcher: Arc<dyn RequestDispatcher>,
    ) -> Result<Self, ClientError> {
        let options = ClientOptions::from_conf(&conf)?;
        log_info!(
            component = "client",
            event = "client_created",
            operation_timeout_ms = options.operation_timeout.as_millis() as u64,
            scanner_caching = options.scanner_caching,
        );
        Ok(Self {
            shared: Arc::new(ClientShared {
                dispatcher,
                conf: Arc::new(conf),
                options,
                metrics: ClientMetrics::default(),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Open a handle on `name` (`table` or `namespace:table`).
    pub fn table(&self, name: &str) -> Result<Table, ClientError> {
        self.table_with_name(name.parse()?)
    }

    pub fn table_with_name(&self, name: TableName) -> Result<Table, ClientError> {
        if self.is_closed() {
            return Err(ClientError::Closed("client"));
        }
        Ok(Table::new(name, Arc::clone(&self.shared)))
    }

    pub fn configuration(&self) -> &Configuration {
        &self.shared.conf
    }

    pub fn metrics(&self) -> ClientMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Stop handing out tables and fail new operations on existing ones.
    /// Calling it again does nothing.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        log_info!(component = "client", event = "client_closed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::Client;
    use crate::{
        config::{Configuration, SCANNER_CACHING_KEY},
        dispatch::memory::InMemoryCluster,
        error::ClientError,
        get::Get,
    };

    #[tokio::test]
    async fn closing_client_closes_tables() {
        let cluster = Arc::new(InMemoryCluster::new());
        cluster.create_table(&"t".parse().unwrap(), &[], 1);
        let client = Client::new(Configuration::new(), cluster).unwrap();
        let table = client.table("t").unwrap();
        assert!(table.get(Get::new("a")).await.unwrap().is_none());

        client.close();
        client.close();
        assert!(client.is_closed());
        assert!(table.is_closed());
        assert_eq!(
            table.get(Get::new("a")).await,
            Err(ClientError::Closed("client"))
        );
        assert_eq!(client.table("t").unwrap_err(), ClientError::Closed("client"));
    }

    #[test]
    fn bad_configuration_is_rejected() {
        let conf = Configuration::new().set(SCANNER_CACHING_KEY, "lots");
        let err = Client::new(conf, Arc::new(InMemoryCluster::new())).unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfig { .. }));
    }

    #[test]
    fn configuration_is_readable() {
        let conf = Configuration::new().set("regionkv.quorum", "localhost:2181");
        let client = Client::new(conf, Arc::new(InMemoryCluster::new())).unwrap();
        assert_eq!(
            client.configuration().get("regionkv.quorum"),
            Some("localhost:2181")
        );
        assert!(client.table("bad name").is_err());
    }
}
