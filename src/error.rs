use std::time::Duration;

/// Error returned by table, scanner and dispatcher operations.
///
/// The type is `Clone` so that the failure of one destination group in a
/// batched lookup can be reported on every row routed to it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// No destination could be resolved for the row.
    #[error("routing error: {0}")]
    Routing(String),
    /// The destination did not answer within the deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// The destination rejected the request.
    #[error("remote error from {server}: {message}")]
    Remote {
        /// Server that produced the error.
        server: String,
        /// Error message reported by the server.
        message: String,
    },
    /// Malformed or incomplete response data.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The caller supplied an unusable request.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A configuration value is present but cannot be parsed.
    #[error("invalid configuration value for {key}: {value:?}")]
    InvalidConfig {
        /// Configuration key.
        key: String,
        /// Raw value that failed to parse.
        value: String,
    },
    /// The table, scanner or client was already closed.
    #[error("{0} is closed")]
    Closed(&'static str),
}

impl ClientError {
    /// Whether a caller may reasonably retry the same operation.
    pub fn is_retriable(&self) -> bool {
        matches!(self, ClientError::Timeout(_) | ClientError::Remote { .. })
    }

    pub(crate) fn remote(server: impl Into<String>, message: impl Into<String>) -> Self {
        ClientError::Remote {
            server: server.into(),
            message: message.into(),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            ClientError::Routing(_) => "routing",
            ClientError::Timeout(_) => "timeout",
            ClientError::Remote { .. } => "remote",
            ClientError::Protocol(_) => "protocol",
            ClientError::InvalidArgument(_) => "invalid_argument",
            ClientError::InvalidConfig { .. } => "invalid_config",
            ClientError::Closed(_) => "closed",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ClientError;

    #[test]
    fn retriable_kinds() {
        assert!(ClientError::Timeout(Duration::from_millis(5)).is_retriable());
        assert!(ClientError::remote("server-0", "busy").is_retriable());
        assert!(!ClientError::Routing("no region".into()).is_retriable());
        assert!(!ClientError::Protocol("truncated".into()).is_retriable());
        assert!(!ClientError::Closed("table").is_retriable());
    }

    #[test]
    fn display_includes_server() {
        let err = ClientError::remote("server-1", "region moved");
        assert_eq!(err.to_string(), "remote error from server-1: region moved");
    }
}
