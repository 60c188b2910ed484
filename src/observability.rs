//! Structured logging for the client core.
//!
//! Events are emitted through `tracing` under the `regionkv` target, so a
//! subscriber can enable the client independently of the application
//! (`RUST_LOG=regionkv=debug`). Every event names the emitting `component`
//! (`client`, `table`, `scanner`, `batcher`) and a snake_case `event`.
//! Tables are logged by name and scanners by their ULID.
//!
//! No subscriber is installed here; that is up to the application.
//!
//! ```ignore
//! log_debug!(
//!     component = "scanner",
//!     event = "region_opened",
//!     table = %self.table.name(),
//!     region = %destination.region.name,
//! );
//! ```

/// `tracing` target shared by every client event.
pub(crate) const REGIONKV_TARGET: &str = "regionkv";

/// Emit one client event at `$level`. The level macros below are the usual
/// entry points.
macro_rules! log_event {
    ($level:expr, $($field:tt)*) => {
        ::tracing::event!(target: $crate::observability::REGIONKV_TARGET, $level, $($field)*)
    };
}

/// Lifecycle changes: clients created, tables closed.
macro_rules! log_info {
    ($($field:tt)*) => {
        $crate::observability::log_event!(::tracing::Level::INFO, $($field)*)
    };
}

/// Per-request detail: region scans opened, batches completed.
macro_rules! log_debug {
    ($($field:tt)*) => {
        $crate::observability::log_event!(::tracing::Level::DEBUG, $($field)*)
    };
}

/// Failed operations the caller also sees as an error.
macro_rules! log_warn {
    ($($field:tt)*) => {
        $crate::observability::log_event!(::tracing::Level::WARN, $($field)*)
    };
}

#[allow(unused_macros)]
macro_rules! log_error {
    ($($field:tt)*) => {
        $crate::observability::log_event!(::tracing::Level::ERROR, $($field)*)
    };
}

pub(crate) use log_debug;
#[allow(unused_imports)]
pub(crate) use log_error;
pub(crate) use log_event;
pub(crate) use log_info;
pub(crate) use log_warn;
