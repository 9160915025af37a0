//! Callback contracts a Kafka client invokes as events happen.
//!
//! Each trait covers one event kind. A client keeps whichever hooks it was
//! given and calls them synchronously, on the task or thread that observed
//! the event. Hooks must not block and cannot fail: there is no return value
//! for the client to check.
//!
//! Types implementing all six traits get [`BrokerHooks`] for free, which is
//! what a client stores when it wants the full set behind one pointer:
//!
//! ```rust
//! use std::sync::Arc;
//! use kmetrics::hooks::BrokerHooks;
//! use kmetrics::metrics::BrokerMetrics;
//!
//! let metrics = BrokerMetrics::new("kafka").unwrap();
//! let hooks: Arc<dyn BrokerHooks> = Arc::new(metrics);
//! # let _ = hooks;
//! ```

use std::time::Duration;

use crate::types::{ApiKey, BrokerMetadata, FetchBatchMetrics, ProduceBatchMetrics, Transport};

/// Error reported by the client alongside a failed event.
pub type HookError = dyn std::error::Error + Send + Sync + 'static;

/// Called after every connection attempt to a broker.
pub trait HookBrokerConnect: Send + Sync {
    /// `err` is set if the dial failed, in which case `conn` is `None`.
    fn on_broker_connect(
        &self,
        meta: &BrokerMetadata,
        dial_time: Duration,
        conn: Option<&Transport>,
        err: Option<&HookError>,
    );
}

/// Called when a broker connection is closed.
pub trait HookBrokerDisconnect: Send + Sync {
    fn on_broker_disconnect(&self, meta: &BrokerMetadata, conn: &Transport);
}

/// Called after every request write to a broker.
pub trait HookBrokerWrite: Send + Sync {
    /// `bytes_written` may be non-zero even when `err` is set (partial write).
    fn on_broker_write(
        &self,
        meta: &BrokerMetadata,
        key: ApiKey,
        bytes_written: usize,
        write_wait: Duration,
        time_to_write: Duration,
        err: Option<&HookError>,
    );
}

/// Called after every response read from a broker.
pub trait HookBrokerRead: Send + Sync {
    /// `bytes_read` may be non-zero even when `err` is set (partial read).
    fn on_broker_read(
        &self,
        meta: &BrokerMetadata,
        key: ApiKey,
        bytes_read: usize,
        read_wait: Duration,
        time_to_read: Duration,
        err: Option<&HookError>,
    );
}

/// Called once per record batch successfully written to a partition.
pub trait HookProduceBatchWritten: Send + Sync {
    fn on_produce_batch_written(
        &self,
        meta: &BrokerMetadata,
        topic: &str,
        partition: i32,
        metrics: ProduceBatchMetrics,
    );
}

/// Called once per record batch read from a partition.
pub trait HookFetchBatchRead: Send + Sync {
    fn on_fetch_batch_read(
        &self,
        meta: &BrokerMetadata,
        topic: &str,
        partition: i32,
        metrics: FetchBatchMetrics,
    );
}

/// The full set of broker and batch hooks.
pub trait BrokerHooks:
    HookBrokerConnect
    + HookBrokerDisconnect
    + HookBrokerWrite
    + HookBrokerRead
    + HookProduceBatchWritten
    + HookFetchBatchRead
{
}

impl<T> BrokerHooks for T where
    T: HookBrokerConnect
        + HookBrokerDisconnect
        + HookBrokerWrite
        + HookBrokerRead
        + HookProduceBatchWritten
        + HookFetchBatchRead
{
}
