//! # kmetrics
//! Prometheus counters for a Kafka client, driven by the client's hooks.
//!
//! Install a [`BrokerMetrics`](metrics::BrokerMetrics) as the client's hooks
//! and it keeps the following counters, all labeled by broker `node_id`:
//!
//! ```text
//! {ns}_connects_total{node_id="..."}
//! {ns}_connect_errors_total{node_id="..."}
//! {ns}_disconnects_total{node_id="..."}
//! {ns}_write_errors_total{node_id="..."}
//! {ns}_write_bytes_total{node_id="..."}
//! {ns}_read_errors_total{node_id="..."}
//! {ns}_read_bytes_total{node_id="..."}
//! {ns}_produce_bytes_total{node_id="...",topic="..."}
//! {ns}_fetch_bytes_total{node_id="...",topic="..."}
//! ```
//!
//! Seed brokers use node ids starting at `i32::MIN` and appear with those
//! negative ids.
//!
//! ## Getting started
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use kmetrics::prelude::*;
//!
//! # fn main() -> kmetrics::error::Result<()> {
//! let metrics = Arc::new(BrokerMetrics::new("kafka")?);
//!
//! // Hand `metrics.clone()` to the client as its hooks. It calls them like so:
//! let broker = BrokerMetadata::new(1, "kafka-1", 9092);
//! metrics.on_broker_connect(&broker, Duration::from_millis(4), None, None);
//! metrics.on_broker_write(&broker, ApiKey::Produce, 512, Duration::ZERO, Duration::ZERO, None);
//!
//! let text = metrics.encode_text()?;
//! assert!(text.contains(r#"kafka_connects_total{node_id="1"} 1"#));
//! assert!(text.contains(r#"kafka_write_bytes_total{node_id="1"} 512"#));
//! # Ok(())
//! # }
//! ```
//!
//! Serve [`BrokerMetrics::handler`](metrics::BrokerMetrics::handler) from
//! your own HTTP stack, or use [`exporter::MetricsServer`].

#![forbid(unsafe_code)]

pub mod config;
pub mod constants;
pub mod error;
pub mod exporter;
pub mod hooks;
pub mod labels;
pub mod metrics;
pub mod scrape;
pub mod telemetry;
pub mod types;

pub mod prelude {
    //! Main exports for wiring metrics into a client.
    pub use crate::config::{ErrorHandling, HandlerOptions, MetricsConfig};
    pub use crate::error::{Error, Result};
    pub use crate::hooks::{
        BrokerHooks, HookBrokerConnect, HookBrokerDisconnect, HookBrokerRead, HookBrokerWrite,
        HookError, HookFetchBatchRead, HookProduceBatchWritten,
    };
    pub use crate::metrics::{BrokerMetrics, Family};
    pub use crate::scrape::{ScrapeHandler, ScrapeResponse};
    pub use crate::types::{
        ApiKey, BrokerMetadata, CompressionCodec, FetchBatchMetrics, NodeId, ProduceBatchMetrics,
        Transport,
    };
}
