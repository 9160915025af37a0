//! Prometheus counters fed by Kafka client hooks.
//!
//! [`BrokerMetrics`] owns nine counter families, all labeled by `node_id`:
//!
//! ```text
//! {ns}_connects_total{node_id}
//! {ns}_connect_errors_total{node_id}
//! {ns}_disconnects_total{node_id}
//! {ns}_write_errors_total{node_id}
//! {ns}_write_bytes_total{node_id}
//! {ns}_read_errors_total{node_id}
//! {ns}_read_bytes_total{node_id}
//! {ns}_produce_bytes_total{node_id,topic}
//! {ns}_fetch_bytes_total{node_id,topic}
//! ```
//!
//! Each hook derives its labels and performs exactly one increment. Label
//! tuples are created on first use and live as long as the registry.
//! Seed brokers show up with their negative ids (starting at `i32::MIN`).
//!
//! # Registration
//!
//! Registration failures are returned to the caller. Two aggregators with
//! the same namespace cannot share a registry.

use std::time::Duration;

use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, Opts, Registry};
use tracing::{debug, warn};

use crate::config::{HandlerOptions, MetricsConfig};
use crate::constants::{
    CONNECT_ERRORS_TOTAL, CONNECTS_TOTAL, DISCONNECTS_TOTAL, FAMILY_COUNT, FETCH_BYTES_TOTAL,
    NODE_LABELS, NODE_TOPIC_LABELS, PRODUCE_BYTES_TOTAL, READ_BYTES_TOTAL, READ_ERRORS_TOTAL,
    WRITE_BYTES_TOTAL, WRITE_ERRORS_TOTAL,
};
use crate::error::Result;
use crate::hooks::{
    BrokerHooks, HookBrokerConnect, HookBrokerDisconnect, HookBrokerRead, HookBrokerWrite,
    HookError, HookFetchBatchRead, HookProduceBatchWritten,
};
use crate::labels::{node_label, topic_label};
use crate::scrape::{ScrapeHandler, encode_text};
use crate::types::{ApiKey, BrokerMetadata, FetchBatchMetrics, ProduceBatchMetrics, Transport};

const _: fn() = || {
    fn assert_hooks<T: BrokerHooks>() {}
    assert_hooks::<BrokerMetrics>();
};

/// The counter families owned by [`BrokerMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Connects,
    ConnectErrors,
    Disconnects,
    WriteErrors,
    WriteBytes,
    ReadErrors,
    ReadBytes,
    ProduceBytes,
    FetchBytes,
}

impl Family {
    pub const ALL: [Family; FAMILY_COUNT] = [
        Family::Connects,
        Family::ConnectErrors,
        Family::Disconnects,
        Family::WriteErrors,
        Family::WriteBytes,
        Family::ReadErrors,
        Family::ReadBytes,
        Family::ProduceBytes,
        Family::FetchBytes,
    ];

    /// Metric name without the namespace.
    pub fn name(&self) -> &'static str {
        match self {
            Family::Connects => CONNECTS_TOTAL,
            Family::ConnectErrors => CONNECT_ERRORS_TOTAL,
            Family::Disconnects => DISCONNECTS_TOTAL,
            Family::WriteErrors => WRITE_ERRORS_TOTAL,
            Family::WriteBytes => WRITE_BYTES_TOTAL,
            Family::ReadErrors => READ_ERRORS_TOTAL,
            Family::ReadBytes => READ_BYTES_TOTAL,
            Family::ProduceBytes => PRODUCE_BYTES_TOTAL,
            Family::FetchBytes => FETCH_BYTES_TOTAL,
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            Family::Connects => "Total number of connections opened, by broker",
            Family::ConnectErrors => "Total number of connection errors, by broker",
            Family::Disconnects => "Total number of connections closed, by broker",
            Family::WriteErrors => "Total number of write errors, by broker",
            Family::WriteBytes => "Total number of bytes written, by broker",
            Family::ReadErrors => "Total number of read errors, by broker",
            Family::ReadBytes => "Total number of bytes read, by broker",
            Family::ProduceBytes => {
                "Total number of uncompressed bytes produced, by broker and topic"
            }
            Family::FetchBytes => "Total number of uncompressed bytes fetched, by broker and topic",
        }
    }

    /// Label names, in the order label values are passed.
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            Family::ProduceBytes | Family::FetchBytes => NODE_TOPIC_LABELS,
            _ => NODE_LABELS,
        }
    }

    /// Fully-qualified metric name under `namespace`.
    pub fn fq_name(&self, namespace: &str) -> String {
        if namespace.is_empty() {
            self.name().to_string()
        } else {
            format!("{}_{}", namespace, self.name())
        }
    }
}

/// Kafka client hook metrics.
///
/// Install it as the client's hooks; every method is safe to call from any
/// number of threads at once. Increments on the same label tuple are atomic,
/// increments on different tuples are independent.
#[derive(Clone)]
pub struct BrokerMetrics {
    namespace: String,
    registry: Registry,
    handler: ScrapeHandler,

    connects: CounterVec,
    connect_errors: CounterVec,
    disconnects: CounterVec,

    write_errors: CounterVec,
    write_bytes: CounterVec,

    read_errors: CounterVec,
    read_bytes: CounterVec,

    produce_bytes: CounterVec,
    fetch_bytes: CounterVec,
}

impl std::fmt::Debug for BrokerMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerMetrics")
            .field("namespace", &self.namespace)
            .field("handler", self.handler.options())
            .finish_non_exhaustive()
    }
}

impl BrokerMetrics {
    /// Create metrics in a new private registry under `namespace`.
    pub fn new(namespace: &str) -> Result<Self> {
        Self::with_config(namespace, MetricsConfig::default())
    }

    /// Create metrics with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metric`](crate::error::Error::Metric) if `namespace`
    /// produces invalid metric names, or if any family (or the process
    /// collector) is already registered in the supplied registry.
    pub fn with_config(namespace: &str, config: MetricsConfig) -> Result<Self> {
        let MetricsConfig {
            registry,
            process_collector,
            handler,
        } = config;
        let registry = registry.unwrap_or_else(Registry::new);
        let family = |f: Family| new_counter_vec(namespace, f);

        let metrics = Self {
            namespace: namespace.to_string(),
            handler: ScrapeHandler::new(registry.clone(), handler),

            connects: family(Family::Connects)?,
            connect_errors: family(Family::ConnectErrors)?,
            disconnects: family(Family::Disconnects)?,

            write_errors: family(Family::WriteErrors)?,
            write_bytes: family(Family::WriteBytes)?,

            read_errors: family(Family::ReadErrors)?,
            read_bytes: family(Family::ReadBytes)?,

            produce_bytes: family(Family::ProduceBytes)?,
            fetch_bytes: family(Family::FetchBytes)?,

            registry,
        };

        metrics.register_families()?;
        if process_collector {
            if let Err(e) = register_process_collector(&metrics.registry) {
                metrics.unregister_families(FAMILY_COUNT);
                return Err(e);
            }
        }

        debug!(
            namespace,
            families = FAMILY_COUNT,
            process_collector,
            "Registered broker hook metrics"
        );

        Ok(metrics)
    }

    /// Register every family, in [`Family::ALL`] order.
    ///
    /// On failure the families registered so far are removed again, so the
    /// registry is left as it was found.
    fn register_families(&self) -> Result<()> {
        for (registered, family) in Family::ALL.into_iter().enumerate() {
            if let Err(e) = self.registry.register(Box::new(self.counter(family).clone())) {
                self.unregister_families(registered);
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Remove the first `count` families of [`Family::ALL`] from the registry.
    fn unregister_families(&self, count: usize) {
        for family in &Family::ALL[..count] {
            if let Err(e) = self.registry.unregister(Box::new(self.counter(*family).clone())) {
                warn!(family = family.name(), error = %e, "Failed to unregister family");
            }
        }
    }

    /// Namespace every family name is prefixed with.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The registry the families were added to.
    ///
    /// Useful for registering additional metrics next to these ones.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Scrape handler serving every family in [`registry`](Self::registry).
    pub fn handler(&self) -> ScrapeHandler {
        self.handler.clone()
    }

    /// Options the scrape handler was built with.
    pub fn handler_options(&self) -> &HandlerOptions {
        self.handler.options()
    }

    /// Underlying counter vector for a family.
    pub fn counter(&self, family: Family) -> &CounterVec {
        match family {
            Family::Connects => &self.connects,
            Family::ConnectErrors => &self.connect_errors,
            Family::Disconnects => &self.disconnects,
            Family::WriteErrors => &self.write_errors,
            Family::WriteBytes => &self.write_bytes,
            Family::ReadErrors => &self.read_errors,
            Family::ReadBytes => &self.read_bytes,
            Family::ProduceBytes => &self.produce_bytes,
            Family::FetchBytes => &self.fetch_bytes,
        }
    }

    /// Gather all families in the registry.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Encode the registry in Prometheus text format.
    pub fn encode_text(&self) -> Result<String> {
        encode_text(&self.registry)
    }

    /// Current value of one series, `None` if it has never been touched.
    ///
    /// `label_values` follow [`Family::labels`] order. This reads a gathered
    /// snapshot and never creates the series.
    pub fn sample(&self, family: Family, label_values: &[&str]) -> Option<f64> {
        let name = family.fq_name(&self.namespace);
        let names = family.labels();
        if names.len() != label_values.len() {
            return None;
        }

        self.gather()
            .iter()
            .find(|mf| mf.get_name() == name)?
            .get_metric()
            .iter()
            .find(|m| {
                names.iter().zip(label_values).all(|(n, v)| {
                    m.get_label()
                        .iter()
                        .any(|lp| lp.get_name() == *n && lp.get_value() == *v)
                })
            })
            .map(|m| m.get_counter().get_value())
    }
}

fn new_counter_vec(namespace: &str, family: Family) -> Result<CounterVec> {
    let opts = Opts::new(family.name(), family.help()).namespace(namespace);
    Ok(CounterVec::new(opts, family.labels())?)
}

#[cfg(all(feature = "process", target_os = "linux"))]
fn register_process_collector(registry: &Registry) -> Result<()> {
    use prometheus::process_collector::ProcessCollector;

    registry.register(Box::new(ProcessCollector::for_self()))?;
    Ok(())
}

#[cfg(not(all(feature = "process", target_os = "linux")))]
fn register_process_collector(_registry: &Registry) -> Result<()> {
    warn!("Process collector requested but unavailable on this build, skipping");
    Ok(())
}

impl HookBrokerConnect for BrokerMetrics {
    fn on_broker_connect(
        &self,
        meta: &BrokerMetadata,
        _dial_time: Duration,
        _conn: Option<&Transport>,
        err: Option<&HookError>,
    ) {
        let node = node_label(meta.node_id);
        if err.is_some() {
            self.connect_errors.with_label_values(&[node.as_str()]).inc();
            return;
        }
        self.connects.with_label_values(&[node.as_str()]).inc();
    }
}

impl HookBrokerDisconnect for BrokerMetrics {
    fn on_broker_disconnect(&self, meta: &BrokerMetadata, _conn: &Transport) {
        let node = node_label(meta.node_id);
        self.disconnects.with_label_values(&[node.as_str()]).inc();
    }
}

impl HookBrokerWrite for BrokerMetrics {
    fn on_broker_write(
        &self,
        meta: &BrokerMetadata,
        _key: ApiKey,
        bytes_written: usize,
        _write_wait: Duration,
        _time_to_write: Duration,
        err: Option<&HookError>,
    ) {
        let node = node_label(meta.node_id);
        // Partial bytes on a failed write are not counted.
        if err.is_some() {
            self.write_errors.with_label_values(&[node.as_str()]).inc();
            return;
        }
        self.write_bytes
            .with_label_values(&[node.as_str()])
            .inc_by(bytes_written as f64);
    }
}

impl HookBrokerRead for BrokerMetrics {
    fn on_broker_read(
        &self,
        meta: &BrokerMetadata,
        _key: ApiKey,
        bytes_read: usize,
        _read_wait: Duration,
        _time_to_read: Duration,
        err: Option<&HookError>,
    ) {
        let node = node_label(meta.node_id);
        if err.is_some() {
            self.read_errors.with_label_values(&[node.as_str()]).inc();
            return;
        }
        self.read_bytes
            .with_label_values(&[node.as_str()])
            .inc_by(bytes_read as f64);
    }
}

impl HookProduceBatchWritten for BrokerMetrics {
    fn on_produce_batch_written(
        &self,
        meta: &BrokerMetadata,
        topic: &str,
        _partition: i32,
        metrics: ProduceBatchMetrics,
    ) {
        let node = node_label(meta.node_id);
        self.produce_bytes
            .with_label_values(&[node.as_str(), topic_label(topic)])
            .inc_by(metrics.uncompressed_bytes as f64);
    }
}

impl HookFetchBatchRead for BrokerMetrics {
    fn on_fetch_batch_read(
        &self,
        meta: &BrokerMetadata,
        topic: &str,
        _partition: i32,
        metrics: FetchBatchMetrics,
    ) {
        let node = node_label(meta.node_id);
        self.fetch_bytes
            .with_label_values(&[node.as_str(), topic_label(topic)])
            .inc_by(metrics.uncompressed_bytes as f64);
    }
}
