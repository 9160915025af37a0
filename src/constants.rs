//! Centralized metric names, label names and defaults.
//!
//! Keeping the exposed surface in one place makes it easy to see exactly
//! which series a scrape can contain.
//!
//! # Categories
//!
//! - **Label Names**: the fixed label schema shared by every family
//! - **Family Names**: metric name suffixes, prefixed with the namespace
//! - **Scrape Defaults**: exposition format and handler defaults

// =============================================================================
// Label Names
// =============================================================================

/// Label carrying the broker node id, present on every family.
pub const NODE_ID_LABEL: &str = "node_id";

/// Label carrying the topic name, present on produce/fetch byte families.
pub const TOPIC_LABEL: &str = "topic";

/// Label schema for families scoped by broker only.
pub const NODE_LABELS: &[&str] = &[NODE_ID_LABEL];

/// Label schema for families scoped by broker and topic.
pub const NODE_TOPIC_LABELS: &[&str] = &[NODE_ID_LABEL, TOPIC_LABEL];

// =============================================================================
// Family Names
// =============================================================================

pub const CONNECTS_TOTAL: &str = "connects_total";
pub const CONNECT_ERRORS_TOTAL: &str = "connect_errors_total";
pub const DISCONNECTS_TOTAL: &str = "disconnects_total";
pub const WRITE_ERRORS_TOTAL: &str = "write_errors_total";
pub const WRITE_BYTES_TOTAL: &str = "write_bytes_total";
pub const READ_ERRORS_TOTAL: &str = "read_errors_total";
pub const READ_BYTES_TOTAL: &str = "read_bytes_total";
pub const PRODUCE_BYTES_TOTAL: &str = "produce_bytes_total";
pub const FETCH_BYTES_TOTAL: &str = "fetch_bytes_total";

/// Number of counter families owned by a `BrokerMetrics`.
pub const FAMILY_COUNT: usize = 9;

// =============================================================================
// Scrape Defaults
// =============================================================================

/// Content type of the Prometheus text exposition format.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Default namespace used by the environment-driven constructor.
pub const DEFAULT_NAMESPACE: &str = "kafka";

/// Default address for the standalone metrics server.
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:9308";

/// Maximum request head read by the metrics server before routing.
pub const MAX_REQUEST_HEAD_SIZE: usize = 1024;
