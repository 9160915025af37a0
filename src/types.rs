//! Event metadata supplied by the Kafka client on every hook call.
//!
//! These types describe what the client knows at the moment an event
//! fires: which broker it was talking to, what kind of request was on the
//! wire and, for record batches, how large the batch was.

use std::fmt;
use std::net::SocketAddr;

/// A broker node id as seen by the client.
///
/// Real broker ids are non-negative. Seed (bootstrap) brokers are dialed
/// before cluster metadata is known, so the client numbers them from
/// [`NodeId::SEED_BASE`] upwards to keep them clear of real ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId(pub i32);

impl NodeId {
    /// First id handed out to seed brokers.
    pub const SEED_BASE: Self = NodeId(i32::MIN);

    /// Create a new node id from a raw value.
    #[inline]
    pub const fn new(value: i32) -> Self {
        NodeId(value)
    }

    /// Id of the `index`-th seed broker.
    ///
    /// Saturates at `-1` so a seed id can never collide with a real broker.
    #[inline]
    pub const fn seed(index: u32) -> Self {
        let max = (i32::MAX as u32) + 1;
        let offset = if index < max { index } else { max - 1 };
        NodeId(i32::MIN + offset as i32)
    }

    /// Get the raw i32 value.
    #[inline]
    pub const fn value(self) -> i32 {
        self.0
    }

    /// Check if this id belongs to the seed range.
    #[inline]
    pub const fn is_seed(self) -> bool {
        self.0 < 0
    }
}

impl From<i32> for NodeId {
    fn from(value: i32) -> Self {
        NodeId(value)
    }
}

impl From<NodeId> for i32 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Broker the event happened against.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BrokerMetadata {
    pub node_id: NodeId,
    pub host: String,
    pub port: u16,
    pub rack: Option<String>,
}

impl BrokerMetadata {
    pub fn new(node_id: impl Into<NodeId>, host: impl Into<String>, port: u16) -> Self {
        Self {
            node_id: node_id.into(),
            host: host.into(),
            port,
            rack: None,
        }
    }

    /// Metadata for the `index`-th seed broker.
    pub fn seed(index: u32, host: impl Into<String>, port: u16) -> Self {
        Self::new(NodeId::seed(index), host, port)
    }

    pub fn with_rack(mut self, rack: impl Into<String>) -> Self {
        self.rack = Some(rack.into());
        self
    }
}

/// Kafka request type code carried by broker read/write events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiKey {
    Produce,
    Fetch,
    ListOffsets,
    Metadata,
    OffsetCommit,
    OffsetFetch,
    FindCoordinator,
    JoinGroup,
    Heartbeat,
    LeaveGroup,
    SyncGroup,
    SaslHandshake,
    ApiVersions,
    InitProducerId,
    SaslAuthenticate,
    Unknown(i16),
}

impl ApiKey {
    /// Raw wire value.
    pub fn as_i16(self) -> i16 {
        self.into()
    }
}

impl From<i16> for ApiKey {
    fn from(value: i16) -> Self {
        match value {
            0 => ApiKey::Produce,
            1 => ApiKey::Fetch,
            2 => ApiKey::ListOffsets,
            3 => ApiKey::Metadata,
            8 => ApiKey::OffsetCommit,
            9 => ApiKey::OffsetFetch,
            10 => ApiKey::FindCoordinator,
            11 => ApiKey::JoinGroup,
            12 => ApiKey::Heartbeat,
            13 => ApiKey::LeaveGroup,
            14 => ApiKey::SyncGroup,
            17 => ApiKey::SaslHandshake,
            18 => ApiKey::ApiVersions,
            22 => ApiKey::InitProducerId,
            36 => ApiKey::SaslAuthenticate,
            n => ApiKey::Unknown(n),
        }
    }
}

impl From<ApiKey> for i16 {
    fn from(key: ApiKey) -> Self {
        match key {
            ApiKey::Produce => 0,
            ApiKey::Fetch => 1,
            ApiKey::ListOffsets => 2,
            ApiKey::Metadata => 3,
            ApiKey::OffsetCommit => 8,
            ApiKey::OffsetFetch => 9,
            ApiKey::FindCoordinator => 10,
            ApiKey::JoinGroup => 11,
            ApiKey::Heartbeat => 12,
            ApiKey::LeaveGroup => 13,
            ApiKey::SyncGroup => 14,
            ApiKey::SaslHandshake => 17,
            ApiKey::ApiVersions => 18,
            ApiKey::InitProducerId => 22,
            ApiKey::SaslAuthenticate => 36,
            ApiKey::Unknown(n) => n,
        }
    }
}

/// Handle on the connection an event refers to.
///
/// Only addresses are exposed; the socket itself stays with the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transport {
    pub local_addr: Option<SocketAddr>,
    pub peer_addr: Option<SocketAddr>,
}

impl Transport {
    pub fn new(local_addr: SocketAddr, peer_addr: SocketAddr) -> Self {
        Self {
            local_addr: Some(local_addr),
            peer_addr: Some(peer_addr),
        }
    }
}

/// Compression codec of a record batch, from the low three attribute bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionCodec {
    #[default]
    None,
    Gzip,
    Snappy,
    Lz4,
    Zstd,
}

impl CompressionCodec {
    /// Decode from record batch attributes. Unknown codecs map to `None`.
    pub fn from_attributes(attributes: i16) -> Self {
        match attributes & 0x07 {
            1 => CompressionCodec::Gzip,
            2 => CompressionCodec::Snappy,
            3 => CompressionCodec::Lz4,
            4 => CompressionCodec::Zstd,
            _ => CompressionCodec::None,
        }
    }
}

/// Sizes of a record batch the client wrote to a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProduceBatchMetrics {
    pub num_records: u64,
    /// Batch size before compression, including record overhead.
    pub uncompressed_bytes: u64,
    /// Batch size on the wire.
    pub compressed_bytes: u64,
    pub codec: CompressionCodec,
}

/// Sizes of a record batch the client read from a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchBatchMetrics {
    pub num_records: u64,
    /// Batch size after decompression, including record overhead.
    pub uncompressed_bytes: u64,
    /// Batch size on the wire.
    pub compressed_bytes: u64,
    pub codec: CompressionCodec,
}

impl ProduceBatchMetrics {
    pub fn uncompressed(num_records: u64, uncompressed_bytes: u64) -> Self {
        Self {
            num_records,
            uncompressed_bytes,
            compressed_bytes: uncompressed_bytes,
            codec: CompressionCodec::None,
        }
    }
}

impl FetchBatchMetrics {
    pub fn uncompressed(num_records: u64, uncompressed_bytes: u64) -> Self {
        Self {
            num_records,
            uncompressed_bytes,
            compressed_bytes: uncompressed_bytes,
            codec: CompressionCodec::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_new_and_value() {
        assert_eq!(NodeId::new(7).value(), 7);
        assert_eq!(i32::from(NodeId::from(3)), 3);
    }

    #[test]
    fn test_seed_ids() {
        assert_eq!(NodeId::SEED_BASE.value(), i32::MIN);
        assert_eq!(NodeId::seed(0), NodeId::SEED_BASE);
        assert_eq!(NodeId::seed(2).value(), i32::MIN + 2);
        assert_eq!(NodeId::seed(u32::MAX).value(), -1);
        assert!(NodeId::seed(0).is_seed());
        assert!(NodeId::seed(u32::MAX).is_seed());
        assert!(!NodeId::new(0).is_seed());
    }

    #[test]
    fn test_node_id_display_keeps_sign() {
        assert_eq!(NodeId::new(1).to_string(), "1");
        assert_eq!(NodeId::SEED_BASE.to_string(), "-2147483648");
    }

    #[test]
    fn test_broker_metadata_builders() {
        let meta = BrokerMetadata::new(3, "kafka-3", 9092).with_rack("use1-az1");
        assert_eq!(meta.node_id, NodeId(3));
        assert_eq!(meta.rack.as_deref(), Some("use1-az1"));

        let seed = BrokerMetadata::seed(1, "bootstrap", 9092);
        assert!(seed.node_id.is_seed());
        assert_eq!(seed.node_id.value(), i32::MIN + 1);
    }

    #[test]
    fn test_api_key_conversions() {
        assert_eq!(ApiKey::from(0), ApiKey::Produce);
        assert_eq!(ApiKey::from(18), ApiKey::ApiVersions);
        assert_eq!(ApiKey::from(999), ApiKey::Unknown(999));
        assert_eq!(ApiKey::Fetch.as_i16(), 1);
        assert_eq!(ApiKey::Unknown(-5).as_i16(), -5);
    }

    #[test]
    fn test_compression_codec_from_attributes() {
        assert_eq!(CompressionCodec::from_attributes(0), CompressionCodec::None);
        assert_eq!(CompressionCodec::from_attributes(1), CompressionCodec::Gzip);
        assert_eq!(CompressionCodec::from_attributes(4), CompressionCodec::Zstd);
        // Higher attribute bits (timestamp type, transactional) are ignored.
        assert_eq!(
            CompressionCodec::from_attributes(0x0010 | 3),
            CompressionCodec::Lz4
        );
        assert_eq!(CompressionCodec::from_attributes(6), CompressionCodec::None);
    }
}
