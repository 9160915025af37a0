//! Label values derived from event metadata.
//!
//! Node ids are rendered as plain signed decimals, so seed brokers show up
//! as e.g. `node_id="-2147483648"` with no extra mapping. Topic names are
//! used verbatim, an empty topic is a legal label value.

use crate::types::NodeId;

/// Label value for a broker node id.
#[inline]
pub fn node_label(node: NodeId) -> String {
    node.value().to_string()
}

/// Label value for a topic name.
#[inline]
pub fn topic_label(topic: &str) -> &str {
    topic
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_label() {
        assert_eq!(node_label(NodeId(0)), "0");
        assert_eq!(node_label(NodeId(42)), "42");
        assert_eq!(node_label(NodeId(i32::MAX)), "2147483647");
    }

    #[test]
    fn test_seed_node_label() {
        assert_eq!(node_label(NodeId::SEED_BASE), "-2147483648");
        assert_eq!(node_label(NodeId::seed(1)), "-2147483647");
    }

    #[test]
    fn test_topic_label_is_verbatim() {
        assert_eq!(topic_label("orders"), "orders");
        assert_eq!(topic_label(""), "");
        assert_eq!(topic_label("ünïcode.topic-1"), "ünïcode.topic-1");
    }
}
