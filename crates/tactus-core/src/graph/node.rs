//! Graph node types.
//!
//! Each node in the processing graph has a [`NodeId`] and a [`Node`] payload
//! describing it. The `NodeData` struct bundles the payload with internal
//! bookkeeping (adjacency lists in connection insertion order).

use super::connection::ConnectionId;

/// Unique identifier for a node in the processing graph.
///
/// Node IDs are assigned sequentially and never reused within a graph instance.
/// They remain stable across graph mutations and order recomputations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// A processing unit as seen by the scheduler.
///
/// The scheduler only orders nodes; what a node computes belongs to whoever
/// walks the [`ProcessingOrder`](super::ProcessingOrder). Disabled nodes keep
/// their place in the order and are skipped by
/// [`ProcessingOrder::enabled`](super::ProcessingOrder::enabled).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    /// Human-readable name, used in logs and reports.
    pub label: String,
    /// Whether the render pass should run this node.
    pub enabled: bool,
}

impl Node {
    /// Creates an enabled node.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: true,
        }
    }

    /// Sets the enabled flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Internal bookkeeping for a node in the graph.
pub(crate) struct NodeData {
    pub node: Node,
    /// Connections arriving at this node, oldest first.
    pub incoming: Vec<ConnectionId>,
    /// Connections leaving this node, oldest first.
    pub outgoing: Vec<ConnectionId>,
}

impl NodeData {
    pub fn new(node: Node) -> Self {
        Self {
            node,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }
}
