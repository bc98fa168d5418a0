//! Processing graph: mutation API, cycle policy, and order publication.
//!
//! [`ProcessingGraph`] owns the topology (nodes and connections) behind a
//! mutex that only control threads take. Every successful mutation recomputes
//! the rendering order and publishes it as an immutable [`ProcessingOrder`]
//! through an `ArcSwap`, so the render thread reads a complete order with a
//! single wait-free load and never sees a half-applied mutation.

use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use parking_lot::Mutex;

use super::arena::Arena;
use super::connection::{Connection, ConnectionId};
use super::node::{Node, NodeData, NodeId};
use super::order::{self, CyclePolicy, ProcessingOrder};

/// Errors returned by graph mutations.
///
/// Only control-thread operations produce these; reading the published order
/// never fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// The graph already holds `max_nodes` nodes.
    #[error("node capacity of {0} exceeded")]
    NodeCapacityExceeded(usize),
    /// The graph already holds `max_connections` connections.
    #[error("connection capacity of {0} exceeded")]
    ConnectionCapacityExceeded(usize),
    /// The specified node was not found in the graph.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    /// No connection joins the given pair of nodes.
    #[error("no connection from {from} to {to}")]
    ConnectionNotFound {
        /// Requested source node.
        from: NodeId,
        /// Requested destination node.
        to: NodeId,
    },
    /// The specified connection was not found in the graph.
    #[error("connection {0} not found")]
    ConnectionIdNotFound(ConnectionId),
    /// Adding this connection would create a cycle (only under [`CyclePolicy::RejectCycles`]).
    #[error("connection from {from} to {to} would create a cycle")]
    CycleDetected {
        /// Requested source node.
        from: NodeId,
        /// Requested destination node.
        to: NodeId,
    },
}

/// Construction-time limits and behaviour of a [`ProcessingGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphConfig {
    /// Largest number of live nodes.
    pub max_nodes: usize,
    /// Largest number of live connections.
    pub max_connections: usize,
    /// Store each entry's incoming connections in the published order.
    pub cache_connections: bool,
    /// Treatment of connections that close a cycle.
    pub cycle_policy: CyclePolicy,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_nodes: 256,
            max_connections: 1024,
            cache_connections: true,
            cycle_policy: CyclePolicy::SkipBackEdges,
        }
    }
}

/// Mutable topology. Only touched with the graph mutex held.
#[derive(Default)]
struct Topology {
    nodes: Arena<NodeId, NodeData>,
    connections: Arena<ConnectionId, Connection>,
    generation: u64,
    /// Order superseded by the last publication, dropped at the next one.
    retired: Option<Arc<ProcessingOrder>>,
}

impl Topology {
    fn node(&self, id: NodeId) -> Result<&NodeData, GraphError> {
        self.nodes.get(id).ok_or(GraphError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData, GraphError> {
        self.nodes.get_mut(id).ok_or(GraphError::NodeNotFound(id))
    }

    /// Whether `to` is reachable from `from` over existing connections.
    fn can_reach(&self, from: NodeId, to: NodeId) -> bool {
        let mut visited = vec![false; self.nodes.slot_len()];
        let mut stack = vec![from];

        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            let Some(idx) = self.nodes.slot_of(current) else {
                continue;
            };
            if visited[idx] {
                continue;
            }
            visited[idx] = true;

            if let Some(node) = self.nodes.get(current) {
                for connection_id in &node.outgoing {
                    if let Some(connection) = self.connections.get(*connection_id) {
                        stack.push(connection.destination);
                    }
                }
            }
        }
        false
    }

    fn remove_connection_internal(&mut self, id: ConnectionId) {
        let Some(connection) = self.connections.remove(id) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(connection.source) {
            node.outgoing.retain(|c| *c != id);
        }
        if let Some(node) = self.nodes.get_mut(connection.destination) {
            node.incoming.retain(|c| *c != id);
        }
    }
}

/// Directed processing graph with a published rendering order.
///
/// All methods take `&self`: share the graph between the control thread and
/// the render thread with `Arc`. Mutations serialize on an internal mutex;
/// [`processing_order`](Self::processing_order) never takes it.
///
/// Cycles are allowed by default. The ordering skips the connection that
/// closes each cycle, so a feedback loop still yields every node exactly once.
/// Construct with [`CyclePolicy::RejectCycles`] to refuse such connections
/// instead.
///
/// IDs are never reused, but storage is: removed nodes and connections free
/// their slots for later insertions, so long add/remove churn keeps memory
/// bounded by the peak live size.
///
/// # Example
///
/// ```rust
/// use tactus_core::{Connection, GraphConfig, Node, ProcessingGraph};
///
/// let graph = ProcessingGraph::new(GraphConfig::default());
/// let a = graph.add_node(Node::new("a")).unwrap();
/// let b = graph.add_node(Node::new("b")).unwrap();
/// graph.add_connection(Connection::new(a, b)).unwrap();
/// graph.add_connection(Connection::new(b, a)).unwrap();
///
/// let order = graph.processing_order();
/// assert_eq!(order.ids().collect::<Vec<_>>(), vec![a, b]);
/// assert_eq!(order.skipped_back_edges(), 1);
/// ```
pub struct ProcessingGraph {
    config: GraphConfig,
    topology: Mutex<Topology>,
    published: ArcSwap<ProcessingOrder>,
}

impl ProcessingGraph {
    /// Creates an empty graph.
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            topology: Mutex::new(Topology::default()),
            published: ArcSwap::from_pointee(ProcessingOrder::default()),
        }
    }

    /// The graph's configuration.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    // ── Node mutations ──────────────────────────────────────────────────────

    /// Adds a node. Returns its ID.
    pub fn add_node(&self, node: Node) -> Result<NodeId, GraphError> {
        let mut topology = self.topology.lock();
        if topology.nodes.len() >= self.config.max_nodes {
            return Err(GraphError::NodeCapacityExceeded(self.config.max_nodes));
        }

        #[cfg(feature = "tracing")]
        let label = node.label.clone();
        let id = topology.nodes.insert_with(|_| NodeData::new(node));
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_add: node {id} '{label}'");

        self.publish(&mut topology);
        Ok(id)
    }

    /// Removes a node and every connection touching it.
    pub fn remove_node(&self, id: NodeId) -> Result<(), GraphError> {
        let mut topology = self.topology.lock();
        let node = topology.node(id)?;

        let connection_ids: Vec<ConnectionId> = node
            .incoming
            .iter()
            .chain(node.outgoing.iter())
            .copied()
            .collect();
        for connection_id in connection_ids {
            topology.remove_connection_internal(connection_id);
        }

        topology.nodes.remove(id);
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_remove: node {id}");

        self.publish(&mut topology);
        Ok(())
    }

    /// Enables or disables a node without changing the topology.
    pub fn set_node_enabled(&self, id: NodeId, enabled: bool) -> Result<(), GraphError> {
        let mut topology = self.topology.lock();
        let node = topology.node_mut(id)?;
        if node.node.enabled == enabled {
            return Ok(());
        }
        node.node.enabled = enabled;
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_enable: node {id} enabled={enabled}");

        self.publish(&mut topology);
        Ok(())
    }

    // ── Connection mutations ────────────────────────────────────────────────

    /// Adds a connection. Returns its ID.
    ///
    /// Returns an error if:
    /// - The graph already holds `max_connections` connections
    /// - Either endpoint doesn't exist
    /// - The connection would close a cycle under [`CyclePolicy::RejectCycles`]
    pub fn add_connection(&self, mut connection: Connection) -> Result<ConnectionId, GraphError> {
        let mut topology = self.topology.lock();
        if topology.connections.len() >= self.config.max_connections {
            return Err(GraphError::ConnectionCapacityExceeded(
                self.config.max_connections,
            ));
        }

        let (source, destination) = (connection.source, connection.destination);
        topology.node(source)?;
        topology.node(destination)?;

        // A cycle exists if `destination` can already reach `source`.
        if self.config.cycle_policy == CyclePolicy::RejectCycles
            && topology.can_reach(destination, source)
        {
            return Err(GraphError::CycleDetected {
                from: source,
                to: destination,
            });
        }

        let id = topology.connections.insert_with(|id| {
            connection.id = id;
            connection
        });
        topology.node_mut(source)?.outgoing.push(id);
        topology.node_mut(destination)?.incoming.push(id);

        #[cfg(feature = "tracing")]
        tracing::debug!("graph_connect: {source} → {destination} as {id}");

        self.publish(&mut topology);
        Ok(id)
    }

    /// Removes the oldest connection from `source` to `destination`.
    pub fn remove_connection(
        &self,
        source: NodeId,
        destination: NodeId,
    ) -> Result<(), GraphError> {
        let mut topology = self.topology.lock();
        let id = topology
            .node(source)
            .ok()
            .and_then(|node| {
                node.outgoing.iter().copied().find(|c| {
                    topology
                        .connections
                        .get(*c)
                        .is_some_and(|conn| conn.joins(source, destination))
                })
            })
            .ok_or(GraphError::ConnectionNotFound {
                from: source,
                to: destination,
            })?;

        topology.remove_connection_internal(id);
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_disconnect: {source} → {destination} ({id})");

        self.publish(&mut topology);
        Ok(())
    }

    /// Removes a connection by ID.
    pub fn remove_connection_by_id(&self, id: ConnectionId) -> Result<(), GraphError> {
        let mut topology = self.topology.lock();
        if !topology.connections.contains(id) {
            return Err(GraphError::ConnectionIdNotFound(id));
        }
        topology.remove_connection_internal(id);
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_disconnect: {id}");

        self.publish(&mut topology);
        Ok(())
    }

    /// Removes every node and connection and publishes an empty order.
    ///
    /// IDs keep increasing across a reset; storage is released.
    pub fn reset(&self) {
        let mut topology = self.topology.lock();
        topology.nodes.clear();
        topology.connections.clear();
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_reset");

        self.publish(&mut topology);
    }

    // ── Read side ───────────────────────────────────────────────────────────

    /// Loads the current rendering order (wait-free, render-thread safe).
    ///
    /// The graph keeps the order it last replaced alive until the following
    /// mutation, so dropping the returned guard only frees a snapshot when it
    /// was held across two publications.
    pub fn processing_order(&self) -> Guard<Arc<ProcessingOrder>> {
        self.published.load()
    }

    /// Loads the current rendering order as an owned `Arc`.
    ///
    /// Prefer [`processing_order`](Self::processing_order) on the render thread.
    pub fn processing_order_arc(&self) -> Arc<ProcessingOrder> {
        self.published.load_full()
    }

    /// Returns a copy of a node.
    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.topology.lock().node(id).ok().map(|data| data.node.clone())
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.topology.lock().nodes.len()
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.topology.lock().connections.len()
    }

    /// Returns a copy of a connection.
    pub fn find_connection(&self, id: ConnectionId) -> Option<Connection> {
        self.topology.lock().connections.get(id).cloned()
    }

    /// Copies of all live connections, in ID order.
    pub fn connections(&self) -> Vec<Connection> {
        self.topology
            .lock()
            .connections
            .iter_by_key()
            .map(|(_, connection)| connection.clone())
            .collect()
    }

    /// IDs and labels of all live nodes, in ID order.
    pub fn nodes(&self) -> Vec<(NodeId, Node)> {
        self.topology
            .lock()
            .nodes
            .iter_by_key()
            .map(|(id, data)| (id, data.node.clone()))
            .collect()
    }

    /// Recomputes the order from `topology` and publishes it.
    ///
    /// The replaced order moves into `retired`, and the one retired before it
    /// is dropped here on the control thread.
    fn publish(&self, topology: &mut Topology) {
        topology.generation += 1;
        let order = order::compute(
            &topology.nodes,
            &topology.connections,
            self.config.cache_connections,
            topology.generation,
        );
        topology.retired = Some(self.published.swap(Arc::new(order)));
    }
}

impl Default for ProcessingGraph {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

impl core::fmt::Debug for ProcessingGraph {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let topology = self.topology.lock();
        f.debug_struct("ProcessingGraph")
            .field("config", &self.config)
            .field("nodes", &topology.nodes.len())
            .field("connections", &topology.connections.len())
            .field("generation", &topology.generation)
            .finish()
    }
}
