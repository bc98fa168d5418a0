//! Rendering order computation and the published order snapshot.
//!
//! The order is a depth-first reverse post-order over the topology: a node
//! appears before every node it feeds, except across a feedback connection,
//! which the traversal treats as already satisfied.

use super::arena::Arena;
use super::connection::{Connection, ConnectionId};
use super::node::{NodeData, NodeId};

/// What the graph does with connections that close a cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CyclePolicy {
    /// Accept the connection; the ordering skips back-edges so every node is
    /// still rendered exactly once.
    #[default]
    SkipBackEdges,
    /// Refuse connections that would close a cycle with
    /// [`GraphError::CycleDetected`](super::GraphError::CycleDetected).
    RejectCycles,
}

/// One node's place in the rendering order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderEntry {
    /// Node to render.
    pub id: NodeId,
    /// Node's enabled flag at publication time.
    pub enabled: bool,
    incoming_start: usize,
    incoming_len: usize,
}

/// Immutable rendering order, published after every topology mutation.
///
/// The render thread loads the current snapshot with
/// [`ProcessingGraph::processing_order`](super::ProcessingGraph::processing_order)
/// and walks it without locking or allocating. A snapshot is never modified
/// after publication; later mutations publish a new one with a higher
/// [`generation`](Self::generation).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProcessingOrder {
    entries: Vec<OrderEntry>,
    connections: Vec<Connection>,
    generation: u64,
    skipped_back_edges: usize,
    cached: bool,
}

impl ProcessingOrder {
    /// All nodes in rendering order.
    pub fn entries(&self) -> &[OrderEntry] {
        &self.entries
    }

    /// Enabled nodes in rendering order.
    pub fn enabled(&self) -> impl Iterator<Item = &OrderEntry> + '_ {
        self.entries.iter().filter(|e| e.enabled)
    }

    /// Node IDs in rendering order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.iter().map(|e| e.id)
    }

    /// Number of nodes in the order.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the order is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of `id` in the order.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Incoming connections of an entry, oldest first.
    ///
    /// Empty when the graph was built with `cache_connections` disabled.
    pub fn incoming(&self, entry: &OrderEntry) -> &[Connection] {
        self.connections
            .get(entry.incoming_start..entry.incoming_start + entry.incoming_len)
            .unwrap_or(&[])
    }

    /// Whether per-entry incoming connections were cached.
    pub fn has_connection_cache(&self) -> bool {
        self.cached
    }

    /// Monotonic counter, incremented on every publication.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Feedback connections the ordering treated as satisfied.
    pub fn skipped_back_edges(&self) -> usize {
        self.skipped_back_edges
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Computes the rendering order of a topology.
///
/// Roots are visited in ID order and each node's outgoing connections in
/// insertion order, so the result is deterministic for a given mutation
/// history. Never fails: a connection to a node still on the traversal stack
/// is a back-edge and is skipped.
pub(crate) fn compute(
    nodes: &Arena<NodeId, NodeData>,
    connections: &Arena<ConnectionId, Connection>,
    cache_connections: bool,
    generation: u64,
) -> ProcessingOrder {
    let mut marks = vec![Mark::Unvisited; nodes.slot_len()];
    let mut post_order = Vec::with_capacity(nodes.len());
    // (slot, next outgoing connection to follow)
    let mut stack: Vec<(usize, usize)> = Vec::new();
    let mut skipped_back_edges = 0;

    for root in nodes.slots_by_key() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::OnStack;
        stack.push((root, 0));

        while let Some(top) = stack.last_mut() {
            let (slot, cursor) = *top;
            let outgoing = nodes.at(slot).map_or(&[][..], |(_, n)| &n.outgoing[..]);

            if let Some(&connection_id) = outgoing.get(cursor) {
                top.1 += 1;
                let Some(connection) = connections.get(connection_id) else {
                    continue;
                };
                let Some(target) = nodes.slot_of(connection.destination) else {
                    continue;
                };
                match marks.get(target) {
                    Some(Mark::Unvisited) => {
                        marks[target] = Mark::OnStack;
                        stack.push((target, 0));
                    }
                    Some(Mark::OnStack) => {
                        skipped_back_edges += 1;
                        #[cfg(feature = "tracing")]
                        tracing::debug!(
                            "graph_sort: skipping back-edge {} → {}",
                            connection.source,
                            connection.destination
                        );
                    }
                    Some(Mark::Done) | None => {}
                }
            } else {
                marks[slot] = Mark::Done;
                post_order.push(slot);
                stack.pop();
            }
        }
    }

    post_order.reverse();

    let mut entries = Vec::with_capacity(post_order.len());
    let mut cached = Vec::new();
    for slot in post_order {
        let Some((id, data)) = nodes.at(slot) else {
            continue;
        };
        let incoming_start = cached.len();
        if cache_connections {
            cached.extend(
                data.incoming
                    .iter()
                    .filter_map(|id| connections.get(*id))
                    .cloned(),
            );
        }
        entries.push(OrderEntry {
            id,
            enabled: data.node.enabled,
            incoming_start,
            incoming_len: cached.len() - incoming_start,
        });
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        "graph_sort: {} nodes in order, {} back-edges skipped (generation {generation})",
        entries.len(),
        skipped_back_edges
    );

    ProcessingOrder {
        entries,
        connections: cached,
        generation,
        skipped_back_edges,
        cached: cache_connections,
    }
}
