//! Processing graph and rendering order.
//!
//! # Architecture
//!
//! The graph is split into a mutable topology and an immutable, published
//! order:
//!
//! - [`ProcessingGraph`] holds nodes and connections behind a mutex taken only
//!   by control threads. Every successful mutation recomputes the order.
//! - [`ProcessingOrder`] is the snapshot the render thread walks. It is
//!   published through an `ArcSwap`, so loading it is wait-free and a reader
//!   always sees either the old or the new order, never a partial one.
//!
//! # Feedback
//!
//! Audio graphs often contain feedback loops. Under the default
//! [`CyclePolicy::SkipBackEdges`] the ordering treats the connection closing a
//! loop as already satisfied, so every node is still rendered exactly once per
//! pass. [`CyclePolicy::RejectCycles`] refuses such connections at mutation
//! time instead.
//!
//! # Example
//!
//! ```rust
//! use tactus_core::graph::{Connection, GraphConfig, Node, ProcessingGraph};
//!
//! let graph = ProcessingGraph::new(GraphConfig::default());
//! let osc = graph.add_node(Node::new("osc")).unwrap();
//! let filter = graph.add_node(Node::new("filter")).unwrap();
//! let out = graph.add_node(Node::new("out")).unwrap();
//! graph.add_connection(Connection::new(osc, filter)).unwrap();
//! graph.add_connection(Connection::new(filter, out)).unwrap();
//!
//! // Render thread:
//! let order = graph.processing_order();
//! assert_eq!(order.ids().collect::<Vec<_>>(), vec![osc, filter, out]);
//! ```

mod arena;
mod connection;
mod node;
mod order;
mod processing;

pub use connection::{AudioFormat, Connection, ConnectionId};
pub use node::{Node, NodeId};
pub use order::{CyclePolicy, OrderEntry, ProcessingOrder};
pub use processing::{GraphConfig, GraphError, ProcessingGraph};
