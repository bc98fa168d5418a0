//! Graph connection types.
//!
//! A [`Connection`] carries audio from a source node's output port to a
//! destination node's input port. Several connections may join the same pair
//! of nodes (for example on different ports); each gets its own
//! [`ConnectionId`].

use super::node::NodeId;

/// Unique identifier for a connection in the processing graph.
///
/// Connection IDs are assigned sequentially and never reused within a graph
/// instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub(crate) u32);

impl ConnectionId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    /// Placeholder carried by connections that have not been added to a graph.
    #[inline]
    pub fn sentinel() -> Self {
        Self(u32::MAX)
    }
}

impl core::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

/// Channel layout and rate of the audio travelling over a connection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioFormat {
    /// Interleaved channel count.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: f64,
}

impl AudioFormat {
    /// Stereo at the given rate.
    pub fn stereo(sample_rate: f64) -> Self {
        Self {
            channels: 2,
            sample_rate,
        }
    }

    /// Mono at the given rate.
    pub fn mono(sample_rate: f64) -> Self {
        Self {
            channels: 1,
            sample_rate,
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::stereo(48000.0)
    }
}

/// A directed audio connection between two nodes.
///
/// # Example
///
/// ```rust
/// use tactus_core::{AudioFormat, Connection, GraphConfig, Node, ProcessingGraph};
///
/// let graph = ProcessingGraph::new(GraphConfig::default());
/// let synth = graph.add_node(Node::new("synth")).unwrap();
/// let mixer = graph.add_node(Node::new("mixer")).unwrap();
///
/// let id = graph
///     .add_connection(
///         Connection::new(synth, mixer)
///             .with_ports(0, 3)
///             .with_format(AudioFormat::mono(44100.0)),
///     )
///     .unwrap();
///
/// let stored = graph.find_connection(id).unwrap();
/// assert_eq!(stored.id(), id);
/// assert_eq!(stored.destination_port, 3);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Connection {
    pub(crate) id: ConnectionId,
    /// Node producing the audio.
    pub source: NodeId,
    /// Node consuming the audio.
    pub destination: NodeId,
    /// Output port on the source node.
    pub source_port: u16,
    /// Input port on the destination node.
    pub destination_port: u16,
    /// Audio format on the wire.
    pub format: AudioFormat,
}

impl Connection {
    /// Connects port 0 of `source` to port 0 of `destination` in the default format.
    pub fn new(source: NodeId, destination: NodeId) -> Self {
        Self {
            id: ConnectionId::sentinel(),
            source,
            destination,
            source_port: 0,
            destination_port: 0,
            format: AudioFormat::default(),
        }
    }

    /// Sets the source and destination ports.
    pub fn with_ports(mut self, source_port: u16, destination_port: u16) -> Self {
        self.source_port = source_port;
        self.destination_port = destination_port;
        self
    }

    /// Sets the audio format.
    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    /// Graph-assigned identifier, or [`ConnectionId::sentinel`] before insertion.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Whether this connection joins `source` to `destination`.
    pub fn joins(&self, source: NodeId, destination: NodeId) -> bool {
        self.source == source && self.destination == destination
    }
}
