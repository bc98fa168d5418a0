//! Tactus Core - real-time audio scheduling primitives
//!
//! This crate provides the timing and ordering backbone of an audio engine:
//! everything that has to run once per hardware callback on the audio thread
//! without blocking or allocating, plus the control-thread APIs that feed it.
//!
//! # Core Abstractions
//!
//! ## Clock
//!
//! - [`PrecisionClock`] - maps host timestamps to an authoritative sample
//!   position and a musical (bar/beat/tick) position, compensating for callback
//!   jitter and host clock drift, with optional external sync
//! - [`PrecisionTimingInfo`] - immutable per-callback timing snapshot
//! - [`MusicalPosition`], [`TimeSignature`], [`NoteDivision`] - musical time
//!
//! ## Processing Graph
//!
//! - [`ProcessingGraph`] - node/connection topology with a cached, published
//!   rendering order
//! - [`ProcessingOrder`] - immutable order snapshot read by the render thread
//! - [`CyclePolicy`] - what the ordering does with feedback connections
//!
//! ## Monitoring
//!
//! - [`PerformanceMonitor`] - running statistics of render pass duration
//! - [`RealTimeSafetyMonitor`] - deadline miss accounting
//!
//! # Example
//!
//! ```rust
//! use tactus_core::{ClockConfig, Node, PrecisionClock, ProcessingGraph, GraphConfig, Connection};
//!
//! let clock = PrecisionClock::new(ClockConfig::default());
//! clock.start();
//!
//! let graph = ProcessingGraph::new(GraphConfig::default());
//! let osc = graph.add_node(Node::new("osc")).unwrap();
//! let out = graph.add_node(Node::new("out")).unwrap();
//! graph.add_connection(Connection::new(osc, out)).unwrap();
//!
//! // Once per hardware callback:
//! let timing = clock.process_buffer(0.0, 512);
//! assert_eq!(timing.sample_position, 0);
//! for entry in graph.processing_order().enabled() {
//!     // render entry.id ...
//!     let _ = entry;
//! }
//! assert_eq!(clock.sample_position(), 512);
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: no allocation and no unbounded waits in render-thread calls
//! - **Never fails on the audio thread**: invalid values are clamped, degraded
//!   timing is reported through metrics
//! - **Explicit ownership**: no global instances; share with `Arc`

pub mod clock;
pub mod graph;
pub mod monitor;

pub use clock::{
    AccuracyMetrics, ClockConfig, ClockState, ClockSyncStatus, MAX_BPM, MIN_BPM, MusicalPosition,
    NoteDivision, PrecisionClock, PrecisionTimingInfo, SyncSource, TimeSignature,
};
pub use graph::{
    AudioFormat, Connection, ConnectionId, CyclePolicy, GraphConfig, GraphError, Node, NodeId,
    OrderEntry, ProcessingGraph, ProcessingOrder,
};
pub use monitor::{
    DeadlineMiss, PerformanceMetrics, PerformanceMonitor, RealTimeSafetyMonitor, SafetyStatus,
};
