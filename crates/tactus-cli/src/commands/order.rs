//! Graph ordering command.
//!
//! Builds a graph from an edge list such as `"osc>filter, lfo>filter, filter>out"`
//! and prints the order the render thread would walk.

use std::collections::HashMap;

use clap::Args;
use serde::Serialize;
use tactus_core::{
    Connection, CyclePolicy, GraphConfig, GraphError, Node, NodeId, ProcessingGraph,
};

#[derive(Args)]
pub struct OrderArgs {
    /// Edge list: comma-separated chains like "a>b>c, d>b". A bare name adds an unconnected node.
    edges: String,

    /// Refuse connections that close a cycle instead of skipping back-edges
    #[arg(long)]
    reject_cycles: bool,

    /// Nodes to mark disabled (repeatable)
    #[arg(long)]
    disable: Vec<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct OrderReport {
    order: Vec<OrderedNode>,
    generation: u64,
    skipped_back_edges: usize,
    rejected: Vec<String>,
}

#[derive(Serialize)]
struct OrderedNode {
    name: String,
    enabled: bool,
    inputs: Vec<String>,
}

/// Splits an edge list into node names and `(from, to)` pairs.
///
/// Names keep their order of first appearance.
fn parse_edges(list: &str) -> Result<(Vec<String>, Vec<(String, String)>), String> {
    let mut names: Vec<String> = Vec::new();
    let mut edges = Vec::new();

    for chain in list.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        let hops: Vec<&str> = chain.split('>').map(str::trim).collect();
        if hops.iter().any(|h| h.is_empty()) {
            return Err(format!("invalid chain '{chain}' (expected names like a>b>c)"));
        }
        for name in &hops {
            if !names.iter().any(|n| n == name) {
                names.push((*name).to_string());
            }
        }
        for pair in hops.windows(2) {
            edges.push((pair[0].to_string(), pair[1].to_string()));
        }
    }

    if names.is_empty() {
        return Err("edge list is empty".to_string());
    }
    Ok((names, edges))
}

pub fn run(args: OrderArgs) -> anyhow::Result<()> {
    let (names, edges) = parse_edges(&args.edges).map_err(anyhow::Error::msg)?;

    let cycle_policy = if args.reject_cycles {
        CyclePolicy::RejectCycles
    } else {
        CyclePolicy::SkipBackEdges
    };
    let graph = ProcessingGraph::new(GraphConfig {
        cycle_policy,
        ..GraphConfig::default()
    });

    let mut ids: HashMap<&str, NodeId> = HashMap::new();
    for name in &names {
        let enabled = !args.disable.iter().any(|d| d == name);
        let id = graph.add_node(Node::new(name.as_str()).with_enabled(enabled))?;
        ids.insert(name.as_str(), id);
    }
    for unknown in args.disable.iter().filter(|d| !ids.contains_key(d.as_str())) {
        tracing::warn!("order: --disable {unknown} names no node");
    }

    let mut rejected = Vec::new();
    for (from, to) in &edges {
        let connection = Connection::new(ids[from.as_str()], ids[to.as_str()]);
        match graph.add_connection(connection) {
            Ok(_) => {}
            Err(GraphError::CycleDetected { .. }) => rejected.push(format!("{from}>{to}")),
            Err(err) => return Err(err.into()),
        }
    }

    let order = graph.processing_order();
    let label = |id: NodeId| {
        graph
            .node(id)
            .map(|node| node.label)
            .unwrap_or_else(|| id.to_string())
    };
    let report = OrderReport {
        order: order
            .entries()
            .iter()
            .map(|entry| OrderedNode {
                name: label(entry.id),
                enabled: entry.enabled,
                inputs: order
                    .incoming(entry)
                    .iter()
                    .map(|connection| label(connection.source))
                    .collect(),
            })
            .collect(),
        generation: order.generation(),
        skipped_back_edges: order.skipped_back_edges(),
        rejected,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Processing order (generation {}):", report.generation);
    for (i, node) in report.order.iter().enumerate() {
        let disabled = if node.enabled { "" } else { " [DISABLED]" };
        if node.inputs.is_empty() {
            println!("  {}. {}{}", i + 1, node.name, disabled);
        } else {
            println!(
                "  {}. {}{} <- {}",
                i + 1,
                node.name,
                disabled,
                node.inputs.join(", ")
            );
        }
    }
    println!();
    println!("Skipped back-edges: {}", report.skipped_back_edges);
    for edge in &report.rejected {
        println!("Rejected (closes a cycle): {edge}");
    }

    Ok(())
}
