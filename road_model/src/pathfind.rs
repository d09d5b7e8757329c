//! Shortest path across the internal links of one composite intersection,
//! without needing any precomputed structure. The graphs involved are tiny
//! (a handful of slip roads and carriageway stubs), so Dijkstra via petgraph
//! with a zero heuristic is plenty.

use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};

use crate::{ClusterId, NodeId, RoadId, RoadNetwork};

/// One internal road traversed from `from_node` to `to_node`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub road: RoadId,
    pub from_node: NodeId,
    pub to_node: NodeId,
}

/// Finds the cheapest chain of internal links from `entry` to `exit` inside
/// one cluster, respecting one-way coding; edge cost is link length. `None`
/// when the open set exhausts, which discards the movement upstream.
pub fn cluster_path(
    network: &RoadNetwork,
    cluster: ClusterId,
    entry: NodeId,
    exit: NodeId,
) -> Option<Vec<PathStep>> {
    if entry == exit {
        return Some(Vec::new());
    }

    let mut graph: DiGraphMap<NodeId, (f64, RoadId)> = DiGraphMap::new();
    for id in &network.clusters[&cluster].roads {
        let road = &network.roads[id];
        let cost = road.length();
        if road.oneway.allows_forward() {
            add_min_edge(&mut graph, road.src_node, road.dst_node, cost, *id);
        }
        if road.oneway.allows_backward() {
            add_min_edge(&mut graph, road.dst_node, road.src_node, cost, *id);
        }
    }
    if !graph.contains_node(entry) || !graph.contains_node(exit) {
        return None;
    }

    let (_, nodes) = petgraph::algo::astar(
        &graph,
        entry,
        |n| n == exit,
        |(_, _, edge)| edge.0,
        |_| 0.0,
    )?;

    Some(
        nodes
            .windows(2)
            .map(|pair| PathStep {
                road: graph.edge_weight(pair[0], pair[1]).unwrap().1,
                from_node: pair[0],
                to_node: pair[1],
            })
            .collect(),
    )
}

/// Parallel links between the same node pair keep only the cheapest edge.
fn add_min_edge(
    graph: &mut DiGraphMap<NodeId, (f64, RoadId)>,
    from: NodeId,
    to: NodeId,
    cost: f64,
    road: RoadId,
) {
    match graph.edge_weight(from, to) {
        Some((existing, _)) if *existing <= cost => {}
        _ => {
            graph.add_edge(from, to, (cost, road));
        }
    }
}
