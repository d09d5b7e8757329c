//! Node role classification and junction trimming. Roads approaching a
//! junction node yield ground so the synthesized connector curves have room.

use std::collections::BTreeMap;

use crate::geometry::turning_point_distance;
use crate::network::{NodeRole, RoadNetwork};
use crate::{NodeId, RoadEnd, RoadId};

/// Assigns a role to every node from its incident end count, then trims roads
/// back from junction nodes. Role assignment alone is idempotent.
pub fn classify_nodes(network: &mut RoadNetwork) {
    // Count polyline ends, not distinct roads; a loop contributes two ends.
    let mut end_counts: BTreeMap<NodeId, usize> = BTreeMap::new();
    for road in network.roads.values() {
        *end_counts.entry(road.src_node).or_insert(0) += 1;
        *end_counts.entry(road.dst_node).or_insert(0) += 1;
    }

    let mut junction_nodes: Vec<NodeId> = Vec::new();
    for node in network.nodes.values_mut() {
        node.role = match end_counts.get(&node.id).copied().unwrap_or(0) {
            0 | 1 => NodeRole::Isolated,
            2 => NodeRole::Connect,
            _ => NodeRole::Junction,
        };
        if node.role == NodeRole::Junction {
            junction_nodes.push(node.id);
        }
    }

    for node in junction_nodes {
        trim_roads_at(network, node);
    }
}

/// Pulls every road approaching `node` back by the junction margin plus the
/// widest turning-point estimate against its neighbors, capped at half the
/// road's own length. Never leaves a road with fewer than two points.
fn trim_roads_at(network: &mut RoadNetwork, node: NodeId) {
    let incident: Vec<RoadId> = network.nodes[&node].roads.iter().copied().collect();
    for id in &incident {
        let Some(end) = network.roads[id].end_at(node) else {
            continue;
        };
        let margin = network.config.junction_margin + neighbor_range(network, node, *id, end);
        let margin = margin.min(network.roads[id].length() / 2.0);

        let road = &network.roads[id];
        let (start, stop) = match end {
            RoadEnd::Start => (margin, road.length()),
            RoadEnd::End => (0.0, road.length() - margin),
        };
        match road.center.exact_slice(start, stop) {
            Ok(trimmed) => {
                network.roads.get_mut(id).unwrap().center = trimmed;
            }
            Err(_) => {
                // Too short to yield anything; leave the geometry alone
                // rather than collapse it.
                debug!("{} too short to trim at {}", id, node);
            }
        }
    }
}

/// The widest turning-point estimate from `road` into any other road at this
/// node.
pub fn neighbor_range(network: &RoadNetwork, node: NodeId, road: RoadId, end: RoadEnd) -> f64 {
    let r = &network.roads[&road];
    let heading_in = r.heading_into(end);
    let mut range: f64 = 0.0;
    for other_id in &network.nodes[&node].roads {
        if *other_id == road {
            continue;
        }
        let other = &network.roads[other_id];
        let Some(other_end) = other.end_at(node) else {
            continue;
        };
        let delta = heading_in.delta_to(other.heading_out_of(other_end));
        range = range.max(turning_point_distance(r.width, other.width, delta));
    }
    range
}
