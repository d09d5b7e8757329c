//! Composite intersection detection: clusters of short links that together
//! form one large junction (dual carriageway crossings, slip roads, wide
//! signalized intersections) get a single junction identity.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::geometry::turning_point_distance;
use crate::network::{NodeRole, RoadNetwork};
use crate::{Cluster, ClusterId, NodeId, RoadEnd, RoadId};

const COMPOSITE_MAX_LENGTH: f64 = 200.0;
const COMPOSITE_MAX_POINTS: usize = 9;
/// Through movements that reverse heading more than this are implausible and
/// don't count toward a candidate's junction range.
const THROUGH_REVERSAL_LIMIT_DEGS: f64 = 160.0;

pub fn detect_composites(network: &mut RoadNetwork) {
    let mut qualifying: BTreeSet<RoadId> = BTreeSet::new();
    for road in network.roads.values() {
        if road.length() >= COMPOSITE_MAX_LENGTH
            || road.center.points().len() >= COMPOSITE_MAX_POINTS
        {
            continue;
        }
        if is_pass_through(network, road.id) {
            continue;
        }
        let start_range = junction_range(network, road.id, RoadEnd::Start);
        let end_range = junction_range(network, road.id, RoadEnd::End);
        if road.length() < start_range + end_range + network.config.junction_margin {
            qualifying.insert(road.id);
        }
    }

    // Connected components over shared endpoints.
    let mut assigned: BTreeMap<RoadId, usize> = BTreeMap::new();
    let mut components: Vec<BTreeSet<RoadId>> = Vec::new();
    for seed in &qualifying {
        if assigned.contains_key(seed) {
            continue;
        }
        let idx = components.len();
        let mut members = BTreeSet::new();
        let mut queue = VecDeque::from([*seed]);
        while let Some(id) = queue.pop_front() {
            if !members.insert(id) {
                continue;
            }
            assigned.insert(id, idx);
            let road = &network.roads[&id];
            for node in [road.src_node, road.dst_node] {
                for next in &network.nodes[&node].roads {
                    if qualifying.contains(next) && !members.contains(next) {
                        queue.push_back(*next);
                    }
                }
            }
        }
        components.push(members);
    }

    for (idx, members) in components.into_iter().enumerate() {
        let id = ClusterId(idx);
        let mut nodes: BTreeSet<NodeId> = BTreeSet::new();
        for road_id in &members {
            let road = &network.roads[road_id];
            nodes.insert(road.src_node);
            nodes.insert(road.dst_node);
        }

        // Absorb any link living entirely inside the cluster, even if it
        // didn't qualify on its own.
        let mut roads = members;
        for road in network.roads.values() {
            if nodes.contains(&road.src_node) && nodes.contains(&road.dst_node) {
                roads.insert(road.id);
            }
        }

        for node in &nodes {
            network.node_to_cluster.insert(*node, id);
        }
        for road in &roads {
            network.road_to_cluster.insert(*road, id);
        }
        network.clusters.insert(id, Cluster { id, nodes, roads });
    }
}

/// How far the junction around one end of a candidate plausibly extends,
/// estimated from turning-point distances against its immediate neighbors.
fn junction_range(network: &RoadNetwork, id: RoadId, end: RoadEnd) -> f64 {
    let road = &network.roads[&id];
    let node = road.node_at(end);
    let mut range: f64 = 0.0;
    for other_id in &network.nodes[&node].roads {
        if *other_id == id {
            continue;
        }
        let other = &network.roads[other_id];
        let Some(other_end) = other.end_at(node) else {
            continue;
        };

        // The through movement has to be possible in at least one direction,
        // both by one-way coding and without an implausible heading reversal.
        let mut best: Option<f64> = None;
        if road.can_enter_junction_at(end) && other.can_leave_junction_at(other_end) {
            let delta = road
                .heading_into(end)
                .delta_to(other.heading_out_of(other_end));
            if delta.abs() <= THROUGH_REVERSAL_LIMIT_DEGS {
                best = Some(turning_point_distance(road.width, other.width, delta));
            }
        }
        if other.can_enter_junction_at(other_end) && road.can_leave_junction_at(end) {
            let delta = other
                .heading_into(other_end)
                .delta_to(road.heading_out_of(end));
            if delta.abs() <= THROUGH_REVERSAL_LIMIT_DEGS {
                let d = turning_point_distance(other.width, road.width, delta);
                best = Some(best.map_or(d, |b: f64| b.max(d)));
            }
        }
        if let Some(d) = best {
            range = range.max(d);
        }
    }
    range
}

/// A short link whose both endpoints just continue into exactly one other
/// road is plain geometry between intersections, not intersection interior.
fn is_pass_through(network: &RoadNetwork, id: RoadId) -> bool {
    let road = &network.roads[&id];
    network.nodes[&road.src_node].role == NodeRole::Connect
        && network.nodes[&road.dst_node].role == NodeRole::Connect
}
