//! Fuses pairs of roads meeting at a connect node into merged chains. Fusion
//! is transitive: a chain of eligible connect nodes collapses into one road
//! keeping one of the original ids.

use std::collections::BTreeSet;

use geom::Pt2D;

use crate::network::{NodeRole, RoadNetwork};
use crate::raw::OneWay;
use crate::{NodeId, RoadId};

pub fn merge_connect_nodes(network: &mut RoadNetwork) {
    let connect_nodes: Vec<NodeId> = network
        .nodes
        .values()
        .filter(|n| n.role == NodeRole::Connect)
        .map(|n| n.id)
        .collect();
    for node in connect_nodes {
        try_merge_at(network, node);
    }
}

fn try_merge_at(network: &mut RoadNetwork, node: NodeId) {
    let incident: Vec<RoadId> = network.nodes[&node].roads.iter().copied().collect();
    if incident.len() != 2 {
        return;
    }
    let (r1, r2) = (incident[0], incident[1]);
    // Intersection-internal links never merge.
    if network.road_to_cluster.contains_key(&r1) || network.road_to_cluster.contains_key(&r2) {
        return;
    }

    let road1 = &network.roads[&r1];
    let road2 = &network.roads[&r2];
    let end1 = road1.end_at(node).unwrap();
    let end2 = road2.end_at(node).unwrap();
    let head_to_tail = end1 != end2;

    if road1.highway || road2.highway {
        // Highway chains must keep a consistent travel direction.
        if road1.oneway != road2.oneway || !head_to_tail {
            return;
        }
    } else if road1.oneway != road2.oneway {
        return;
    }

    fuse(network, node, r1, r2);
}

fn fuse(network: &mut RoadNetwork, node: NodeId, r1: RoadId, r2: RoadId) {
    let (mut r1, mut r2) = (r1, r2);
    // Keep the longer piece's id; a little more convenient for debugging.
    if network.roads[&r1].length() < network.roads[&r2].length() {
        std::mem::swap(&mut r1, &mut r2);
    }

    // Skip loops; easiest way to detect is to count distinct endpoints.
    let mut endpts = BTreeSet::new();
    endpts.insert(network.roads[&r1].src_node);
    endpts.insert(network.roads[&r1].dst_node);
    endpts.insert(network.roads[&r2].src_node);
    endpts.insert(network.roads[&r2].dst_node);
    if endpts.len() != 3 {
        info!("not fusing {} and {} at {}: loop", r1, r2, node);
        return;
    }

    let road2 = network.roads.remove(&r2).unwrap();
    let mut road1 = network.roads.remove(&r1).unwrap();

    // Four cases, easy to understand on paper. Preserve r1's direction, and
    // track what r2's one-way code looks like once oriented along the chain.
    let c1 = road1.center.clone();
    let c2 = road2.center.clone();
    let fused = if road1.dst_node == road2.src_node {
        c1.extend(c2).map(|center| {
            (
                center,
                road1.src_node,
                road2.dst_node,
                road2.oneway,
                concat(&road1.elevation, &road2.elevation, false),
            )
        })
    } else if road1.dst_node == road2.dst_node {
        c1.extend(c2.reversed()).map(|center| {
            (
                center,
                road1.src_node,
                road2.src_node,
                road2.oneway.reversed(),
                concat(&road1.elevation, &road2.elevation, true),
            )
        })
    } else if road1.src_node == road2.dst_node {
        c2.extend(c1).map(|center| {
            (
                center,
                road2.src_node,
                road1.dst_node,
                road2.oneway,
                concat(&road2.elevation, &road1.elevation, false),
            )
        })
    } else {
        c2.reversed().extend(c1).map(|center| {
            (
                center,
                road2.dst_node,
                road1.src_node,
                road2.oneway.reversed(),
                prepend_reversed(&road2.elevation, &road1.elevation),
            )
        })
    };

    let (center, new_src, new_dst, r2_oriented, elevation) = match fused {
        Ok(parts) => parts,
        Err(err) => {
            // Seam mismatch shouldn't happen at an untrimmed connect node.
            warn!("not fusing {} and {} at {}: {}", r1, r2, node, err);
            network.roads.insert(r1, road1);
            network.roads.insert(r2, road2);
            return;
        }
    };
    assert!(node != new_src && node != new_dst);

    // Oriented codes agree; differing codes mean the chain is passable both
    // ways overall.
    road1.oneway = if road1.oneway == r2_oriented {
        road1.oneway
    } else {
        OneWay::Both
    };
    road1.center = center;
    road1.elevation = elevation;
    road1.src_node = new_src;
    road1.dst_node = new_dst;
    road1.highway = road1.highway || road2.highway;
    network.roads.insert(r1, road1);

    // Book-keeping: the merge point keeps its node entry but loses both
    // roads; r2's far endpoint now belongs to r1.
    network.absorbed.insert(r2, r1);
    let repoint: Vec<RoadId> = network
        .absorbed
        .iter()
        .filter(|(_, v)| **v == r2)
        .map(|(k, _)| *k)
        .collect();
    for k in repoint {
        network.absorbed.insert(k, r1);
    }
    for n in network.nodes.values_mut() {
        n.roads.remove(&r2);
    }
    let merge_node = network.nodes.get_mut(&node).unwrap();
    merge_node.roads.remove(&r1);
    network.nodes.get_mut(&new_src).unwrap().roads.insert(r1);
    network.nodes.get_mut(&new_dst).unwrap().roads.insert(r1);
}

fn concat(a: &[(Pt2D, f64)], b: &[(Pt2D, f64)], reverse_b: bool) -> Vec<(Pt2D, f64)> {
    let mut result = a.to_vec();
    if reverse_b {
        result.extend(b.iter().rev().copied());
    } else {
        result.extend(b.iter().copied());
    }
    result
}

fn prepend_reversed(b: &[(Pt2D, f64)], a: &[(Pt2D, f64)]) -> Vec<(Pt2D, f64)> {
    let mut result: Vec<(Pt2D, f64)> = b.iter().rev().copied().collect();
    result.extend(a.iter().copied());
    result
}
