//! Enumerates and classifies every permitted directed movement at every
//! junction, then resolves a consistent incoming -> outgoing lane mapping for
//! each. The only mutation here is the branch/merge tag channel on adjoining
//! roads, read later by connector synthesis.

mod classify;
mod lanes;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use geom::{Angle, Cubic, PolyLine, Pt2D, EPSILON_DIST};

use crate::elevation::ElevationSegment;
use crate::network::NodeRole;
use crate::pathfind::{cluster_path, PathStep};
use crate::{Event, JunctionId, RoadId, RoadNetwork};

/// Two roads whose headings fold back within this and whose lead-in lines
/// overlap laterally are the two halves of one carriageway; turning between
/// them is not a movement.
const UTURN_PROXIMITY_DEGS: f64 = 20.0;
/// A local heading kink only counts when |sin delta| clears this.
const LOCAL_DELTA_MIN_SIN: f64 = 0.3;

/// Which end of a road touches a junction.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum RoadEnd {
    Start,
    End,
}

/// A road together with the endpoint order it presents to a junction.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Approach {
    pub road: RoadId,
    pub end: RoadEnd,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalDelta {
    pub angle: Angle,
    /// Whether the kink is pronounced enough to matter for classification.
    pub valid: bool,
}

impl LocalDelta {
    fn new(angle: Angle) -> LocalDelta {
        LocalDelta {
            angle,
            valid: angle.to_radians().sin().abs() > LOCAL_DELTA_MIN_SIN,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MovementKind {
    Straight,
    LeftTurn,
    RightTurn,
    UTurn,
    Merge,
    Diverge,
    Parallel,
    Compound,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum LinkKind {
    Constant,
    Increase,
    Decrease,
}

/// One incoming lane feeding one outgoing lane, in local 1-based indices
/// counted from the right edge of each road.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LaneLink {
    pub from_lane: u8,
    pub to_lane: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Movement {
    pub junction: JunctionId,
    pub from: Approach,
    pub to: Approach,
    pub kind: MovementKind,
    pub total_delta: Angle,
    pub first_delta: LocalDelta,
    pub last_delta: LocalDelta,
    /// Where the movement leaves its incoming road and joins its outgoing
    /// road, after trimming.
    pub entry_pt: Pt2D,
    pub exit_pt: Pt2D,
    /// Internal links crossed inside a composite junction; empty at simple
    /// junctions.
    pub path: Vec<PathStep>,
    pub lane_links: Vec<LaneLink>,
    pub link_kind: LinkKind,
    /// Lateral offset of the connector centerline, entry to exit, over
    /// normalized arclength.
    pub center_offset: Cubic,
    /// Lane width blending from the incoming to the outgoing road.
    pub lane_width: Cubic,
    /// Synthesized connector, if the movement survives synthesis.
    pub connector: Option<PolyLine>,
    pub connector_elevation: Vec<ElevationSegment>,
}

/// Runs classification and lane linkage for every junction. The network is
/// read-only afterwards apart from branch/merge tags written here.
pub fn generate_movements(network: &mut RoadNetwork) -> Vec<Movement> {
    let mut all = Vec::new();
    for junction in movement_sites(network) {
        let approaches = junction_approaches(network, junction);
        let mut movements = enumerate_candidates(network, junction, &approaches);
        if movements.is_empty() {
            continue;
        }
        classify::classify_all(network, &mut movements);
        write_branch_merge_tags(network, &approaches, &movements);
        lanes::link_lanes(network, &mut movements);
        all.extend(movements);
    }
    info!("classified {} movements", all.len());
    all
}

/// Everywhere a movement can happen: composite clusters, junction nodes, and
/// connect nodes whose two roads refused to merge (those still carry a
/// through movement worth lane linkage, just no junction element).
fn movement_sites(network: &RoadNetwork) -> Vec<JunctionId> {
    let mut sites: Vec<JunctionId> = network
        .clusters
        .keys()
        .map(|c| JunctionId::Composite(*c))
        .collect();
    for (id, node) in &network.nodes {
        if network.node_to_cluster.contains_key(id) {
            continue;
        }
        match node.role {
            NodeRole::Junction => sites.push(JunctionId::Simple(*id)),
            NodeRole::Connect if node.roads.len() == 2 => {
                sites.push(JunctionId::Simple(*id))
            }
            _ => {}
        }
    }
    sites
}

fn junction_approaches(network: &RoadNetwork, junction: JunctionId) -> Vec<Approach> {
    match junction {
        JunctionId::Simple(node) => network
            .incident_surface_roads(node)
            .into_iter()
            .map(|(road, end)| Approach { road, end })
            .collect(),
        JunctionId::Composite(c) => {
            let mut result = Vec::new();
            for node in &network.clusters[&c].nodes {
                for (road, end) in network.incident_surface_roads(*node) {
                    result.push(Approach { road, end });
                }
            }
            result.sort();
            result.dedup();
            result
        }
    }
}

fn enumerate_candidates(
    network: &mut RoadNetwork,
    junction: JunctionId,
    approaches: &[Approach],
) -> Vec<Movement> {
    let mut result = Vec::new();
    for from in approaches {
        for to in approaches {
            // A road can't turn onto itself.
            if from.road == to.road {
                continue;
            }
            let f = &network.roads[&from.road];
            let t = &network.roads[&to.road];
            if !f.can_enter_junction_at(from.end) || !t.can_leave_junction_at(to.end) {
                continue;
            }

            let heading_in = f.heading_into(from.end);
            let heading_out = t.heading_out_of(to.end);
            let entry_pt = f.pt_at(from.end);
            let exit_pt = t.pt_at(to.end);
            let entry_node = f.node_at(from.end);
            let exit_node = t.node_at(to.end);
            let combined_width = (f.width + t.width) / 2.0;

            // Folding straight back onto the adjacent carriageway is noise
            // from divided roads, not a real movement.
            if heading_in.delta_to(heading_out.opposite()).abs() < UTURN_PROXIMITY_DEGS
                && perpendicular_offset(entry_pt, heading_in, exit_pt) < combined_width
            {
                network.diagnostics.record(Event::DroppedMovement {
                    junction,
                    from: from.road,
                    to: to.road,
                    reason: "u-turn onto the adjacent carriageway".to_string(),
                });
                continue;
            }

            let path = match junction {
                JunctionId::Composite(c) => {
                    match cluster_path(network, c, entry_node, exit_node) {
                        Some(path) => path,
                        None => {
                            network.diagnostics.record(Event::UnreachableMovement {
                                junction,
                                from: from.road,
                                to: to.road,
                            });
                            continue;
                        }
                    }
                }
                JunctionId::Simple(_) => Vec::new(),
            };

            let total_delta = heading_in.delta_to(heading_out);
            let (first_delta, last_delta) =
                local_deltas(network, heading_in, heading_out, entry_pt, exit_pt, &path);

            result.push(Movement {
                junction,
                from: *from,
                to: *to,
                kind: MovementKind::Straight,
                total_delta,
                first_delta,
                last_delta,
                entry_pt,
                exit_pt,
                path,
                lane_links: Vec::new(),
                link_kind: LinkKind::Constant,
                center_offset: Cubic::constant(0.0),
                lane_width: Cubic::constant(0.0),
                connector: None,
                connector_elevation: Vec::new(),
            });
        }
    }
    result
}

/// The aggregate heading change, split into the kink just after entry and the
/// kink just before exit.
fn local_deltas(
    network: &RoadNetwork,
    heading_in: Angle,
    heading_out: Angle,
    entry_pt: Pt2D,
    exit_pt: Pt2D,
    path: &[PathStep],
) -> (LocalDelta, LocalDelta) {
    let (first, last) = if let (Some(first_step), Some(last_step)) = (path.first(), path.last()) {
        let fr = &network.roads[&first_step.road];
        let first_heading = fr
            .center_leaving(fr.end_at(first_step.from_node).unwrap())
            .first_line()
            .angle();
        let lr = &network.roads[&last_step.road];
        let last_heading = lr
            .center_leaving(lr.end_at(last_step.from_node).unwrap())
            .last_line()
            .angle();
        (heading_in.delta_to(first_heading), last_heading.delta_to(heading_out))
    } else if entry_pt.approx_eq(exit_pt, EPSILON_DIST) {
        (heading_in.delta_to(heading_out), Angle::ZERO)
    } else {
        let chord = entry_pt.angle_to(exit_pt);
        (heading_in.delta_to(chord), chord.delta_to(heading_out))
    };
    (LocalDelta::new(first), LocalDelta::new(last))
}

/// Distance from `pt` to the infinite line through `origin` with direction
/// `heading`.
fn perpendicular_offset(origin: Pt2D, heading: Angle, pt: Pt2D) -> f64 {
    let dx = pt.x() - origin.x();
    let dy = pt.y() - origin.y();
    (dx * heading.sin() - dy * heading.cos()).abs()
}

/// With exactly three roads at a junction, the one that's neither endpoint of
/// the primary (straightest) movement is a developing branch or merge lane;
/// connector offsets double on it later.
fn write_branch_merge_tags(
    network: &mut RoadNetwork,
    approaches: &[Approach],
    movements: &[Movement],
) {
    let road_set: BTreeSet<RoadId> = approaches.iter().map(|a| a.road).collect();
    if road_set.len() != 3 {
        return;
    }
    let Some(primary) = movements.iter().min_by(|a, b| {
        a.total_delta
            .abs()
            .partial_cmp(&b.total_delta.abs())
            .unwrap()
    }) else {
        return;
    };
    let mut third = road_set;
    third.remove(&primary.from.road);
    third.remove(&primary.to.road);
    if third.len() != 1 {
        return;
    }
    let third = *third.iter().next().unwrap();
    let approach = approaches.iter().find(|a| a.road == third).unwrap();

    let road = &network.roads[&third];
    let can_leave = road.can_leave_junction_at(approach.end);
    let can_enter = road.can_enter_junction_at(approach.end);
    if can_leave && !can_enter {
        network.roads.get_mut(&third).unwrap().branch = Some(true);
    } else if can_enter && !can_leave {
        network.roads.get_mut(&third).unwrap().merge = Some(true);
    }
}
