//! The road graph: deduplicated nodes, classified and trimmed polylines,
//! composite intersection clusters, and merged chains. Built once per input
//! dataset, then consulted as a read-only lookup service by every later
//! phase.

mod classify;
mod composites;
mod lookups;
mod merge;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use geom::{Angle, HashablePt2D, LonLat, PolyLine, Projection, Pt2D};

use crate::raw::{OneWay, RawNetwork};
use crate::{
    ClusterId, Diagnostics, Event, JunctionId, NetworkConfig, NodeId, RoadEnd, RoadId,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum NodeRole {
    /// Three or more incident polyline ends.
    Junction,
    /// Exactly two; a candidate for merging.
    Connect,
    /// A dead end.
    Isolated,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub pt: Pt2D,
    pub role: NodeRole,
    /// All roads with an endpoint here, kept current through merging.
    pub roads: BTreeSet<RoadId>,
}

/// A lane count that may differ between the two ends of a road. The scalar
/// case is simply `start == end`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LaneCount {
    pub start: u8,
    pub end: u8,
}

impl LaneCount {
    pub fn uniform(lanes: u8) -> LaneCount {
        LaneCount {
            start: lanes,
            end: lanes,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Road {
    pub id: RoadId,
    pub center: PolyLine,
    /// Height samples from the survey, kept as planar points so they survive
    /// trimming, reversal, and merging; fitting projects them back onto the
    /// final centerline.
    pub elevation: Vec<(Pt2D, f64)>,
    pub oneway: OneWay,
    pub lanes: u8,
    pub width: f64,
    pub speed: f64,
    pub highway: bool,
    pub src_node: NodeId,
    pub dst_node: NodeId,
    pub src_junction: Option<JunctionId>,
    pub dst_junction: Option<JunctionId>,
    /// Written by the movement classifier, read during connector synthesis.
    pub branch: Option<bool>,
    pub merge: Option<bool>,
}

impl Road {
    pub fn length(&self) -> f64 {
        self.center.length()
    }

    pub fn node_at(&self, end: RoadEnd) -> NodeId {
        match end {
            RoadEnd::Start => self.src_node,
            RoadEnd::End => self.dst_node,
        }
    }

    pub fn end_at(&self, node: NodeId) -> Option<RoadEnd> {
        if self.src_node == node {
            Some(RoadEnd::Start)
        } else if self.dst_node == node {
            Some(RoadEnd::End)
        } else {
            None
        }
    }

    pub fn pt_at(&self, end: RoadEnd) -> Pt2D {
        match end {
            RoadEnd::Start => self.center.first_pt(),
            RoadEnd::End => self.center.last_pt(),
        }
    }

    pub fn junction_at(&self, end: RoadEnd) -> Option<JunctionId> {
        match end {
            RoadEnd::Start => self.src_junction,
            RoadEnd::End => self.dst_junction,
        }
    }

    /// Heading of travel when arriving at a junction touching this end.
    pub fn heading_into(&self, end: RoadEnd) -> Angle {
        match end {
            RoadEnd::End => self.center.last_line().angle(),
            RoadEnd::Start => self.center.first_line().angle().opposite(),
        }
    }

    /// Heading of travel when departing a junction touching this end.
    pub fn heading_out_of(&self, end: RoadEnd) -> Angle {
        match end {
            RoadEnd::Start => self.center.first_line().angle(),
            RoadEnd::End => self.center.last_line().angle().opposite(),
        }
    }

    /// Can traffic arrive at a junction touching this end?
    pub fn can_enter_junction_at(&self, end: RoadEnd) -> bool {
        match end {
            RoadEnd::End => self.oneway.allows_forward(),
            RoadEnd::Start => self.oneway.allows_backward(),
        }
    }

    /// Can traffic depart a junction touching this end?
    pub fn can_leave_junction_at(&self, end: RoadEnd) -> bool {
        match end {
            RoadEnd::Start => self.oneway.allows_forward(),
            RoadEnd::End => self.oneway.allows_backward(),
        }
    }

    /// The centerline oriented so travel leaves the junction at `end`.
    pub fn center_leaving(&self, end: RoadEnd) -> PolyLine {
        match end {
            RoadEnd::Start => self.center.clone(),
            RoadEnd::End => self.center.reversed(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub nodes: BTreeSet<NodeId>,
    pub roads: BTreeSet<RoadId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoadNetwork {
    pub config: NetworkConfig,
    /// The geographic anchor of the planar frame; the serializer derives its
    /// reference header from this.
    pub origin: LonLat,
    pub roads: BTreeMap<RoadId, Road>,
    pub nodes: BTreeMap<NodeId, Node>,
    pub clusters: BTreeMap<ClusterId, Cluster>,
    /// Original id -> the merged chain that swallowed it.
    pub(crate) absorbed: BTreeMap<RoadId, RoadId>,
    pub(crate) node_to_cluster: BTreeMap<NodeId, ClusterId>,
    pub(crate) road_to_cluster: BTreeMap<RoadId, ClusterId>,
    pub diagnostics: Diagnostics,
}

impl RoadNetwork {
    /// Runs the full builder phase sequence over one input dataset.
    pub fn build(raw: &RawNetwork, config: NetworkConfig) -> Result<RoadNetwork> {
        let mut network = ingest(raw, config)?;
        info!(
            "ingested {} roads, {} nodes",
            network.roads.len(),
            network.nodes.len()
        );

        classify::classify_nodes(&mut network);
        composites::detect_composites(&mut network);
        info!("found {} composite intersections", network.clusters.len());
        merge::merge_connect_nodes(&mut network);
        network.assign_junction_ids();
        network.backfill_speeds();
        Ok(network)
    }

    fn assign_junction_ids(&mut self) {
        let assignments: Vec<(RoadId, Option<JunctionId>, Option<JunctionId>)> = self
            .roads
            .values()
            .map(|r| {
                (
                    r.id,
                    self.junction_at_node(r.src_node),
                    self.junction_at_node(r.dst_node),
                )
            })
            .collect();
        for (id, src, dst) in assignments {
            let road = self.roads.get_mut(&id).unwrap();
            road.src_junction = src;
            road.dst_junction = dst;
        }
    }

    pub fn junction_at_node(&self, node: NodeId) -> Option<JunctionId> {
        if let Some(cluster) = self.node_to_cluster.get(&node) {
            return Some(JunctionId::Composite(*cluster));
        }
        if self.nodes[&node].role == NodeRole::Junction {
            return Some(JunctionId::Simple(node));
        }
        None
    }

    /// Every junction identity in deterministic order: composites first by
    /// cluster id, then simple junction nodes.
    pub fn all_junctions(&self) -> Vec<JunctionId> {
        let mut result: Vec<JunctionId> = self
            .clusters
            .keys()
            .map(|c| JunctionId::Composite(*c))
            .collect();
        for (id, node) in &self.nodes {
            if node.role == NodeRole::Junction && !self.node_to_cluster.contains_key(id) {
                result.push(JunctionId::Simple(*id));
            }
        }
        result
    }
}

/// Projects, resamples, and registers every raw polyline; exact planar
/// coordinate equality defines node identity.
fn ingest(raw: &RawNetwork, config: NetworkConfig) -> Result<RoadNetwork> {
    let projection = Projection::new(raw.origin);
    let sampling_interval = config.sampling_interval;
    let mut network = RoadNetwork {
        config,
        origin: raw.origin,
        roads: BTreeMap::new(),
        nodes: BTreeMap::new(),
        clusters: BTreeMap::new(),
        absorbed: BTreeMap::new(),
        node_to_cluster: BTreeMap::new(),
        road_to_cluster: BTreeMap::new(),
        diagnostics: Diagnostics::new(),
    };
    let mut node_ids: HashMap<HashablePt2D, NodeId> = HashMap::new();

    for r in &raw.roads {
        let pts: Vec<Pt2D> = r.points.iter().map(|ll| projection.to_pt(*ll)).collect();
        let center = match PolyLine::new(pts) {
            Ok(pl) => pl,
            Err(err) => {
                network.diagnostics.record(Event::DroppedRoad {
                    id: r.id,
                    reason: err.to_string(),
                });
                continue;
            }
        };
        let (center, elevation) =
            resample_with_elevation(&center, &r.elevation, sampling_interval);

        let src_node = register_node(&mut network, &mut node_ids, center.first_pt());
        let dst_node = register_node(&mut network, &mut node_ids, center.last_pt());
        network.nodes.get_mut(&src_node).unwrap().roads.insert(r.id);
        network.nodes.get_mut(&dst_node).unwrap().roads.insert(r.id);

        network.roads.insert(
            r.id,
            Road {
                id: r.id,
                center,
                elevation,
                oneway: r.oneway,
                lanes: r.lanes.max(1),
                width: r.width,
                speed: r.speed,
                highway: r.highway,
                src_node,
                dst_node,
                src_junction: None,
                dst_junction: None,
                branch: None,
                merge: None,
            },
        );
    }
    Ok(network)
}

fn register_node(
    network: &mut RoadNetwork,
    node_ids: &mut HashMap<HashablePt2D, NodeId>,
    pt: Pt2D,
) -> NodeId {
    let key = pt.to_hashable();
    if let Some(id) = node_ids.get(&key) {
        return *id;
    }
    let id = NodeId(node_ids.len());
    node_ids.insert(key, id);
    network.nodes.insert(
        id,
        Node {
            id,
            pt,
            role: NodeRole::Isolated,
            roads: BTreeSet::new(),
        },
    );
    id
}

/// Resamples a centerline at a fixed spacing, interpolating the per-point
/// height samples along arclength so they stay attached to the geometry.
fn resample_with_elevation(
    center: &PolyLine,
    elevation: &[f64],
    interval: f64,
) -> (PolyLine, Vec<(Pt2D, f64)>) {
    let resampled = center.resample(interval);
    if elevation.is_empty() {
        return (resampled, Vec::new());
    }

    // Arclength of each original height sample. Point deduplication may have
    // left fewer points than height samples; the shorter prefix wins.
    let raw_pts = center.points();
    let count = raw_pts.len().min(elevation.len());
    let mut samples = Vec::with_capacity(resampled.points().len());
    let mut cumulative = vec![0.0];
    for pair in raw_pts.windows(2) {
        cumulative.push(cumulative.last().unwrap() + pair[0].dist_to(pair[1]));
    }

    let total = center.length();
    let n = resampled.points().len();
    for (i, pt) in resampled.points().iter().enumerate() {
        let s = if i == n - 1 {
            total
        } else {
            total * (i as f64) / ((n - 1) as f64)
        };
        samples.push((*pt, interpolate(&cumulative[..count], &elevation[..count], s)));
    }
    (resampled, samples)
}

fn interpolate(s_values: &[f64], z_values: &[f64], s: f64) -> f64 {
    if z_values.is_empty() {
        return 0.0;
    }
    if s <= s_values[0] {
        return z_values[0];
    }
    for i in 1..s_values.len() {
        if s <= s_values[i] {
            let span = s_values[i] - s_values[i - 1];
            if span < 1e-9 {
                return z_values[i];
            }
            let t = (s - s_values[i - 1]) / span;
            return z_values[i - 1] + t * (z_values[i] - z_values[i - 1]);
        }
    }
    *z_values.last().unwrap()
}
