//! Converts a catalogue of raw road polylines (per-segment width, lane count,
//! one-way coding, speed, elevation samples) into a normalized road/junction
//! network ready for emission as a road-geometry description. The pipeline is
//! a strict sequence of phases over one mutable network:
//!
//! 1. ingest + endpoint deduplication (`RoadNetwork::build`)
//! 2. node classification and junction trimming
//! 3. composite intersection detection
//! 4. connect-node merging
//! 5. junction id assignment
//! 6. per-junction movement classification and lane linkage (`movements`)
//! 7. connector curve and elevation synthesis (`connectors`, `elevation`)
//! 8. catalogue assembly (`catalogue`)
//!
//! Later phases only read earlier-phase state, with one narrow exception: the
//! movement classifier writes branch/merge tags that connector synthesis
//! reads in the same pass.

#[macro_use]
extern crate log;

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod catalogue;
pub mod connectors;
mod diagnostics;
pub mod elevation;
mod geometry;
pub mod movements;
mod network;
mod pathfind;
pub mod raw;

pub use crate::diagnostics::{Diagnostics, Event};
pub use crate::geometry::turning_point_distance;
pub use crate::movements::{
    Approach, LaneLink, LinkKind, Movement, MovementKind, RoadEnd,
};
pub use crate::network::{Cluster, LaneCount, Node, NodeRole, Road, RoadNetwork};
pub use crate::pathfind::PathStep;

/// A survey polyline id. Stable across the whole pipeline; merged chains keep
/// one of their members' ids.
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize,
)]
pub struct RoadId(pub i64);

/// A deduplicated polyline endpoint, assigned in first-seen order.
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize,
)]
pub struct NodeId(pub usize);

/// One composite intersection cluster.
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize,
)]
pub struct ClusterId(pub usize);

/// Where a road endpoint attaches. Point-like junctions keep their node
/// identity; clusters of short links get a composite identity.
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize,
)]
pub enum JunctionId {
    Simple(NodeId),
    Composite(ClusterId),
}

impl fmt::Display for RoadId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Road #{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Node #{}", self.0)
    }
}

impl fmt::Display for JunctionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JunctionId::Simple(n) => write!(f, "Junction at {}", n),
            JunctionId::Composite(c) => write!(f, "Composite junction #{}", c.0),
        }
    }
}

/// How lane counts are derived for roads that don't carry an explicit count.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum LaneMode {
    /// Trust the survey lane count.
    Fixed,
    /// Divide the road width by the configured lane width, halving first for
    /// bidirectional roads. Minimum one lane.
    FromWidth,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Polylines are resampled at this spacing to bound point density.
    pub sampling_interval: f64,
    /// Base setback from a junction node, before the per-neighbor
    /// turning-point estimate.
    pub junction_margin: f64,
    pub lane_mode: LaneMode,
    pub lane_width: f64,
    /// Upper bound on linked lanes across one junction connector.
    pub max_junction_lanes: u8,
    /// Connectors shorter than this after trimming are dropped.
    pub min_connector_length: f64,
    /// Connector resampling interval.
    pub densify_interval: f64,
}

impl Default for NetworkConfig {
    fn default() -> NetworkConfig {
        NetworkConfig {
            sampling_interval: 25.0,
            junction_margin: 5.0,
            lane_mode: LaneMode::Fixed,
            lane_width: 3.25,
            max_junction_lanes: 2,
            min_connector_length: 1.0,
            densify_interval: 2.0,
        }
    }
}
