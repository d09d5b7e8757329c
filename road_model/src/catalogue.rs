//! Packages the processed network into fully numeric records for the
//! external serializer: dense sequential element numbers, predecessor and
//! successor linkage, lane and elevation polynomials.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use geom::{Cubic, LonLat, Pt2D};

use crate::elevation::{fit_road_elevation, ElevationSegment};
use crate::movements::Movement;
use crate::raw::OneWay;
use crate::{Event, JunctionId, LaneCount, NodeId, RoadEnd, RoadId, RoadNetwork};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ElementId(pub u32);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "element {}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Contact {
    Start,
    End,
}

impl From<RoadEnd> for Contact {
    fn from(end: RoadEnd) -> Contact {
        match end {
            RoadEnd::Start => Contact::Start,
            RoadEnd::End => Contact::End,
        }
    }
}

/// What a road element touches at one of its ends.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum LinkTarget {
    Road {
        element: ElementId,
        contact: Contact,
    },
    Junction {
        element: ElementId,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoadRecord {
    pub element: ElementId,
    /// The survey id this record wraps; `None` for junction connectors.
    pub source: Option<RoadId>,
    /// The owning junction element, for connectors.
    pub junction: Option<ElementId>,
    pub geometry: Vec<Pt2D>,
    pub length: f64,
    pub speed: f64,
    pub oneway: OneWay,
    pub lane_count: LaneCount,
    pub lane_width: Cubic,
    pub center_offset: Cubic,
    pub elevation: Vec<ElevationSegment>,
    pub predecessor: Option<LinkTarget>,
    pub successor: Option<LinkTarget>,
}

/// One movement wired through a junction: incoming element, the connector
/// road that carries it, and the signed lane pairing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub incoming: ElementId,
    pub connecting: ElementId,
    pub contact: Contact,
    /// Signed indices: negative lanes lie right of the centerline in the
    /// direction of travel.
    pub lane_links: Vec<(i8, i8)>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JunctionRecord {
    pub element: ElementId,
    pub junction: JunctionId,
    pub connections: Vec<ConnectionRecord>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Catalogue {
    /// Geographic anchor for the serializer's reference header.
    pub origin: LonLat,
    pub roads: Vec<RoadRecord>,
    pub junctions: Vec<JunctionRecord>,
    pub diagnostics: Vec<Event>,
}

/// Assigns element numbers and packages everything. Roads come first, then
/// junctions with at least three incident surface connections, then one
/// connector road per surviving movement at those junctions.
pub fn assemble(network: &RoadNetwork, movements: &[Movement]) -> Catalogue {
    let mut next = 1u32;
    let mut road_elements: BTreeMap<RoadId, ElementId> = BTreeMap::new();
    for id in network.roads.keys() {
        if !network.is_intersection_internal(*id) {
            road_elements.insert(*id, ElementId(next));
            next += 1;
        }
    }

    let mut junction_elements: BTreeMap<JunctionId, ElementId> = BTreeMap::new();
    for junction in network.all_junctions() {
        if surface_connections(network, junction) >= 3 {
            junction_elements.insert(junction, ElementId(next));
            next += 1;
        }
    }

    let mut roads = Vec::new();
    for (id, element) in &road_elements {
        roads.push(plain_road_record(network, *id, *element, &road_elements, &junction_elements));
    }

    let mut junction_records: BTreeMap<JunctionId, JunctionRecord> = junction_elements
        .iter()
        .map(|(junction, element)| {
            (
                *junction,
                JunctionRecord {
                    element: *element,
                    junction: *junction,
                    connections: Vec::new(),
                },
            )
        })
        .collect();

    for m in movements {
        let Some(connector) = &m.connector else {
            continue;
        };
        let Some(junction_element) = junction_elements.get(&m.junction) else {
            continue;
        };
        let (Some(from_element), Some(to_element)) = (
            road_elements.get(&m.from.road),
            road_elements.get(&m.to.road),
        ) else {
            continue;
        };

        let element = ElementId(next);
        next += 1;
        roads.push(RoadRecord {
            element,
            source: None,
            junction: Some(*junction_element),
            geometry: connector.points().to_vec(),
            length: connector.length(),
            speed: network.speed(m.from.road),
            oneway: OneWay::Forward,
            lane_count: LaneCount::uniform(m.lane_links.len().max(1) as u8),
            lane_width: m.lane_width,
            center_offset: m.center_offset,
            elevation: m.connector_elevation.clone(),
            predecessor: Some(LinkTarget::Road {
                element: *from_element,
                contact: m.from.end.into(),
            }),
            successor: Some(LinkTarget::Road {
                element: *to_element,
                contact: m.to.end.into(),
            }),
        });

        let record = junction_records.get_mut(&m.junction).unwrap();
        record.connections.push(ConnectionRecord {
            incoming: *from_element,
            connecting: element,
            contact: Contact::Start,
            lane_links: m
                .lane_links
                .iter()
                .map(|link| {
                    (
                        signed_lane(link.from_lane, m.from.end == RoadEnd::End),
                        signed_lane(link.to_lane, m.to.end == RoadEnd::Start),
                    )
                })
                .collect(),
        });
    }

    Catalogue {
        origin: network.origin,
        roads,
        junctions: junction_records.into_values().collect(),
        diagnostics: network.diagnostics.events().to_vec(),
    }
}

/// Lanes used along a road's own direction of travel sit right of its
/// centerline and carry negative indices; counter-direction use flips the
/// sign.
fn signed_lane(lane: u8, along_direction: bool) -> i8 {
    let lane = lane as i8;
    if along_direction {
        -lane
    } else {
        lane
    }
}

fn surface_connections(network: &RoadNetwork, junction: JunctionId) -> usize {
    match junction {
        JunctionId::Simple(node) => network.incident_surface_roads(node).len(),
        JunctionId::Composite(c) => network.clusters[&c]
            .nodes
            .iter()
            .map(|n| network.incident_surface_roads(*n).len())
            .sum(),
    }
}

fn plain_road_record(
    network: &RoadNetwork,
    id: RoadId,
    element: ElementId,
    road_elements: &BTreeMap<RoadId, ElementId>,
    junction_elements: &BTreeMap<JunctionId, ElementId>,
) -> RoadRecord {
    let road = &network.roads[&id];
    let lane_count = network.lane_count(id);
    let effective_width = if road.oneway == OneWay::Both {
        road.width / 2.0
    } else {
        road.width
    };

    RoadRecord {
        element,
        source: Some(id),
        junction: None,
        geometry: road.center.points().to_vec(),
        length: road.length(),
        speed: road.speed,
        oneway: road.oneway,
        lane_count,
        lane_width: Cubic::constant(effective_width / f64::from(lane_count.start.max(1))),
        center_offset: Cubic::constant(0.0),
        elevation: fit_road_elevation(&road.center, &road.elevation),
        predecessor: end_link(network, road.src_node, id, road_elements, junction_elements),
        successor: end_link(network, road.dst_node, id, road_elements, junction_elements),
    }
}

/// Walks the shared-node incidence list: a junction neighbor links by
/// junction element, a lone road neighbor by its element and contact end.
fn end_link(
    network: &RoadNetwork,
    node: NodeId,
    of: RoadId,
    road_elements: &BTreeMap<RoadId, ElementId>,
    junction_elements: &BTreeMap<JunctionId, ElementId>,
) -> Option<LinkTarget> {
    if let Some(junction) = network.junction_at_node(node) {
        if let Some(element) = junction_elements.get(&junction) {
            return Some(LinkTarget::Junction { element: *element });
        }
    }
    let neighbors: Vec<_> = network
        .incident_surface_roads(node)
        .into_iter()
        .filter(|(r, _)| *r != of)
        .collect();
    if let [(neighbor, end)] = neighbors[..] {
        return Some(LinkTarget::Road {
            element: *road_elements.get(&neighbor)?,
            contact: end.into(),
        });
    }
    None
}
