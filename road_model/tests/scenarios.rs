//! End-to-end scenarios over small hand-built networks: build the graph, run
//! movement classification, synthesize connectors, assemble the catalogue.

use geom::LonLat;
use road_model::catalogue::{assemble, LinkTarget};
use road_model::connectors::synthesize_connectors;
use road_model::movements::generate_movements;
use road_model::raw::{OneWay, RawNetwork, RawRoad};
use road_model::{
    Event, LaneLink, Movement, MovementKind, NetworkConfig, NodeRole, RoadId, RoadNetwork,
};

/// Meters per degree at the test origin (on the equator).
const M: f64 = 111_319.49;

fn ll(x: f64, y: f64) -> LonLat {
    LonLat::new(x / M, y / M)
}

fn road(
    id: i64,
    pts: &[(f64, f64)],
    oneway: OneWay,
    lanes: u8,
    width: f64,
    speed: f64,
) -> RawRoad {
    RawRoad {
        id: RoadId(id),
        points: pts.iter().map(|(x, y)| ll(*x, *y)).collect(),
        elevation: vec![0.0; pts.len()],
        oneway,
        lanes,
        width,
        speed,
        highway: false,
    }
}

fn build(roads: Vec<RawRoad>) -> RoadNetwork {
    RoadNetwork::build(
        &RawNetwork {
            roads,
            origin: LonLat::new(0.0, 0.0),
        },
        NetworkConfig::default(),
    )
    .unwrap()
}

fn movement<'a>(movements: &'a [Movement], from: i64, to: i64) -> Option<&'a Movement> {
    movements
        .iter()
        .find(|m| m.from.road == RoadId(from) && m.to.road == RoadId(to))
}

#[test]
fn straight_through_movement_links_lanes_constantly() {
    // Two one-way roads meeting head-on with opposite codings: traffic flows
    // west to east straight through. The codes differ, so the pair can't
    // merge, but the through movement still gets lane linkage.
    let mut network = build(vec![
        road(1, &[(-100.0, 0.0), (0.0, 0.0)], OneWay::Forward, 2, 6.0, 50.0),
        road(2, &[(100.0, 0.0), (0.0, 0.0)], OneWay::Backward, 2, 6.0, 50.0),
    ]);
    assert_eq!(network.roads.len(), 2);

    let movements = generate_movements(&mut network);
    assert_eq!(movements.len(), 1);
    let m = movement(&movements, 1, 2).unwrap();
    assert_eq!(m.kind, MovementKind::Straight);
    assert_eq!(
        m.lane_links,
        vec![
            LaneLink {
                from_lane: 1,
                to_lane: 1
            },
            LaneLink {
                from_lane: 2,
                to_lane: 2
            },
        ]
    );
    // Symmetric approach: no lateral drift.
    assert!(m.center_offset.eval(0.0).abs() < 1e-9);
    assert!(m.center_offset.eval(0.5).abs() < 1e-9);
    assert!(m.center_offset.eval(1.0).abs() < 1e-9);
}

#[test]
fn two_lane_approach_splitting_is_a_diverge() {
    // One 2-lane incoming road splits into two 1-lane branches at +30/-30
    // degrees. Both movements classify as diverge, and the left branch takes
    // the left (higher-index) incoming lane.
    let mut network = build(vec![
        road(1, &[(-100.0, 0.0), (0.0, 0.0)], OneWay::Forward, 2, 7.0, 50.0),
        road(2, &[(0.0, 0.0), (86.6, 50.0)], OneWay::Forward, 1, 3.5, 50.0),
        road(3, &[(0.0, 0.0), (86.6, -50.0)], OneWay::Forward, 1, 3.5, 50.0),
    ]);
    let movements = generate_movements(&mut network);
    assert_eq!(movements.len(), 2);

    let left = movement(&movements, 1, 2).unwrap();
    let right = movement(&movements, 1, 3).unwrap();
    assert_eq!(left.kind, MovementKind::Diverge);
    assert_eq!(right.kind, MovementKind::Diverge);
    assert_eq!(left.lane_links.len(), 1);
    assert_eq!(right.lane_links.len(), 1);
    // Left-leaning heading claims the left lane.
    assert_eq!(left.lane_links[0].from_lane, 2);
    assert_eq!(right.lane_links[0].from_lane, 1);
}

/// An H-shaped layout: two long vertical roads tied together by a short bar.
fn h_network(bar_oneway: OneWay) -> RoadNetwork {
    build(vec![
        road(1, &[(0.0, -100.0), (0.0, 0.0)], OneWay::Both, 2, 6.0, 50.0),
        road(2, &[(0.0, 0.0), (0.0, 100.0)], OneWay::Both, 2, 6.0, 50.0),
        road(3, &[(15.0, -100.0), (15.0, 0.0)], OneWay::Both, 2, 6.0, 50.0),
        road(4, &[(15.0, 0.0), (15.0, 100.0)], OneWay::Both, 2, 6.0, 50.0),
        road(10, &[(0.0, 0.0), (15.0, 0.0)], bar_oneway, 1, 6.0, 50.0),
    ])
}

#[test]
fn short_link_between_junctions_becomes_composite_interior() {
    let mut network = h_network(OneWay::Both);
    assert_eq!(network.clusters.len(), 1);
    assert!(network.is_intersection_internal(RoadId(10)));

    let mut movements = generate_movements(&mut network);
    // Crossing the bar produces movements whose path runs through it.
    let across = movement(&movements, 1, 4).unwrap();
    assert_eq!(across.path.len(), 1);
    assert_eq!(across.path[0].road, RoadId(10));

    synthesize_connectors(&mut network, &mut movements);
    let catalogue = assemble(&network, &movements);
    // The bar is intersection interior; it never becomes a Road element.
    assert!(catalogue
        .roads
        .iter()
        .all(|r| r.source != Some(RoadId(10))));
}

#[test]
fn unreachable_pair_inside_composite_is_discarded_gracefully() {
    // The bar only flows west-to-east, so east-side approaches can't reach
    // west-side exits. Those movements vanish with a diagnostic; the rest of
    // the junction still processes.
    let mut network = h_network(OneWay::Forward);
    assert_eq!(network.clusters.len(), 1);

    let movements = generate_movements(&mut network);
    assert!(movement(&movements, 1, 4).is_some());
    assert!(movement(&movements, 3, 2).is_none());
    assert!(network
        .diagnostics
        .events()
        .iter()
        .any(|e| matches!(e, Event::UnreachableMovement { .. })));
}

#[test]
fn near_reversal_is_always_a_uturn() {
    let mut network = build(vec![
        road(1, &[(-100.0, 0.0), (0.0, 0.0)], OneWay::Forward, 2, 0.5, 50.0),
        road(2, &[(0.0, 0.0), (-100.0, 10.0)], OneWay::Forward, 1, 0.5, 50.0),
        road(3, &[(0.0, 0.0), (100.0, 0.0)], OneWay::Forward, 1, 0.5, 50.0),
    ]);
    let movements = generate_movements(&mut network);
    let back = movement(&movements, 1, 2).unwrap();
    assert!(back.total_delta.abs() > 170.0);
    assert_eq!(back.kind, MovementKind::UTurn);
    assert_eq!(movement(&movements, 1, 3).unwrap().kind, MovementKind::Straight);
}

#[test]
fn unknown_speed_inherits_from_its_predecessor() {
    let network = build(vec![
        road(1, &[(-100.0, 0.0), (0.0, 0.0)], OneWay::Forward, 2, 6.0, 80.0),
        road(2, &[(0.0, 0.0), (100.0, 0.0)], OneWay::Backward, 2, 6.0, -1.0),
    ]);
    assert_eq!(network.speed(RoadId(2)), 80.0);
    assert!(!network
        .diagnostics
        .events()
        .iter()
        .any(|e| matches!(e, Event::SpeedUnresolved { .. })));
}

#[test]
fn speed_backfill_without_neighbors_reports_and_keeps_value() {
    let network = build(vec![road(
        1,
        &[(0.0, 0.0), (100.0, 0.0)],
        OneWay::Both,
        2,
        6.0,
        -1.0,
    )]);
    assert_eq!(network.speed(RoadId(1)), -1.0);
    assert!(network
        .diagnostics
        .events()
        .iter()
        .any(|e| matches!(e, Event::SpeedUnresolved { id } if *id == RoadId(1))));
}

#[test]
fn connect_chains_fuse_transitively() {
    let network = build(vec![
        road(1, &[(0.0, 0.0), (100.0, 0.0)], OneWay::Forward, 2, 6.0, 50.0),
        road(2, &[(100.0, 0.0), (200.0, 0.0)], OneWay::Forward, 2, 6.0, 50.0),
        road(3, &[(200.0, 0.0), (300.0, 0.0)], OneWay::Forward, 2, 6.0, 50.0),
    ]);
    assert_eq!(network.roads.len(), 1);
    let merged = network.road(RoadId(3));
    assert_eq!(merged.id, RoadId(1));
    assert!((merged.length() - 300.0).abs() < 0.1);
    assert_eq!(merged.oneway, OneWay::Forward);
    // All three ids resolve to the surviving chain.
    assert_eq!(network.resolve(RoadId(2)), RoadId(1));
}

#[test]
fn head_to_head_oneways_fuse_bidirectional() {
    // The second road gets reversed during fusion, flipping its code; the
    // oriented codes then disagree, so the chain is passable both ways.
    let network = build(vec![
        road(1, &[(0.0, 0.0), (100.0, 0.0)], OneWay::Forward, 2, 6.0, 50.0),
        road(2, &[(200.0, 0.0), (100.0, 0.0)], OneWay::Forward, 2, 6.0, 50.0),
    ]);
    assert_eq!(network.roads.len(), 1);
    assert_eq!(network.road(RoadId(2)).oneway, OneWay::Both);
}

#[test]
fn node_roles_follow_incident_end_counts() {
    let network = build(vec![
        road(1, &[(-100.0, 0.0), (0.0, 0.0)], OneWay::Forward, 2, 6.0, 50.0),
        road(2, &[(0.0, 0.0), (100.0, 0.0)], OneWay::Backward, 2, 6.0, 50.0),
        road(3, &[(0.0, 0.0), (0.0, 100.0)], OneWay::Both, 2, 6.0, 50.0),
    ]);
    let roles: Vec<NodeRole> = network.nodes.values().map(|n| n.role).collect();
    // The shared node has 3 ends; every other endpoint dangles.
    assert_eq!(
        roles.iter().filter(|r| **r == NodeRole::Junction).count(),
        1
    );
    assert_eq!(
        roles.iter().filter(|r| **r == NodeRole::Isolated).count(),
        3
    );
}

#[test]
fn catalogue_numbers_elements_densely() {
    let mut network = build(vec![
        road(1, &[(-100.0, 0.0), (0.0, 0.0)], OneWay::Forward, 2, 7.0, 50.0),
        road(2, &[(0.0, 0.0), (86.6, 50.0)], OneWay::Forward, 1, 3.5, 50.0),
        road(3, &[(0.0, 0.0), (86.6, -50.0)], OneWay::Forward, 1, 3.5, 50.0),
    ]);
    let mut movements = generate_movements(&mut network);
    synthesize_connectors(&mut network, &mut movements);
    let catalogue = assemble(&network, &movements);

    let mut elements: Vec<u32> = catalogue.roads.iter().map(|r| r.element.0).collect();
    elements.extend(catalogue.junctions.iter().map(|j| j.element.0));
    elements.sort_unstable();
    let expected: Vec<u32> = (1..=elements.len() as u32).collect();
    assert_eq!(elements, expected);

    // Plain roads come first, then the junction, then its connectors.
    let junction = &catalogue.junctions[0];
    for r in &catalogue.roads {
        match r.source {
            Some(_) => assert!(r.element.0 < junction.element.0),
            None => assert!(r.element.0 > junction.element.0),
        }
    }

    // Connector records link back to their roads, and the junction's lane
    // links carry signed indices.
    for conn in &junction.connections {
        assert!(!conn.lane_links.is_empty());
        for (from_lane, to_lane) in &conn.lane_links {
            assert!(*from_lane < 0);
            assert!(*to_lane < 0);
        }
    }
    let connector = catalogue.roads.iter().find(|r| r.source.is_none()).unwrap();
    assert!(matches!(
        connector.predecessor,
        Some(LinkTarget::Road { .. })
    ));
    assert!(matches!(connector.successor, Some(LinkTarget::Road { .. })));
    assert_eq!(connector.junction, Some(junction.element));
}

#[test]
fn plain_roads_link_through_junctions_and_neighbors() {
    let mut network = build(vec![
        road(1, &[(-100.0, 0.0), (0.0, 0.0)], OneWay::Forward, 2, 7.0, 50.0),
        road(2, &[(0.0, 0.0), (86.6, 50.0)], OneWay::Forward, 1, 3.5, 50.0),
        road(3, &[(0.0, 0.0), (86.6, -50.0)], OneWay::Forward, 1, 3.5, 50.0),
    ]);
    let mut movements = generate_movements(&mut network);
    synthesize_connectors(&mut network, &mut movements);
    let catalogue = assemble(&network, &movements);

    let incoming = catalogue
        .roads
        .iter()
        .find(|r| r.source == Some(RoadId(1)))
        .unwrap();
    // Its far end dangles, its near end touches the junction.
    assert!(incoming.predecessor.is_none());
    assert!(matches!(
        incoming.successor,
        Some(LinkTarget::Junction { .. })
    ));
}
