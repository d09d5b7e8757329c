//! The read-only lookup service later phases consult, plus the narrow mutable
//! branch/merge tag channel and the speed back-fill fixpoint.

use crate::network::{LaneCount, Road, RoadNetwork};
use crate::raw::OneWay;
use crate::{Event, LaneMode, NodeId, RoadEnd, RoadId};

impl RoadNetwork {
    /// Resolves an id to its record, following merged chains. An id that was
    /// never ingested is a programming error.
    pub fn road(&self, id: RoadId) -> &Road {
        &self.roads[&self.resolve(id)]
    }

    pub fn road_mut(&mut self, id: RoadId) -> &mut Road {
        let id = self.resolve(id);
        self.roads.get_mut(&id).unwrap()
    }

    pub fn resolve(&self, id: RoadId) -> RoadId {
        let mut id = id;
        while let Some(into) = self.absorbed.get(&id) {
            id = *into;
        }
        id
    }

    pub fn is_intersection_internal(&self, id: RoadId) -> bool {
        self.road_to_cluster.contains_key(&id)
    }

    /// All (road, end) pairs touching a node.
    pub fn incident_roads(&self, node: NodeId) -> Vec<(RoadId, RoadEnd)> {
        let mut result = Vec::new();
        for id in &self.nodes[&node].roads {
            let road = &self.roads[id];
            if road.src_node == node {
                result.push((*id, RoadEnd::Start));
            }
            if road.dst_node == node {
                result.push((*id, RoadEnd::End));
            }
        }
        result
    }

    /// Incident roads with intersection-internal links filtered out.
    pub fn incident_surface_roads(&self, node: NodeId) -> Vec<(RoadId, RoadEnd)> {
        self.incident_roads(node)
            .into_iter()
            .filter(|(id, _)| !self.is_intersection_internal(*id))
            .collect()
    }

    pub fn width(&self, id: RoadId) -> f64 {
        self.road(id).width
    }

    pub fn speed(&self, id: RoadId) -> f64 {
        self.road(id).speed
    }

    pub fn elevation(&self, id: RoadId) -> &[(geom::Pt2D, f64)] {
        &self.road(id).elevation
    }

    pub fn lane_count(&self, id: RoadId) -> LaneCount {
        let road = self.road(id);
        match self.config.lane_mode {
            LaneMode::Fixed => LaneCount::uniform(road.lanes.max(1)),
            LaneMode::FromWidth => {
                // A bidirectional road's width covers both directions.
                let effective = if road.oneway == OneWay::Both {
                    road.width / 2.0
                } else {
                    road.width
                };
                let lanes = (effective / self.config.lane_width).round() as i64;
                LaneCount::uniform(lanes.clamp(1, u8::MAX as i64) as u8)
            }
        }
    }

    /// Lanes carrying travel away from the start (the "right" side in a
    /// keep-right frame).
    pub fn right_lane_count(&self, id: RoadId) -> u8 {
        if self.road(id).oneway == OneWay::Backward {
            0
        } else {
            self.lane_count(id).start
        }
    }

    /// Lanes carrying travel toward the start.
    pub fn left_lane_count(&self, id: RoadId) -> u8 {
        match self.road(id).oneway {
            OneWay::Both | OneWay::Backward => self.lane_count(id).start,
            OneWay::Forward => 0,
        }
    }

    /// Lanes usable by traffic crossing a junction at `end` of this road.
    pub fn usable_lane_count(&self, id: RoadId, end: RoadEnd) -> u8 {
        let count = self.lane_count(id);
        match end {
            RoadEnd::Start => count.start,
            RoadEnd::End => count.end,
        }
    }

    /// Roads with an unknown (negative) speed inherit the maximum speed of a
    /// connected predecessor, or failing that a successor, iterated to a
    /// fixpoint. Whatever still has no valid neighbor keeps its value; that's
    /// a data-quality condition, not an error.
    pub fn backfill_speeds(&mut self) {
        loop {
            let mut fixes: Vec<(RoadId, f64)> = Vec::new();
            for road in self.roads.values() {
                if road.speed >= 0.0 {
                    continue;
                }
                let inherited = self
                    .neighbor_speed(road.src_node, road.id)
                    .or_else(|| self.neighbor_speed(road.dst_node, road.id));
                if let Some(speed) = inherited {
                    fixes.push((road.id, speed));
                }
            }
            if fixes.is_empty() {
                break;
            }
            for (id, speed) in fixes {
                self.roads.get_mut(&id).unwrap().speed = speed;
            }
        }

        let unresolved: Vec<RoadId> = self
            .roads
            .values()
            .filter(|r| r.speed < 0.0)
            .map(|r| r.id)
            .collect();
        for id in unresolved {
            self.diagnostics.record(Event::SpeedUnresolved { id });
        }
    }

    fn neighbor_speed(&self, node: NodeId, of: RoadId) -> Option<f64> {
        let mut best: Option<f64> = None;
        for (id, _) in self.incident_roads(node) {
            if id == of {
                continue;
            }
            let speed = self.roads[&id].speed;
            if speed >= 0.0 {
                best = Some(best.map_or(speed, |b: f64| b.max(speed)));
            }
        }
        best
    }
}
