//! Movement type classification. The angle thresholds are calibrated against
//! survey data; treat them as configuration with these defaults, not as
//! values to tune by eye.

use crate::movements::{perpendicular_offset, LocalDelta, Movement, MovementKind};
use crate::RoadNetwork;

/// Movements turning less than this are straight-ish.
const STRAIGHT_MAX_TURN_DEGS: f64 = 20.0;
/// Movements turning more than this are u-turns, no matter what the lanes
/// say.
const UTURN_MIN_TURN_DEGS: f64 = 170.0;
/// Diverge/merge refinement only considers movements inside this band.
const BRANCH_MAX_TURN_DEGS: f64 = 45.0;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

fn variation(delta: LocalDelta) -> Option<Side> {
    if !delta.valid {
        None
    } else if delta.angle.to_degrees() > 0.0 {
        Some(Side::Left)
    } else {
        Some(Side::Right)
    }
}

pub(crate) fn classify_all(network: &RoadNetwork, movements: &mut [Movement]) {
    // Classify against the unmodified candidate list; a movement's type never
    // depends on what its siblings were labeled.
    let kinds: Vec<MovementKind> = (0..movements.len())
        .map(|i| classify_one(network, i, movements))
        .collect();
    for (m, kind) in movements.iter_mut().zip(kinds) {
        m.kind = kind;
    }
}

fn classify_one(network: &RoadNetwork, idx: usize, all: &[Movement]) -> MovementKind {
    let m = &all[idx];
    let total = m.total_delta;

    if total.abs() > UTURN_MIN_TURN_DEGS {
        return MovementKind::UTurn;
    }

    // A pronounced kink one way at entry and the other way at exit means the
    // movement snakes through; lane indices get resolved by the compound
    // sub-rules instead.
    if let (Some(first), Some(last)) = (variation(m.first_delta), variation(m.last_delta)) {
        if first != last {
            return MovementKind::Compound;
        }
    }

    let in_lanes = network.usable_lane_count(m.from.road, m.from.end);
    let out_lanes = network.usable_lane_count(m.to.road, m.to.end);

    if total.abs() < BRANCH_MAX_TURN_DEGS {
        // An approach splitting across several narrower outgoing roads is a
        // diverge, provided the branches together soak up the incoming lanes.
        let (out_count, out_lane_sum) = sibling_stats(all, |x| x.from == m.from, |x| {
            network.usable_lane_count(x.to.road, x.to.end)
        });
        if out_count >= 2 && out_lanes < in_lanes && out_lane_sum >= in_lanes as u32 {
            return MovementKind::Diverge;
        }

        let (in_count, in_lane_sum) = sibling_stats(all, |x| x.to == m.to, |x| {
            network.usable_lane_count(x.from.road, x.from.end)
        });
        if in_count >= 2 && in_lanes < out_lanes && in_lane_sum >= out_lanes as u32 {
            return MovementKind::Merge;
        }
    }

    if total.abs() < STRAIGHT_MAX_TURN_DEGS {
        // Side-by-side carriageways drifting along each other never actually
        // cross; their connector is a lateral blend, not a turn.
        let f = &network.roads[&m.from.road];
        let t = &network.roads[&m.to.road];
        if !m.first_delta.valid
            && !m.last_delta.valid
            && perpendicular_offset(m.entry_pt, f.heading_into(m.from.end), m.exit_pt)
                > (f.width + t.width) / 2.0
        {
            return MovementKind::Parallel;
        }
        return MovementKind::Straight;
    }

    if total.to_degrees() > 0.0 {
        MovementKind::LeftTurn
    } else {
        MovementKind::RightTurn
    }
}

/// Count and summed lane count of the sibling movements selected by `filter`,
/// restricted to the diverge/merge band.
fn sibling_stats(
    all: &[Movement],
    filter: impl Fn(&Movement) -> bool,
    lanes_of: impl Fn(&Movement) -> u8,
) -> (usize, u32) {
    let mut count = 0;
    let mut lane_sum: u32 = 0;
    for x in all {
        if filter(x) && x.total_delta.abs() < BRANCH_MAX_TURN_DEGS {
            count += 1;
            lane_sum += lanes_of(x) as u32;
        }
    }
    (count, lane_sum)
}
