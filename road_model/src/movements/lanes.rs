//! Lane linkage: which incoming lane feeds which outgoing lane, and the
//! lateral offset parameters the connector needs to land traffic on the
//! linked lanes.

use geom::Cubic;

use crate::movements::{Approach, LaneLink, LinkKind, Movement, MovementKind};
use crate::raw::OneWay;
use crate::RoadNetwork;

/// Same band as the diverge/merge refinement: siblings inside it split an
/// approach's lanes between them.
const BRANCH_MAX_TURN_DEGS: f64 = 45.0;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Alignment {
    Left,
    Right,
}

pub(crate) fn link_lanes(network: &RoadNetwork, movements: &mut [Movement]) {
    for idx in 0..movements.len() {
        let m = &movements[idx];
        let in_total = network.usable_lane_count(m.from.road, m.from.end);
        let out_total = network.usable_lane_count(m.to.road, m.to.end);

        let in_subset = incoming_subset(movements, idx, in_total);
        let out_subset = outgoing_subset(&movements[idx], out_total);
        let m = &movements[idx];

        let links = pair_lanes(
            &in_subset,
            &out_subset,
            network.config.max_junction_lanes as usize,
            kind_bias(m.kind, m).unwrap_or(Alignment::Right),
        );
        let link_kind = if in_total == out_total {
            LinkKind::Constant
        } else if out_total > in_total {
            LinkKind::Increase
        } else {
            LinkKind::Decrease
        };

        let (center_offset, lane_width) = offsets(network, m, in_total, out_total, &links);

        let m = &mut movements[idx];
        m.lane_links = links;
        m.link_kind = link_kind;
        m.center_offset = center_offset;
        m.lane_width = lane_width;
    }
}

/// Lanes this movement may start from. Siblings leaving the same approach
/// inside the branch band split the incoming lanes by delta rank: the most
/// left-leaning heading claims the left-most lanes. Otherwise the movement
/// kind biases toward one side.
fn incoming_subset(movements: &[Movement], idx: usize, in_total: u8) -> Vec<u8> {
    let m = &movements[idx];
    if m.total_delta.abs() < BRANCH_MAX_TURN_DEGS {
        let mut siblings: Vec<(usize, f64)> = movements
            .iter()
            .enumerate()
            .filter(|(_, x)| x.from == m.from && x.total_delta.abs() < BRANCH_MAX_TURN_DEGS)
            .map(|(i, x)| (i, x.total_delta.to_degrees()))
            .collect();
        if siblings.len() >= 2 {
            // Left-most delta first.
            siblings.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
            let rank = siblings.iter().position(|(i, _)| *i == idx).unwrap();
            return partitioned_lanes(in_total, siblings.len(), rank);
        }
    }
    biased_subset(in_total, kind_bias(m.kind, m))
}

fn outgoing_subset(m: &Movement, out_total: u8) -> Vec<u8> {
    biased_subset(out_total, kind_bias(m.kind, m))
}

fn kind_bias(kind: MovementKind, m: &Movement) -> Option<Alignment> {
    match kind {
        MovementKind::LeftTurn | MovementKind::UTurn => Some(Alignment::Left),
        MovementKind::RightTurn => Some(Alignment::Right),
        MovementKind::Compound => {
            // The snakier side decides; fall back to the exit kink.
            let delta = if m.first_delta.valid {
                m.first_delta.angle
            } else {
                m.last_delta.angle
            };
            if delta.to_degrees() > 0.0 {
                Some(Alignment::Left)
            } else {
                Some(Alignment::Right)
            }
        }
        _ => None,
    }
}

/// Lanes are 1-based from the right edge; the left bias takes the upper half,
/// the right bias the lower half, no bias everything. This reproduces the
/// 1/2/4-lane conventions: one lane is always [1], two lanes split [2]/[1],
/// four lanes split [3,4]/[1,2].
fn biased_subset(total: u8, bias: Option<Alignment>) -> Vec<u8> {
    let total = total.max(1);
    let half = total.div_ceil(2);
    match bias {
        Some(Alignment::Left) => (total - half + 1..=total).collect(),
        Some(Alignment::Right) => (1..=half).collect(),
        None => (1..=total).collect(),
    }
}

/// Splits `total` lanes across `count` sibling movements; rank 0 is the
/// left-most sibling and takes the left-most chunk. With more siblings than
/// lanes, the surplus shares the right-most lane.
fn partitioned_lanes(total: u8, count: usize, rank: usize) -> Vec<u8> {
    let total = total.max(1) as usize;
    let base = total / count;
    let remainder = total % count;
    let mut top = total;
    for r in 0..count {
        let share = (base + usize::from(r < remainder)).max(1);
        let bottom = top.saturating_sub(share);
        if r == rank {
            let lo = (bottom + 1).clamp(1, total);
            let hi = top.max(1);
            return (lo as u8..=hi as u8).collect();
        }
        top = bottom.max(1);
    }
    vec![1]
}

/// Pairs off lanes from the side the movement hugs.
fn pair_lanes(
    in_subset: &[u8],
    out_subset: &[u8],
    max_links: usize,
    align: Alignment,
) -> Vec<LaneLink> {
    let n = in_subset.len().min(out_subset.len()).min(max_links);
    if n == 0 {
        return Vec::new();
    }
    match align {
        Alignment::Left => {
            // Take the top n of each, keeping ascending order.
            let from = &in_subset[in_subset.len() - n..];
            let to = &out_subset[out_subset.len() - n..];
            from.iter()
                .zip(to.iter())
                .map(|(f, t)| LaneLink {
                    from_lane: *f,
                    to_lane: *t,
                })
                .collect()
        }
        Alignment::Right => in_subset[..n]
            .iter()
            .zip(out_subset[..n].iter())
            .map(|(f, t)| LaneLink {
                from_lane: *f,
                to_lane: *t,
            })
            .collect(),
    }
}

/// The connector's lateral blend: zero at entry, easing to however far the
/// linked exit lane sits from where the linked entry lane would continue.
/// Roads flagged as developing branch/merge lanes double their side.
fn offsets(
    network: &RoadNetwork,
    m: &Movement,
    in_total: u8,
    out_total: u8,
    links: &[LaneLink],
) -> (Cubic, Cubic) {
    let w_in = per_lane_width(network, m.from);
    let w_out = per_lane_width(network, m.to);
    let lane_width = Cubic::ease(w_in, w_out);

    let Some(first) = links.first() else {
        return (Cubic::constant(0.0), lane_width);
    };

    let f = &network.roads[&m.from.road];
    let t = &network.roads[&m.to.road];
    let mut entry = lane_center_offset(f.oneway, in_total, first.from_lane, w_in);
    let mut exit = lane_center_offset(t.oneway, out_total, first.to_lane, w_out);
    if f.branch == Some(true) || f.merge == Some(true) {
        entry *= 2.0;
    }
    if t.branch == Some(true) || t.merge == Some(true) {
        exit *= 2.0;
    }
    (Cubic::ease(0.0, exit - entry), lane_width)
}

fn per_lane_width(network: &RoadNetwork, approach: Approach) -> f64 {
    let road = &network.roads[&approach.road];
    let effective = if road.oneway == OneWay::Both {
        road.width / 2.0
    } else {
        road.width
    };
    let lanes = network.usable_lane_count(approach.road, approach.end).max(1);
    effective / f64::from(lanes)
}

/// Offset of a lane center from the road centerline, positive leftward.
fn lane_center_offset(oneway: OneWay, total: u8, lane: u8, lane_width: f64) -> f64 {
    let total = f64::from(total.max(1));
    let lane = f64::from(lane);
    if oneway == OneWay::Both {
        // Travel lanes sit on the right half.
        -(total - lane + 0.5) * lane_width
    } else {
        // A one-way road centers its lanes on the centerline.
        ((lane - 0.5) - total / 2.0) * lane_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn biased_subsets_match_lane_conventions() {
        assert_eq!(biased_subset(1, Some(Alignment::Left)), vec![1]);
        assert_eq!(biased_subset(2, Some(Alignment::Left)), vec![2]);
        assert_eq!(biased_subset(2, Some(Alignment::Right)), vec![1]);
        assert_eq!(biased_subset(4, Some(Alignment::Left)), vec![3, 4]);
        assert_eq!(biased_subset(4, Some(Alignment::Right)), vec![1, 2]);
        assert_eq!(biased_subset(3, None), vec![1, 2, 3]);
    }

    #[test]
    fn partition_gives_leftmost_chunk_to_rank_zero() {
        assert_eq!(partitioned_lanes(2, 2, 0), vec![2]);
        assert_eq!(partitioned_lanes(2, 2, 1), vec![1]);
        assert_eq!(partitioned_lanes(4, 2, 0), vec![3, 4]);
        assert_eq!(partitioned_lanes(4, 2, 1), vec![1, 2]);
        // More siblings than lanes: the surplus shares the right-most lane.
        assert_eq!(partitioned_lanes(2, 3, 2), vec![1]);
    }

    #[test]
    fn pairing_is_ascending_and_capped() {
        let links = pair_lanes(&[1, 2], &[1, 2], 2, Alignment::Right);
        assert_eq!(
            links,
            vec![
                LaneLink {
                    from_lane: 1,
                    to_lane: 1
                },
                LaneLink {
                    from_lane: 2,
                    to_lane: 2
                }
            ]
        );
        assert_eq!(pair_lanes(&[1, 2, 3], &[1, 2, 3], 2, Alignment::Left).len(), 2);
    }
}
