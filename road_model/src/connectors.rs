//! Builds the actual connector geometry for each movement: clothoid-based
//! splices at simple junctions, path splicing through composite ones, lateral
//! offset application, densification, and end trimming.

use geom::{line_intersection, spiral, Angle, Line, PolyLine, Pt2D, EPSILON_DIST};

use crate::elevation::{fit_connector_elevation, project_arclength};
use crate::geometry::turning_point_distance;
use crate::movements::{Movement, RoadEnd};
use crate::network::Road;
use crate::{Event, RoadNetwork};

/// Lead-in control links extend this far out of the junction.
const LEAD_IN_SETBACK: f64 = 20.0;
/// Clothoid radius before rescaling to the chord.
const SPIRAL_RADIUS: f64 = 20.0;
/// Past this, a movement needs the dedicated u-turn splice.
const UTURN_SPLICE_MIN_DEGS: f64 = 170.0;
/// A road bending this much right next to the junction enlarges the delete
/// distance.
const ADJACENT_BEND_DEGS: f64 = 30.0;

/// Synthesizes a connector for every movement that has room for one. The
/// movement stays in the catalogue either way; only its geometry is optional.
pub fn synthesize_connectors(network: &mut RoadNetwork, movements: &mut [Movement]) {
    for m in movements.iter_mut() {
        if let Some(connector) = build_connector(network, m) {
            let f = &network.roads[&m.from.road];
            let t = &network.roads[&m.to.road];
            m.connector_elevation = fit_connector_elevation(
                connector.length(),
                endpoint_z(f, m.from.end),
                endpoint_z(t, m.to.end),
            );
            m.connector = Some(connector);
        }
    }
    let built = movements.iter().filter(|m| m.connector.is_some()).count();
    info!("synthesized {} of {} connectors", built, movements.len());
}

fn build_connector(network: &mut RoadNetwork, m: &Movement) -> Option<PolyLine> {
    let f = &network.roads[&m.from.road];
    let t = &network.roads[&m.to.road];
    let heading_in = f.heading_into(m.from.end);
    let heading_out = t.heading_out_of(m.to.end);

    let base = if m.path.is_empty() {
        simple_splice(m.entry_pt, heading_in, m.exit_pt, heading_out, m.total_delta)
    } else {
        composite_splice(network, m)
    };
    let base = match base.and_then(|pts| PolyLine::new(pts).ok()) {
        Some(pl) => pl,
        None => {
            network.diagnostics.record(Event::DroppedMovement {
                junction: m.junction,
                from: m.from.road,
                to: m.to.road,
                reason: "degenerate connector geometry".to_string(),
            });
            return None;
        }
    };

    // Lateral blend toward the linked exit lane, then densify.
    let densified = base.resample(network.config.densify_interval);
    let last_idx = densified.points().len() - 1;
    let offsets: Vec<f64> = (0..=last_idx)
        .map(|i| {
            // Offsets are positive leftward; shift_by shifts right.
            -m.center_offset.eval(i as f64 / last_idx as f64)
        })
        .collect();
    let shifted = match densified.shift_by(&offsets) {
        Ok(pl) => pl,
        Err(_) => densified,
    };

    // Yield ground where the connector would overlap its roads' own curves.
    let f = &network.roads[&m.from.road];
    let t = &network.roads[&m.to.road];
    let delete_start = delete_distance(f, t, m.first_delta.angle, f, m.from.end);
    let delete_end = delete_distance(f, t, m.last_delta.angle, t, m.to.end);

    let len = shifted.length();
    if len - delete_start - delete_end <= network.config.min_connector_length {
        network.diagnostics.record(Event::DroppedMovement {
            junction: m.junction,
            from: m.from.road,
            to: m.to.road,
            reason: "connector too short after trimming".to_string(),
        });
        return None;
    }
    shifted.exact_slice(delete_start, len - delete_end).ok()
}

/// Turning-point based trim at one connector end, enlarged when the adjacent
/// road bends sharply right at the junction.
fn delete_distance(f: &Road, t: &Road, local_delta: Angle, adjacent: &Road, end: RoadEnd) -> f64 {
    let mut dist = turning_point_distance(f.width, t.width, local_delta).max(0.0);
    if end_bend(adjacent, end).abs() > ADJACENT_BEND_DEGS {
        dist *= 2.0;
    }
    dist
}

/// How much the road's own geometry turns across its last two segments at
/// the given end.
fn end_bend(road: &Road, end: RoadEnd) -> f64 {
    let pts = road.center.points();
    if pts.len() < 3 {
        return 0.0;
    }
    let (a, b, c) = match end {
        RoadEnd::End => (pts[pts.len() - 3], pts[pts.len() - 2], pts[pts.len() - 1]),
        RoadEnd::Start => (pts[2], pts[1], pts[0]),
    };
    a.angle_to(b).delta_to(b.angle_to(c)).to_degrees()
}

/// Connector geometry at a simple junction: one clothoid plus a line for
/// normal turns, a double spiral through a midpoint for tight compound
/// layouts, a dedicated splice for u-turns.
fn simple_splice(
    entry: Pt2D,
    heading_in: Angle,
    exit: Pt2D,
    heading_out: Angle,
    total: Angle,
) -> Option<Vec<Pt2D>> {
    if entry.approx_eq(exit, EPSILON_DIST) {
        return None;
    }

    if total.abs() > UTURN_SPLICE_MIN_DEGS {
        return uturn_splice(entry, heading_in, exit, heading_out, total);
    }

    // The relative layout comes from where the lead-in links cross.
    let lead_in = Line::new(
        entry.project_away(LEAD_IN_SETBACK, heading_in.opposite()),
        entry,
    )?;
    let lead_out = Line::new(exit, exit.project_away(LEAD_IN_SETBACK, heading_out))?;
    let corner = line_intersection(&lead_in, &lead_out);

    let converges = corner
        .map(|pt| {
            // The corner has to sit ahead of the entry and behind the exit.
            let ahead = (pt.x() - entry.x()) * heading_in.cos()
                + (pt.y() - entry.y()) * heading_in.sin();
            let behind = (exit.x() - pt.x()) * heading_out.cos()
                + (exit.y() - pt.y()) * heading_out.sin();
            ahead > 0.0 && behind > 0.0
        })
        .unwrap_or(false);

    if converges {
        turn_splice(entry, heading_in, exit, heading_out, total)
    } else {
        midpoint_splice(entry, heading_in, exit, heading_out)
    }
}

/// Clothoid turning the full delta, rescaled so a straight tail along the
/// exit heading lands exactly on the exit point.
fn turn_splice(
    entry: Pt2D,
    heading_in: Angle,
    exit: Pt2D,
    heading_out: Angle,
    total: Angle,
) -> Option<Vec<Pt2D>> {
    let raw = spiral(entry, heading_in, total, SPIRAL_RADIUS);
    if raw.len() < 2 {
        return Some(vec![entry, exit]);
    }
    let spiral_end = *raw.last().unwrap();

    // Scale the spiral about the entry until its end hits the back-projected
    // exit line.
    let along_spiral = Line::new(entry, spiral_end)?;
    let exit_line = Line::new(exit.project_away(1.0, heading_out.opposite()), exit)?;
    if let Some(scaled_end) = line_intersection(&along_spiral, &exit_line) {
        let ahead = (scaled_end.x() - entry.x()) * (spiral_end.x() - entry.x())
            + (scaled_end.y() - entry.y()) * (spiral_end.y() - entry.y());
        let before_exit = (exit.x() - scaled_end.x()) * heading_out.cos()
            + (exit.y() - scaled_end.y()) * heading_out.sin();
        if ahead > 0.0 && before_exit >= 0.0 {
            let scale = entry.dist_to(scaled_end) / entry.dist_to(spiral_end);
            let mut pts = scale_about(&raw, entry, scale, Angle::ZERO);
            pts.push(exit);
            return Some(pts);
        }
    }

    // The exit sits inside the spiral's reach; map the whole spiral onto the
    // chord instead.
    fit_spiral(entry, heading_in, total, exit)
}

/// Two half-spirals splicing through the midpoint of the chord. Handles the
/// near-parallel layouts where the lead-ins never converge.
fn midpoint_splice(
    entry: Pt2D,
    heading_in: Angle,
    exit: Pt2D,
    heading_out: Angle,
) -> Option<Vec<Pt2D>> {
    let mid = Pt2D::new(
        (entry.x() + exit.x()) / 2.0,
        (entry.y() + exit.y()) / 2.0,
    );
    let chord = entry.angle_to(exit);
    let first = fit_spiral(entry, heading_in, heading_in.delta_to(chord), mid)?;
    let second = fit_spiral(mid, chord, chord.delta_to(heading_out), exit)?;
    let mut pts = first;
    pts.extend(second.into_iter().skip(1));
    Some(pts)
}

/// U-turns splice through an apex pushed forward of the chord midpoint.
fn uturn_splice(
    entry: Pt2D,
    heading_in: Angle,
    exit: Pt2D,
    heading_out: Angle,
    total: Angle,
) -> Option<Vec<Pt2D>> {
    let half_gap = entry.dist_to(exit) / 2.0;
    let apex = Pt2D::new(
        (entry.x() + exit.x()) / 2.0,
        (entry.y() + exit.y()) / 2.0,
    )
    .project_away(half_gap.max(SPIRAL_RADIUS / 2.0), heading_in);
    let half = Angle::degrees(total.to_degrees() / 2.0);
    let apex_heading = heading_in.rotate_degs(half.to_degrees());
    let first = fit_spiral(entry, heading_in, half, apex)?;
    let second = fit_spiral(apex, apex_heading, apex_heading.delta_to(heading_out), exit)?;
    let mut pts = first;
    pts.extend(second.into_iter().skip(1));
    Some(pts)
}

/// Generates a fixed-radius clothoid, then maps it by similarity (rotate and
/// scale about the start) so it ends exactly on `target`.
fn fit_spiral(start: Pt2D, heading: Angle, delta: Angle, target: Pt2D) -> Option<Vec<Pt2D>> {
    if start.approx_eq(target, EPSILON_DIST) {
        return None;
    }
    let raw = spiral(start, heading, delta, SPIRAL_RADIUS);
    if raw.len() < 2 {
        return Some(vec![start, target]);
    }
    let raw_end = *raw.last().unwrap();
    if start.approx_eq(raw_end, EPSILON_DIST) {
        return None;
    }
    let scale = start.dist_to(target) / start.dist_to(raw_end);
    let rotation = start.angle_to(raw_end).delta_to(start.angle_to(target));
    Some(scale_about(&raw, start, scale, rotation))
}

fn scale_about(pts: &[Pt2D], origin: Pt2D, scale: f64, rotation: Angle) -> Vec<Pt2D> {
    let (sin, cos) = rotation.to_radians().sin_cos();
    pts.iter()
        .map(|pt| {
            let dx = (pt.x() - origin.x()) * scale;
            let dy = (pt.y() - origin.y()) * scale;
            Pt2D::new(
                origin.x() + dx * cos - dy * sin,
                origin.y() + dx * sin + dy * cos,
            )
        })
        .collect()
}

/// Splices the internal links of a composite path into one run of points,
/// bridging the trim gaps between them.
fn composite_splice(network: &RoadNetwork, m: &Movement) -> Option<Vec<Pt2D>> {
    let mut pts = vec![m.entry_pt];
    for step in &m.path {
        let road = &network.roads[&step.road];
        let oriented = road.center_leaving(road.end_at(step.from_node)?);
        pts.extend(oriented.into_points());
    }
    pts.push(m.exit_pt);
    Some(pts)
}

/// Height at one end of a road, from the sample nearest that end.
fn endpoint_z(road: &Road, end: RoadEnd) -> f64 {
    if road.elevation.is_empty() {
        return 0.0;
    }
    let target = match end {
        RoadEnd::Start => 0.0,
        RoadEnd::End => road.center.length(),
    };
    road.elevation
        .iter()
        .map(|(pt, z)| (project_arclength(&road.center, *pt), *z))
        .min_by(|a, b| {
            (a.0 - target)
                .abs()
                .partial_cmp(&(b.0 - target).abs())
                .unwrap()
        })
        .map(|(_, z)| z)
        .unwrap_or(0.0)
}
