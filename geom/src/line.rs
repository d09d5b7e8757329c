use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pt::same_pt;
use crate::{Angle, PolyLine, Pt2D, EPSILON_DIST};

/// A line segment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line(Pt2D, Pt2D);

impl Line {
    /// Fails on zero-length segments.
    pub fn new(pt1: Pt2D, pt2: Pt2D) -> Option<Line> {
        if same_pt(pt1, pt2) {
            return None;
        }
        Some(Line(pt1, pt2))
    }

    pub fn must_new(pt1: Pt2D, pt2: Pt2D) -> Line {
        Line::new(pt1, pt2).expect("zero-length line")
    }

    pub fn pt1(&self) -> Pt2D {
        self.0
    }

    pub fn pt2(&self) -> Pt2D {
        self.1
    }

    pub fn length(&self) -> f64 {
        self.pt1().dist_to(self.pt2())
    }

    pub fn angle(&self) -> Angle {
        self.pt1().angle_to(self.pt2())
    }

    pub fn midpoint(&self) -> Pt2D {
        self.dist_along(self.length() / 2.0)
    }

    pub fn reversed(&self) -> Line {
        Line(self.1, self.0)
    }

    pub fn to_polyline(&self) -> PolyLine {
        PolyLine::must_new(vec![self.0, self.1])
    }

    pub fn dist_along(&self, dist: f64) -> Pt2D {
        let len = self.length();
        if dist > len + EPSILON_DIST {
            panic!("cant do {} along a line of length {}", dist, len);
        }
        self.percent_along(dist / len)
    }

    /// Extrapolates past either endpoint.
    pub fn unbounded_dist_along(&self, dist: f64) -> Pt2D {
        self.percent_along(dist / self.length())
    }

    fn percent_along(&self, percent: f64) -> Pt2D {
        Pt2D::new(
            self.pt1().x() + percent * (self.pt2().x() - self.pt1().x()),
            self.pt1().y() + percent * (self.pt2().y() - self.pt1().y()),
        )
    }

    /// Shifts perpendicular; positive widths shift to the right of the
    /// direction of travel.
    pub fn shift_right(&self, width: f64) -> Line {
        let angle = self.angle().rotate_degs(-90.0);
        Line(
            self.pt1().project_away(width, angle),
            self.pt2().project_away(width, angle),
        )
    }

    pub fn shift_left(&self, width: f64) -> Line {
        self.shift_right(-width)
    }

    /// Where the two segments cross, if they do.
    pub fn intersection(&self, other: &Line) -> Option<Pt2D> {
        if !self.intersects(other) {
            return None;
        }
        line_intersection(self, other)
    }

    fn intersects(&self, other: &Line) -> bool {
        // http://bryceboe.com/2006/10/23/line-segment-intersection-algorithm/
        is_counter_clockwise(self.pt1(), other.pt1(), other.pt2())
            != is_counter_clockwise(self.pt2(), other.pt1(), other.pt2())
            && is_counter_clockwise(self.pt1(), self.pt2(), other.pt1())
                != is_counter_clockwise(self.pt1(), self.pt2(), other.pt2())
    }

    pub fn contains_pt(&self, pt: Pt2D) -> bool {
        self.dist_along_of_point(pt).is_some()
    }

    pub fn dist_along_of_point(&self, pt: Pt2D) -> Option<f64> {
        let dist1 = self.pt1().dist_to(pt);
        let dist2 = pt.dist_to(self.pt2());
        if (dist1 + dist2 - self.length()).abs() < EPSILON_DIST {
            Some(dist1)
        } else {
            None
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Line({} to {})", self.0, self.1)
    }
}

/// Treats both segments as infinite lines. `None` when they're parallel.
pub fn line_intersection(l1: &Line, l2: &Line) -> Option<Pt2D> {
    let (x1, y1) = (l1.pt1().x(), l1.pt1().y());
    let (x2, y2) = (l1.pt2().x(), l1.pt2().y());
    let (x3, y3) = (l2.pt1().x(), l2.pt1().y());
    let (x4, y4) = (l2.pt2().x(), l2.pt2().y());

    let denom = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
    if denom.abs() < 1e-9 {
        return None;
    }
    let numer_x = (x1 * y2 - y1 * x2) * (x3 - x4) - (x1 - x2) * (x3 * y4 - y3 * x4);
    let numer_y = (x1 * y2 - y1 * x2) * (y3 - y4) - (y1 - y2) * (x3 * y4 - y3 * x4);
    Some(Pt2D::new(numer_x / denom, numer_y / denom))
}

fn is_counter_clockwise(pt1: Pt2D, pt2: Pt2D, pt3: Pt2D) -> bool {
    (pt3.y() - pt1.y()) * (pt2.x() - pt1.x()) > (pt2.y() - pt1.y()) * (pt3.x() - pt1.x())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_segments_intersect() {
        let l1 = Line::must_new(Pt2D::new(0.0, 0.0), Pt2D::new(10.0, 10.0));
        let l2 = Line::must_new(Pt2D::new(0.0, 10.0), Pt2D::new(10.0, 0.0));
        let hit = l1.intersection(&l2).unwrap();
        assert!(hit.approx_eq(Pt2D::new(5.0, 5.0), 1e-9));
        assert!(l2.intersection(&l1).unwrap().approx_eq(hit, 1e-9));
    }

    #[test]
    fn parallel_lines_never_intersect() {
        let l1 = Line::must_new(Pt2D::new(0.0, 0.0), Pt2D::new(10.0, 0.0));
        let l2 = Line::must_new(Pt2D::new(0.0, 1.0), Pt2D::new(10.0, 1.0));
        assert_eq!(l1.intersection(&l2), None);
        assert_eq!(line_intersection(&l1, &l2), None);
    }

    #[test]
    fn infinite_intersection_past_segment_ends() {
        let l1 = Line::must_new(Pt2D::new(0.0, 0.0), Pt2D::new(1.0, 0.0));
        let l2 = Line::must_new(Pt2D::new(5.0, 5.0), Pt2D::new(5.0, 4.0));
        assert_eq!(l1.intersection(&l2), None);
        let hit = line_intersection(&l1, &l2).unwrap();
        assert!(hit.approx_eq(Pt2D::new(5.0, 0.0), 1e-9));
    }
}
