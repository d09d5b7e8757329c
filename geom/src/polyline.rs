use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::pt::same_pt;
use crate::{line_intersection, Angle, Line, Pt2D, EPSILON_DIST};

/// An ordered sequence of at least two distinct points, with cached length.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolyLine {
    pts: Vec<Pt2D>,
    length: f64,
}

impl PolyLine {
    /// Deduplicates adjacent points. Fails with fewer than two distinct
    /// points.
    pub fn new(pts: Vec<Pt2D>) -> Result<PolyLine> {
        let pts = dedupe_adjacent(pts);
        if pts.len() < 2 {
            bail!("PolyLine needs at least 2 distinct points");
        }
        let length = pts.windows(2).map(|pair| pair[0].dist_to(pair[1])).sum();
        Ok(PolyLine { pts, length })
    }

    pub fn must_new(pts: Vec<Pt2D>) -> PolyLine {
        PolyLine::new(pts).unwrap()
    }

    pub fn points(&self) -> &[Pt2D] {
        &self.pts
    }

    pub fn into_points(self) -> Vec<Pt2D> {
        self.pts
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn first_pt(&self) -> Pt2D {
        self.pts[0]
    }

    pub fn last_pt(&self) -> Pt2D {
        *self.pts.last().unwrap()
    }

    pub fn first_line(&self) -> Line {
        Line::must_new(self.pts[0], self.pts[1])
    }

    pub fn last_line(&self) -> Line {
        Line::must_new(self.pts[self.pts.len() - 2], self.pts[self.pts.len() - 1])
    }

    pub fn lines(&self) -> Vec<Line> {
        self.pts
            .windows(2)
            .map(|pair| Line::must_new(pair[0], pair[1]))
            .collect()
    }

    pub fn reversed(&self) -> PolyLine {
        let mut pts = self.pts.clone();
        pts.reverse();
        PolyLine::must_new(pts)
    }

    /// Glues another polyline onto the end; the seam point must match.
    pub fn extend(self, other: PolyLine) -> Result<PolyLine> {
        if !same_pt(self.last_pt(), other.first_pt()) {
            bail!(
                "can't extend; endpoints {} and {} don't match",
                self.last_pt(),
                other.first_pt()
            );
        }
        let mut pts = self.pts;
        pts.extend(other.pts.into_iter().skip(1));
        PolyLine::new(pts)
    }

    /// The point and local heading at `dist` meters along.
    pub fn dist_along(&self, dist: f64) -> Result<(Pt2D, Angle)> {
        if dist < -EPSILON_DIST || dist > self.length + EPSILON_DIST {
            bail!("dist_along {} outside [0, {}]", dist, self.length);
        }
        let mut dist_left = dist.max(0.0);
        let lines = self.lines();
        for (idx, line) in lines.iter().enumerate() {
            let len = line.length();
            let last = idx == lines.len() - 1;
            if dist_left <= len || last {
                return Ok((line.dist_along(dist_left.min(len)), line.angle()));
            }
            dist_left -= len;
        }
        unreachable!()
    }

    pub fn must_dist_along(&self, dist: f64) -> (Pt2D, Angle) {
        self.dist_along(dist).unwrap()
    }

    pub fn middle(&self) -> Pt2D {
        self.must_dist_along(self.length / 2.0).0
    }

    /// The sub-polyline covering `[start, end]` meters along.
    pub fn exact_slice(&self, start: f64, end: f64) -> Result<PolyLine> {
        if start < -EPSILON_DIST || end > self.length + EPSILON_DIST || start + EPSILON_DIST >= end
        {
            bail!("bad slice [{}, {}] of length {}", start, end, self.length);
        }
        let start = start.max(0.0);
        let end = end.min(self.length);

        let mut result: Vec<Pt2D> = vec![self.must_dist_along(start).0];
        let mut dist_so_far = 0.0;
        for line in self.lines() {
            let len = line.length();
            if dist_so_far + len >= end {
                result.push(self.must_dist_along(end).0);
                break;
            }
            if dist_so_far + len > start {
                result.push(line.pt2());
            }
            dist_so_far += len;
        }
        PolyLine::new(result)
    }

    /// Resamples at a fixed spacing, always keeping both endpoints. Bounds
    /// point density; the result never has adjacent points farther apart than
    /// `interval`.
    pub fn resample(&self, interval: f64) -> PolyLine {
        assert!(interval > EPSILON_DIST);
        let steps = (self.length / interval).ceil() as usize;
        if steps <= 1 {
            return PolyLine::must_new(vec![self.first_pt(), self.last_pt()]);
        }
        let step = self.length / (steps as f64);
        let mut pts = Vec::with_capacity(steps + 1);
        for i in 0..steps {
            pts.push(self.must_dist_along(step * (i as f64)).0);
        }
        pts.push(self.last_pt());
        PolyLine::must_new(pts)
    }

    /// Shifts perpendicular; positive widths shift to the right of the
    /// direction of travel. Joins corners by intersecting the two shifted
    /// segments, falling back to the raw offset when they're parallel.
    pub fn shift_right(&self, width: f64) -> Result<PolyLine> {
        PolyLine::new(self.shift_with_sharp_angles(width))
    }

    pub fn shift_left(&self, width: f64) -> Result<PolyLine> {
        self.shift_right(-width)
    }

    fn shift_with_sharp_angles(&self, width: f64) -> Vec<Pt2D> {
        if self.pts.len() == 2 {
            let l = self.first_line().shift_right(width);
            return vec![l.pt1(), l.pt2()];
        }

        let mut result: Vec<Pt2D> = Vec::new();
        for idx in 2..self.pts.len() {
            let l1 = Line::must_new(self.pts[idx - 2], self.pts[idx - 1]).shift_right(width);
            let l2 = Line::must_new(self.pts[idx - 1], self.pts[idx]).shift_right(width);
            // Parallel segments mean the shifted corner collapses to one point.
            let corner = line_intersection(&l1, &l2).unwrap_or_else(|| l1.pt2());

            if idx == 2 {
                result.push(l1.pt1());
            }
            result.push(corner);
            if idx == self.pts.len() - 1 {
                result.push(l2.pt2());
            }
        }
        result
    }

    /// Shifts each point perpendicular to its local heading by its own offset.
    /// Positive offsets shift right. `offsets` must match the point count.
    pub fn shift_by(&self, offsets: &[f64]) -> Result<PolyLine> {
        if offsets.len() != self.pts.len() {
            bail!(
                "shift_by got {} offsets for {} points",
                offsets.len(),
                self.pts.len()
            );
        }
        let mut pts = Vec::with_capacity(self.pts.len());
        for (idx, (pt, offset)) in self.pts.iter().zip(offsets.iter()).enumerate() {
            let heading = self.heading_at_index(idx);
            pts.push(pt.project_away(*offset, heading.rotate_degs(-90.0)));
        }
        PolyLine::new(pts)
    }

    fn heading_at_index(&self, idx: usize) -> Angle {
        if idx == 0 {
            self.first_line().angle()
        } else if idx == self.pts.len() - 1 {
            self.last_line().angle()
        } else {
            // Average the two adjacent segment headings.
            let before = self.pts[idx - 1].angle_to(self.pts[idx]);
            let after = self.pts[idx].angle_to(self.pts[idx + 1]);
            before.rotate_degs(before.delta_to(after).to_degrees() / 2.0)
        }
    }

    /// Arclength of the closest point, if `pt` lies on the polyline.
    pub fn dist_along_of_point(&self, pt: Pt2D) -> Option<(f64, Angle)> {
        let mut dist_along = 0.0;
        for line in self.lines() {
            if let Some(dist) = line.dist_along_of_point(pt) {
                return Some((dist_along + dist, line.angle()));
            }
            dist_along += line.length();
        }
        None
    }
}

impl fmt::Display for PolyLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PolyLine({} pts, length {})", self.pts.len(), self.length)
    }
}

fn dedupe_adjacent(pts: Vec<Pt2D>) -> Vec<Pt2D> {
    let mut result: Vec<Pt2D> = Vec::with_capacity(pts.len());
    for pt in pts {
        if let Some(last) = result.last() {
            if same_pt(*last, pt) {
                continue;
            }
        }
        result.push(pt);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn right_angle() -> PolyLine {
        PolyLine::must_new(vec![
            Pt2D::new(0.0, 0.0),
            Pt2D::new(10.0, 0.0),
            Pt2D::new(10.0, 10.0),
        ])
    }

    #[test]
    fn length_and_dist_along() {
        let pl = right_angle();
        assert_eq!(pl.length(), 20.0);
        let (pt, angle) = pl.must_dist_along(5.0);
        assert!(pt.approx_eq(Pt2D::new(5.0, 0.0), 1e-9));
        assert!(angle.approx_eq(Angle::degrees(0.0), 1e-9));
        let (pt, angle) = pl.must_dist_along(15.0);
        assert!(pt.approx_eq(Pt2D::new(10.0, 5.0), 1e-9));
        assert!(angle.approx_eq(Angle::degrees(90.0), 1e-9));
    }

    #[test]
    fn exact_slice_crosses_vertices() {
        let pl = right_angle();
        let slice = pl.exact_slice(5.0, 15.0).unwrap();
        assert_eq!(
            slice.points(),
            &[
                Pt2D::new(5.0, 0.0),
                Pt2D::new(10.0, 0.0),
                Pt2D::new(10.0, 5.0)
            ]
        );
        assert!((slice.length() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn resample_keeps_endpoints_and_bounds_spacing() {
        let pl = PolyLine::must_new(vec![Pt2D::new(0.0, 0.0), Pt2D::new(100.0, 0.0)]);
        let resampled = pl.resample(30.0);
        assert_eq!(resampled.first_pt(), pl.first_pt());
        assert_eq!(resampled.last_pt(), pl.last_pt());
        for pair in resampled.points().windows(2) {
            assert!(pair[0].dist_to(pair[1]) <= 30.0 + 1e-9);
        }
        // Short lines degrade to their endpoints.
        let short = PolyLine::must_new(vec![
            Pt2D::new(0.0, 0.0),
            Pt2D::new(1.0, 0.1),
            Pt2D::new(2.0, 0.0),
        ]);
        assert_eq!(short.resample(25.0).points().len(), 2);
    }

    #[test]
    fn shift_right_preserves_point_count() {
        let pl = right_angle();
        let shifted = pl.shift_right(2.0).unwrap();
        assert_eq!(shifted.points().len(), pl.points().len());
        // Rightward of east is south; rightward of north is east.
        assert!(shifted.first_pt().approx_eq(Pt2D::new(0.0, -2.0), 1e-9));
        assert!(shifted.last_pt().approx_eq(Pt2D::new(12.0, 10.0), 1e-9));
    }

    #[test]
    fn extend_requires_matching_seam() {
        let a = PolyLine::must_new(vec![Pt2D::new(0.0, 0.0), Pt2D::new(5.0, 0.0)]);
        let b = PolyLine::must_new(vec![Pt2D::new(5.0, 0.0), Pt2D::new(9.0, 3.0)]);
        let joined = a.clone().extend(b).unwrap();
        assert_eq!(joined.points().len(), 3);
        let c = PolyLine::must_new(vec![Pt2D::new(50.0, 0.0), Pt2D::new(60.0, 0.0)]);
        assert!(a.extend(c).is_err());
    }
}
