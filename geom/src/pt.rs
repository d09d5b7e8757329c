use std::fmt;

use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::{Angle, EPSILON_DIST};

/// A point in the local planar frame, in meters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pt2D {
    x: f64,
    y: f64,
}

impl Pt2D {
    pub fn new(x: f64, y: f64) -> Pt2D {
        if !x.is_finite() || !y.is_finite() {
            panic!("Bad Pt2D {}, {}", x, y);
        }
        Pt2D { x, y }
    }

    pub fn x(self) -> f64 {
        self.x
    }

    pub fn y(self) -> f64 {
        self.y
    }

    pub fn dist_to(self, to: Pt2D) -> f64 {
        ((self.x - to.x).powi(2) + (self.y - to.y).powi(2)).sqrt()
    }

    pub fn angle_to(self, to: Pt2D) -> Angle {
        Angle::radians((to.y - self.y).atan2(to.x - self.x))
    }

    pub fn project_away(self, dist: f64, theta: Angle) -> Pt2D {
        let (sin, cos) = theta.to_radians().sin_cos();
        Pt2D::new(self.x + dist * cos, self.y + dist * sin)
    }

    pub fn offset(self, dx: f64, dy: f64) -> Pt2D {
        Pt2D::new(self.x + dx, self.y + dy)
    }

    pub fn approx_eq(self, other: Pt2D, threshold: f64) -> bool {
        self.dist_to(other) < threshold
    }

    /// The exact-coordinate key used for endpoint deduplication.
    pub fn to_hashable(self) -> HashablePt2D {
        HashablePt2D {
            x: NotNan::new(self.x).unwrap(),
            y: NotNan::new(self.y).unwrap(),
        }
    }

    pub fn center(pts: &[Pt2D]) -> Pt2D {
        assert!(!pts.is_empty());
        let mut x = 0.0;
        let mut y = 0.0;
        for pt in pts {
            x += pt.x;
            y += pt.y;
        }
        let len = pts.len() as f64;
        Pt2D::new(x / len, y / len)
    }
}

impl fmt::Display for Pt2D {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pt2D({}, {})", self.x, self.y)
    }
}

/// An exact-equality, hashable form of `Pt2D`, used as a map key when
/// deduplicating endpoints.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct HashablePt2D {
    x: NotNan<f64>,
    y: NotNan<f64>,
}

impl HashablePt2D {
    pub fn to_pt2d(self) -> Pt2D {
        Pt2D::new(self.x.into_inner(), self.y.into_inner())
    }
}

impl From<Pt2D> for HashablePt2D {
    fn from(pt: Pt2D) -> Self {
        pt.to_hashable()
    }
}

/// True when two points are within `EPSILON_DIST` of each other.
pub(crate) fn same_pt(a: Pt2D, b: Pt2D) -> bool {
    a.approx_eq(b, EPSILON_DIST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_to_cardinal_directions() {
        let origin = Pt2D::new(0.0, 0.0);
        let check = |pt: Pt2D, degs: f64| {
            assert!(origin.angle_to(pt).approx_eq(Angle::degrees(degs), 1e-9));
        };
        check(Pt2D::new(5.0, 0.0), 0.0);
        check(Pt2D::new(0.0, 5.0), 90.0);
        check(Pt2D::new(-5.0, 0.0), 180.0);
        check(Pt2D::new(0.0, -5.0), -90.0);
    }

    #[test]
    fn project_away_round_trip() {
        let pt = Pt2D::new(3.0, 4.0);
        let moved = pt.project_away(10.0, Angle::degrees(30.0));
        assert!((pt.dist_to(moved) - 10.0).abs() < 1e-9);
        assert!(pt.angle_to(moved).approx_eq(Angle::degrees(30.0), 1e-6));
    }
}
