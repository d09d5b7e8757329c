use std::fmt;
use std::ops;

use serde::{Deserialize, Serialize};

/// Folds any finite degree value into `(-180, 180]` by repeated ±360
/// correction.
pub fn normalize_degrees(mut degs: f64) -> f64 {
    while degs > 180.0 {
        degs -= 360.0;
    }
    while degs <= -180.0 {
        degs += 360.0;
    }
    degs
}

/// An angle, stored in degrees, always normalized to `(-180, 180]`. East is 0,
/// angles increase counter-clockwise.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Angle(f64);

impl Angle {
    pub const ZERO: Angle = Angle(0.0);

    pub fn degrees(degs: f64) -> Angle {
        Angle(normalize_degrees(degs))
    }

    pub fn radians(rads: f64) -> Angle {
        Angle::degrees(rads.to_degrees())
    }

    pub fn to_degrees(self) -> f64 {
        self.0
    }

    pub fn to_radians(self) -> f64 {
        self.0.to_radians()
    }

    pub fn opposite(self) -> Angle {
        Angle::degrees(self.0 + 180.0)
    }

    pub fn rotate_degs(self, degrees: f64) -> Angle {
        Angle::degrees(self.0 + degrees)
    }

    /// The shortest signed rotation from `self` to `other`, in `(-180, 180]`.
    /// Positive means counter-clockwise (a left turn).
    pub fn delta_to(self, other: Angle) -> Angle {
        Angle::degrees(other.0 - self.0)
    }

    pub fn abs(self) -> f64 {
        self.0.abs()
    }

    pub fn sin(self) -> f64 {
        self.to_radians().sin()
    }

    pub fn cos(self) -> f64 {
        self.to_radians().cos()
    }

    pub fn tan(self) -> f64 {
        self.to_radians().tan()
    }

    pub fn approx_eq(self, other: Angle, epsilon_degrees: f64) -> bool {
        self.delta_to(other).abs() < epsilon_degrees
    }
}

impl ops::Neg for Angle {
    type Output = Angle;

    fn neg(self) -> Angle {
        Angle::degrees(-self.0)
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Angle({} degrees)", self.0)
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    use super::*;

    #[test]
    fn normalize_range_and_idempotence() {
        let mut rng = XorShiftRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let raw: f64 = rng.gen_range(-100_000.0..100_000.0);
            let d = normalize_degrees(raw);
            assert!(
                d > -180.0 && d <= 180.0,
                "normalize({}) = {} out of range",
                raw,
                d
            );
            assert_eq!(d, normalize_degrees(d));
        }
        assert_eq!(normalize_degrees(-180.0), 180.0);
        assert_eq!(normalize_degrees(540.0), 180.0);
    }

    #[test]
    fn delta_is_shortest_rotation() {
        let a = Angle::degrees(170.0);
        let b = Angle::degrees(-170.0);
        assert_eq!(a.delta_to(b).to_degrees(), 20.0);
        assert_eq!(b.delta_to(a).to_degrees(), -20.0);
    }
}
