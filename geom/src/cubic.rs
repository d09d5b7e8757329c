use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// A cubic polynomial `z(t) = a + b t + c t^2 + d t^3` over `t` in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cubic {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Cubic {
    pub const fn new(a: f64, b: f64, c: f64, d: f64) -> Cubic {
        Cubic { a, b, c, d }
    }

    pub const fn constant(value: f64) -> Cubic {
        Cubic::new(value, 0.0, 0.0, 0.0)
    }

    pub fn linear(from: f64, to: f64) -> Cubic {
        Cubic::new(from, to - from, 0.0, 0.0)
    }

    /// Smoothly eases from `from` at t=0 to `to` at t=1, with zero slope at
    /// both ends.
    pub fn ease(from: f64, to: f64) -> Cubic {
        let delta = to - from;
        Cubic::new(from, 0.0, 3.0 * delta, -2.0 * delta)
    }

    /// Converts Bezier control values to polynomial coefficients. Degrades
    /// gracefully: 3 values synthesize the inner controls from midpoints, 2
    /// values become the linear interpolation, 1 value a constant.
    pub fn from_controls(controls: &[f64]) -> Result<Cubic> {
        match *controls {
            [p0, p1, p2, p3] => Ok(Cubic::new(
                p0,
                3.0 * (p1 - p0),
                3.0 * (p0 - 2.0 * p1 + p2),
                p3 - 3.0 * p2 + 3.0 * p1 - p0,
            )),
            [z0, z1, z2] => {
                Cubic::from_controls(&[z0, (z0 + z1) / 2.0, (z1 + z2) / 2.0, z2])
            }
            [from, to] => Ok(Cubic::linear(from, to)),
            [value] => Ok(Cubic::constant(value)),
            [] => bail!("can't fit a cubic to zero control values"),
            _ => bail!("too many control values ({})", controls.len()),
        }
    }

    pub fn eval(&self, t: f64) -> f64 {
        self.a + self.b * t + self.c * t * t + self.d * t * t * t
    }

    pub fn start(&self) -> f64 {
        self.a
    }

    pub fn end(&self) -> f64 {
        self.a + self.b + self.c + self.d
    }
}

impl fmt::Display for Cubic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Cubic({} + {} t + {} t^2 + {} t^3)",
            self.a, self.b, self.c, self.d
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_controls_reduce_to_linear_interpolation() {
        let fit = Cubic::from_controls(&[3.0, 7.0]).unwrap();
        assert_eq!(fit.b, 4.0);
        assert_eq!(fit.c, 0.0);
        assert_eq!(fit.d, 0.0);
        assert_eq!(fit.eval(0.5), 5.0);
    }

    #[test]
    fn four_controls_hit_both_endpoints() {
        let fit = Cubic::from_controls(&[1.0, 2.0, -1.0, 4.0]).unwrap();
        assert!((fit.eval(0.0) - 1.0).abs() < 1e-12);
        assert!((fit.eval(1.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn three_controls_hit_both_endpoints() {
        let fit = Cubic::from_controls(&[2.0, 9.0, 4.0]).unwrap();
        assert!((fit.eval(0.0) - 2.0).abs() < 1e-12);
        assert!((fit.eval(1.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn ease_has_flat_ends() {
        let fit = Cubic::ease(1.0, 5.0);
        assert_eq!(fit.eval(0.0), 1.0);
        assert!((fit.eval(1.0) - 5.0).abs() < 1e-12);
        // Derivative b + 2ct + 3dt^2 vanishes at both ends.
        assert_eq!(fit.b, 0.0);
        assert!((fit.b + 2.0 * fit.c + 3.0 * fit.d).abs() < 1e-12);
    }
}
