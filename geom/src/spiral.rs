use crate::{Angle, Pt2D};

/// Fresnel integrals by power series, in the convention
/// `C(u) = integral of cos(pi/2 * v^2)`, `S(u) = integral of sin(pi/2 * v^2)`.
/// The series converges fast for the |u| <= ~2 range a road connector needs.
fn fresnel(u: f64) -> (f64, f64) {
    let half_pi = std::f64::consts::FRAC_PI_2;
    let mut c = 0.0;
    let mut s = 0.0;
    // cos term: (-1)^n (pi/2)^(2n) u^(4n+1) / ((2n)! (4n+1))
    // sin term: (-1)^n (pi/2)^(2n+1) u^(4n+3) / ((2n+1)! (4n+3))
    let mut cos_coeff = 1.0;
    let mut sin_coeff = half_pi;
    for n in 0..16 {
        let nf = n as f64;
        c += cos_coeff * u.powi(4 * n + 1) / (4.0 * nf + 1.0);
        s += sin_coeff * u.powi(4 * n + 3) / (4.0 * nf + 3.0);
        cos_coeff *= -half_pi * half_pi / ((2.0 * nf + 1.0) * (2.0 * nf + 2.0));
        sin_coeff *= -half_pi * half_pi / ((2.0 * nf + 2.0) * (2.0 * nf + 3.0));
    }
    (c, s)
}

/// Samples a clothoid whose curvature grows linearly from 0 at the start to
/// `±1/radius` at the end, with the sign taken from `heading_delta`. The arc
/// length follows from the heading change: `L = 2 |delta| radius`. The curve
/// starts at `start` heading `start_angle`; callers rescale the result to hit
/// a target chord.
pub fn spiral(start: Pt2D, start_angle: Angle, heading_delta: Angle, radius: f64) -> Vec<Pt2D> {
    assert!(radius > 0.0);
    let delta_rads = heading_delta.to_radians();
    if delta_rads.abs() < 1e-6 {
        return vec![start];
    }
    let arc_length = 2.0 * delta_rads.abs() * radius;
    // Curvature at s is s / (a^2); headings on the unit clothoid are pi/2 u^2.
    let scale = (std::f64::consts::PI * radius * arc_length).sqrt();
    let u_end = arc_length / scale;

    let samples = ((arc_length / 2.0).ceil() as usize).max(8);
    let (sin0, cos0) = start_angle.to_radians().sin_cos();
    let side = delta_rads.signum();

    let mut pts = Vec::with_capacity(samples + 1);
    for i in 0..=samples {
        let u = u_end * (i as f64) / (samples as f64);
        let (c, s) = fresnel(u);
        // Local frame: x ahead, y to the left for a left-hand spiral.
        let local_x = scale * c;
        let local_y = scale * s * side;
        pts.push(Pt2D::new(
            start.x() + local_x * cos0 - local_y * sin0,
            start.y() + local_x * sin0 + local_y * cos0,
        ));
    }
    pts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresnel_small_argument_matches_taylor() {
        // For small u, C(u) ~ u and S(u) ~ pi/6 u^3.
        let (c, s) = fresnel(0.01);
        assert!((c - 0.01).abs() < 1e-9);
        assert!((s - std::f64::consts::PI / 6.0 * 0.01f64.powi(3)).abs() < 1e-9);
    }

    #[test]
    fn spiral_turns_the_requested_amount() {
        let pts = spiral(Pt2D::new(0.0, 0.0), Angle::ZERO, Angle::degrees(60.0), 20.0);
        assert!(pts.len() >= 8);
        // End heading should approach the requested delta.
        let n = pts.len();
        let end_heading = pts[n - 2].angle_to(pts[n - 1]);
        assert!(end_heading.approx_eq(Angle::degrees(60.0), 4.0));
        // A left turn bends left.
        assert!(pts[n - 1].y() > 0.0);
    }

    #[test]
    fn spiral_mirrors_for_right_turns() {
        let left = spiral(Pt2D::new(0.0, 0.0), Angle::ZERO, Angle::degrees(45.0), 20.0);
        let right = spiral(Pt2D::new(0.0, 0.0), Angle::ZERO, Angle::degrees(-45.0), 20.0);
        assert_eq!(left.len(), right.len());
        for (l, r) in left.iter().zip(right.iter()) {
            assert!((l.x() - r.x()).abs() < 1e-9);
            assert!((l.y() + r.y()).abs() < 1e-9);
        }
    }
}
