//! Elevation profiles as chained cubic segments over arclength. Survey
//! heights ride along as planar samples; fitting projects them onto the final
//! centerline, so trimming, reversal, and merging never desynchronize them.

use nalgebra::{Matrix4, Vector4};
use serde::{Deserialize, Serialize};

use geom::{Cubic, PolyLine, Pt2D};

/// Number of samples per fitted window.
const ELEVATION_WINDOW: usize = 20;
/// Regression needs some redundancy to be worth trusting.
const MIN_REGRESSION_SAMPLES: usize = 5;

/// One cubic piece of an elevation profile. The polynomial runs over
/// normalized arclength within `[s, s + length]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElevationSegment {
    pub s: f64,
    pub length: f64,
    pub cubic: Cubic,
}

impl ElevationSegment {
    pub fn eval(&self, s: f64) -> f64 {
        if self.length < 1e-9 {
            return self.cubic.start();
        }
        self.cubic.eval(((s - self.s) / self.length).clamp(0.0, 1.0))
    }
}

/// Fits a road's height samples against its (possibly trimmed or merged)
/// centerline. Empty samples yield an empty chain; callers treat that as
/// flat.
pub fn fit_road_elevation(center: &PolyLine, samples: &[(Pt2D, f64)]) -> Vec<ElevationSegment> {
    if samples.is_empty() {
        return Vec::new();
    }
    let mut sz: Vec<(f64, f64)> = samples
        .iter()
        .map(|(pt, z)| (project_arclength(center, *pt), *z))
        .collect();
    sz.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    sz.dedup_by(|a, b| (a.0 - b.0).abs() < 1e-6);
    fit_chain(&sz)
}

/// A connector's elevation just blends between its two road ends.
pub fn fit_connector_elevation(length: f64, start_z: f64, end_z: f64) -> Vec<ElevationSegment> {
    vec![ElevationSegment {
        s: 0.0,
        length,
        cubic: Cubic::linear(start_z, end_z),
    }]
}

/// Windows the (s, z) series and fits each window: least-squares cubic
/// regression when there's enough data, the closed-form control-point
/// conversion when there isn't or the normal equations degenerate, and
/// linear/constant for the short tail.
pub fn fit_chain(sz: &[(f64, f64)]) -> Vec<ElevationSegment> {
    if sz.is_empty() {
        return Vec::new();
    }
    let mut result = Vec::new();
    let mut start = 0;
    while start < sz.len() {
        // Overlap windows by one sample so the chain stays continuous-ish.
        let end = (start + ELEVATION_WINDOW).min(sz.len());
        let window = &sz[start..end];
        if let Some(seg) = fit_window(window) {
            result.push(seg);
        }
        if end == sz.len() {
            break;
        }
        start = end - 1;
    }
    if result.is_empty() {
        result.push(ElevationSegment {
            s: sz[0].0,
            length: 0.0,
            cubic: Cubic::constant(sz[0].1),
        });
    }
    result
}

fn fit_window(window: &[(f64, f64)]) -> Option<ElevationSegment> {
    let s0 = window.first()?.0;
    let s1 = window.last()?.0;
    let length = s1 - s0;
    if window.len() == 1 || length < 1e-9 {
        return Some(ElevationSegment {
            s: s0,
            length: 0.0,
            cubic: Cubic::constant(window[0].1),
        });
    }

    let t: Vec<f64> = window.iter().map(|(s, _)| (s - s0) / length).collect();
    let z: Vec<f64> = window.iter().map(|(_, z)| *z).collect();

    let cubic = if window.len() >= MIN_REGRESSION_SAMPLES {
        least_squares_cubic(&t, &z).or_else(|| control_point_fallback(&z))
    } else {
        control_point_fallback(&z)
    }?;

    Some(ElevationSegment {
        s: s0,
        length,
        cubic,
    })
}

/// Ordinary least squares on the 4x4 normal equations. `None` when the
/// system is singular (collinear or clustered abscissae).
fn least_squares_cubic(t: &[f64], z: &[f64]) -> Option<Cubic> {
    let mut m = Matrix4::<f64>::zeros();
    let mut v = Vector4::<f64>::zeros();
    for (ti, zi) in t.iter().zip(z.iter()) {
        let row = Vector4::new(1.0, *ti, ti * ti, ti * ti * ti);
        m += row * row.transpose();
        v += row * *zi;
    }
    let solution = m.lu().solve(&v)?;
    let cubic = Cubic::new(solution[0], solution[1], solution[2], solution[3]);
    if [cubic.a, cubic.b, cubic.c, cubic.d]
        .iter()
        .any(|coef| !coef.is_finite())
    {
        return None;
    }
    Some(cubic)
}

/// Closed-form fit through up to four evenly spread control values.
fn control_point_fallback(z: &[f64]) -> Option<Cubic> {
    let controls: Vec<f64> = match z.len() {
        0 => return None,
        1 => vec![z[0]],
        2 => vec![z[0], z[1]],
        3 => vec![z[0], z[1], z[2]],
        n => {
            vec![z[0], z[n / 3], z[2 * n / 3], z[n - 1]]
        }
    };
    Cubic::from_controls(&controls).ok()
}

/// Arclength of the closest point on `center` to `pt`.
pub fn project_arclength(center: &PolyLine, pt: Pt2D) -> f64 {
    let mut best_s = 0.0;
    let mut best_dist = f64::MAX;
    let mut dist_so_far = 0.0;
    for line in center.lines() {
        let len = line.length();
        let (dx, dy) = (
            line.pt2().x() - line.pt1().x(),
            line.pt2().y() - line.pt1().y(),
        );
        let t = ((pt.x() - line.pt1().x()) * dx + (pt.y() - line.pt1().y()) * dy)
            / (len * len);
        let t = t.clamp(0.0, 1.0);
        let closest = Pt2D::new(line.pt1().x() + t * dx, line.pt1().y() + t * dy);
        let dist = pt.dist_to(closest);
        if dist < best_dist {
            best_dist = dist;
            best_s = dist_so_far + t * len;
        }
        dist_so_far += len;
    }
    best_s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regression_recovers_an_exact_cubic() {
        let truth = Cubic::new(2.0, -1.0, 0.5, 3.0);
        let sz: Vec<(f64, f64)> = (0..12)
            .map(|i| {
                let t = i as f64 / 11.0;
                (t * 100.0, truth.eval(t))
            })
            .collect();
        let chain = fit_chain(&sz);
        assert_eq!(chain.len(), 1);
        for (s, z) in &sz {
            assert!((chain[0].eval(*s) - z).abs() < 1e-6);
        }
    }

    #[test]
    fn long_series_chains_multiple_windows() {
        let sz: Vec<(f64, f64)> = (0..50).map(|i| (i as f64 * 10.0, (i as f64).sin())).collect();
        let chain = fit_chain(&sz);
        assert!(chain.len() > 1);
        // Segments tile the arclength range.
        assert_eq!(chain[0].s, 0.0);
        let last = chain.last().unwrap();
        assert!((last.s + last.length - 490.0).abs() < 1e-9);
    }

    #[test]
    fn two_samples_fit_linearly() {
        let chain = fit_chain(&[(0.0, 1.0), (40.0, 5.0)]);
        assert_eq!(chain.len(), 1);
        assert!((chain[0].eval(20.0) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn projection_handles_interior_points() {
        let pl = PolyLine::must_new(vec![
            Pt2D::new(0.0, 0.0),
            Pt2D::new(10.0, 0.0),
            Pt2D::new(10.0, 10.0),
        ]);
        assert!((project_arclength(&pl, Pt2D::new(4.0, 1.0)) - 4.0).abs() < 1e-9);
        assert!((project_arclength(&pl, Pt2D::new(11.0, 5.0)) - 15.0).abs() < 1e-9);
    }
}
