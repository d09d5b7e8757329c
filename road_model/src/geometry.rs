//! Road-shape heuristics shared by trimming, composite detection, and
//! connector synthesis.

use geom::Angle;

/// Turns sharper than this use the full trim formula.
const SHARP_TURN_DEGS: f64 = 90.0;
/// Below this, a turn counts as shallow...
const SHALLOW_TURN_DEGS: f64 = 45.0;
/// ...unless its tangent still clears this.
const SHALLOW_TURN_MIN_TAN: f64 = 0.35;

/// Estimates how far back from a shared endpoint a road must yield so a turn
/// between two roads of the given widths fits. The formula encodes assumed
/// lane geometry calibrated against survey data; keep the branches as they
/// are.
pub fn turning_point_distance(width_a: f64, width_b: f64, delta: Angle) -> f64 {
    let rads = delta.abs().to_radians();
    let (sin, cos) = rads.sin_cos();
    if delta.abs() > SHARP_TURN_DEGS {
        // tan is negative past 90 degrees, so the second term adds.
        width_b / sin - width_a * cos / sin
    } else if delta.abs() < SHALLOW_TURN_DEGS && rads.tan() > SHALLOW_TURN_MIN_TAN {
        width_b / sin
    } else {
        width_b * sin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_zero_turns_need_almost_nothing() {
        let d = turning_point_distance(6.0, 6.0, Angle::degrees(2.0));
        assert!(d < 0.3);
    }

    #[test]
    fn right_angle_turns_need_about_one_road_width() {
        let d = turning_point_distance(6.0, 6.0, Angle::degrees(90.0));
        assert!((d - 6.0).abs() < 1e-9);
    }

    #[test]
    fn sharp_turns_add_the_incoming_width() {
        let d = turning_point_distance(6.0, 6.0, Angle::degrees(135.0));
        // 6/sin(135) - 6*cos(135)/sin(135) = 6*sqrt(2) + 6
        assert!(d > 6.0 * std::f64::consts::SQRT_2);
    }

    #[test]
    fn moderate_turns_use_the_sine_scaled_width() {
        let d = turning_point_distance(6.0, 8.0, Angle::degrees(10.0));
        // tan(10 degs) < 0.35, so the shallow branch doesn't apply.
        assert!((d - 8.0 * Angle::degrees(10.0).to_radians().sin()).abs() < 1e-9);
        let d = turning_point_distance(6.0, 8.0, Angle::degrees(30.0));
        // tan(30 degs) > 0.35: full projected width.
        assert!((d - 8.0 / Angle::degrees(30.0).to_radians().sin()).abs() < 1e-9);
    }
}
