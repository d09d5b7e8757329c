use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Pt2D;

/// Meters between two adjacent degrees of latitude, from the mean Earth
/// circumference.
const METERS_PER_DEGREE: f64 = 111_319.49;

/// A geodetic coordinate. Order in the name matches the (x, y) convention of
/// the planar frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub longitude: f64,
    pub latitude: f64,
}

impl LonLat {
    pub fn new(longitude: f64, latitude: f64) -> LonLat {
        LonLat {
            longitude,
            latitude,
        }
    }

    /// Haversine great-circle distance in meters.
    pub fn gps_dist_meters(self, other: LonLat) -> f64 {
        let earth_radius_m = 6_371_000.0;
        let lon1 = self.longitude.to_radians();
        let lon2 = other.longitude.to_radians();
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();

        let delta_lat = lat2 - lat1;
        let delta_lon = lon2 - lon1;

        let a = (delta_lat / 2.0).sin().powi(2)
            + (delta_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
        let c = 2.0 * a.sqrt().asin();
        earth_radius_m * c
    }
}

impl fmt::Display for LonLat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "LonLat({}, {})", self.longitude, self.latitude)
    }
}

/// A local planar frame centered on one origin coordinate. Good enough at
/// road-network scale; the zone/region choice that picks the origin is the
/// caller's problem.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Projection {
    origin: LonLat,
    cos_origin_lat: f64,
}

impl Projection {
    pub fn new(origin: LonLat) -> Projection {
        Projection {
            origin,
            cos_origin_lat: origin.latitude.to_radians().cos(),
        }
    }

    pub fn origin(&self) -> LonLat {
        self.origin
    }

    /// Meters east/north of the origin.
    pub fn to_pt(&self, gps: LonLat) -> Pt2D {
        let x = (gps.longitude - self.origin.longitude) * self.cos_origin_lat * METERS_PER_DEGREE;
        let y = (gps.latitude - self.origin.latitude) * METERS_PER_DEGREE;
        Pt2D::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_matches_haversine_near_origin() {
        let origin = LonLat::new(13.4, 52.5);
        let proj = Projection::new(origin);
        let other = LonLat::new(13.41, 52.5);
        let planar = proj.to_pt(other).dist_to(proj.to_pt(origin));
        let geodetic = origin.gps_dist_meters(other);
        assert!((planar - geodetic).abs() / geodetic < 0.01);
    }
}
