//! The raw input model, as handed over by the data-acquisition layer: one
//! table of directed survey polylines plus the origin that anchors the planar
//! frame. Nothing here is deduplicated or cleaned up yet.

use serde::{Deserialize, Serialize};

use geom::LonLat;

use crate::RoadId;

/// Traversability of a polyline relative to its point order.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum OneWay {
    Both,
    /// Start to end only.
    Forward,
    /// End to start only.
    Backward,
}

impl OneWay {
    /// The survey coding: 0 = bidirectional, 1 = forward-only, 2 =
    /// backward-only.
    pub fn from_code(code: u8) -> Option<OneWay> {
        match code {
            0 => Some(OneWay::Both),
            1 => Some(OneWay::Forward),
            2 => Some(OneWay::Backward),
            _ => None,
        }
    }

    pub fn to_code(self) -> u8 {
        match self {
            OneWay::Both => 0,
            OneWay::Forward => 1,
            OneWay::Backward => 2,
        }
    }

    /// The coding after the point sequence is inverted.
    pub fn reversed(self) -> OneWay {
        match self {
            OneWay::Both => OneWay::Both,
            OneWay::Forward => OneWay::Backward,
            OneWay::Backward => OneWay::Forward,
        }
    }

    pub fn allows_forward(self) -> bool {
        self != OneWay::Backward
    }

    pub fn allows_backward(self) -> bool {
        self != OneWay::Forward
    }
}

/// One directed survey polyline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawRoad {
    pub id: RoadId,
    pub points: Vec<LonLat>,
    /// Height per point, aligned by index with `points`.
    pub elevation: Vec<f64>,
    pub oneway: OneWay,
    pub lanes: u8,
    pub width: f64,
    /// Negative means unknown; may be back-filled from neighbors later.
    pub speed: f64,
    pub highway: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawNetwork {
    pub roads: Vec<RawRoad>,
    /// Anchors the planar frame; also the geographic reference the serializer
    /// will emit.
    pub origin: LonLat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oneway_codes_round_trip() {
        for code in 0..3 {
            assert_eq!(OneWay::from_code(code).unwrap().to_code(), code);
        }
        assert_eq!(OneWay::from_code(3), None);
        assert_eq!(OneWay::Forward.reversed(), OneWay::Backward);
        assert_eq!(OneWay::Both.reversed(), OneWay::Both);
    }
}
