//! Degeneracies and discards don't abort the run; they accumulate here so one
//! bad junction can't take down the rest of the network.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{JunctionId, RoadId};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Event {
    /// A survey polyline couldn't be ingested at all.
    DroppedRoad { id: RoadId, reason: String },
    /// A candidate movement was discarded during classification or synthesis.
    DroppedMovement {
        junction: JunctionId,
        from: RoadId,
        to: RoadId,
        reason: String,
    },
    /// The pathfinder exhausted its open set inside a composite junction.
    UnreachableMovement {
        junction: JunctionId,
        from: RoadId,
        to: RoadId,
    },
    /// Speed back-fill never found a valid neighbor; the original (negative)
    /// value is kept.
    SpeedUnresolved { id: RoadId },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Event::DroppedRoad { id, reason } => write!(f, "dropped {}: {}", id, reason),
            Event::DroppedMovement {
                junction,
                from,
                to,
                reason,
            } => write!(
                f,
                "dropped movement {} -> {} at {}: {}",
                from, to, junction, reason
            ),
            Event::UnreachableMovement { junction, from, to } => {
                write!(f, "no path {} -> {} inside {}", from, to, junction)
            }
            Event::SpeedUnresolved { id } => {
                write!(f, "{} keeps its unknown speed; no valid neighbor", id)
            }
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    events: Vec<Event>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn record(&mut self, event: Event) {
        warn!("{}", event);
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}
