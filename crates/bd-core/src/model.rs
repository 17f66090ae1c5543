//! Input entities supplied by a network data provider.
//!
//! These are loaded once per run and never mutated after the per-direction
//! truck intensity has been attached.

use crate::{BridgeId, BusinessId, Direction, MapPoint};

// ── Business ──────────────────────────────────────────────────────────────────

/// An origin point with a freight-traffic weight.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Business {
    pub id:  BusinessId,
    pub pos: MapPoint,
    /// Raw truck intensity as supplied by the input data.
    pub truck_int_raw: f64,
    /// Truck intensity per direction: `truck_int_raw / direction_count`.
    /// Equal to the raw value until [`divide_intensity`](Self::divide_intensity)
    /// is applied.
    pub truck_int: f64,
}

impl Business {
    pub fn new(id: BusinessId, pos: MapPoint, truck_int_raw: f64) -> Self {
        Self { id, pos, truck_int_raw, truck_int: truck_int_raw }
    }

    /// Spread the raw intensity evenly over `direction_count` routes, one per
    /// destination set.  A count of zero leaves the raw value in place.
    pub fn divide_intensity(mut self, direction_count: usize) -> Self {
        if direction_count > 0 {
            self.truck_int = self.truck_int_raw / direction_count as f64;
        }
        self
    }
}

// ── Bridge ────────────────────────────────────────────────────────────────────

/// A weight-restricted bridge.  Only ever used as a barrier target.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bridge {
    pub id:  BridgeId,
    pub pos: MapPoint,
}

impl Bridge {
    pub fn new(id: impl Into<BridgeId>, pos: MapPoint) -> Self {
        Self { id: id.into(), pos }
    }
}

// ── DestinationSet ────────────────────────────────────────────────────────────

/// Border-crossing points for one cardinal direction.
///
/// Point order matters: it is the tie-break order when two destinations snap
/// to the same network node.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DestinationSet {
    pub direction: Direction,
    pub points:    Vec<MapPoint>,
}

impl DestinationSet {
    pub fn new(direction: impl Into<Direction>, points: Vec<MapPoint>) -> Self {
        Self { direction: direction.into(), points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
