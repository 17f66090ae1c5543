//! Inverse-distance weighting of truck intensity.
//!
//! ```text
//! dw_intensity = truck_int × cutoff / distance_miles ^ power
//! ```

use thiserror::Error;

use bd_core::MapPoint;

/// The weighting is undefined for a non-positive or non-finite distance.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[error("distance-weighted intensity is undefined for a distance of {distance_miles} miles")]
pub struct InvalidWeightError {
    pub distance_miles: f64,
}

/// Distance-weighted intensity of a business relative to one bridge.
pub fn distance_weighted_intensity(
    truck_int:      f64,
    distance_miles: f64,
    cutoff:         f64,
    power:          f64,
) -> Result<f64, InvalidWeightError> {
    if !(distance_miles.is_finite() && distance_miles > 0.0) {
        return Err(InvalidWeightError { distance_miles });
    }
    Ok(truck_int * cutoff / distance_miles.powf(power))
}

/// Straight-line distance between two map points, converted to miles.
#[inline]
pub fn map_distance_miles(a: MapPoint, b: MapPoint, map_units_per_mile: f64) -> f64 {
    a.distance(b) / map_units_per_mile
}
