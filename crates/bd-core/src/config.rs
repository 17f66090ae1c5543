//! Run configuration.
//!
//! Typically assembled by the binary from command-line flags, optionally
//! seeded from a JSON file (`serde` feature), then passed by reference to the
//! network builder, the detour engine, and the aggregation step.

use std::collections::BTreeSet;

use crate::{CoreError, CoreResult, Direction};

/// Top-level analysis configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnalysisConfig {
    /// Maximum distance (map units) between a bridge point and an arc for
    /// the arc to count as crossing the bridge.  Default: 5 (feet).
    pub proximity_tolerance: f64,

    /// Numerator constant of the inverse-distance weighting.  Default: 1.
    pub cutoff: f64,

    /// Exponent of the inverse-distance weighting.  Default: 1.
    pub power: f64,

    /// Map units per mile, for business→bridge distances.  Default: 5280.
    pub map_units_per_mile: f64,

    /// Also aggregate traversals per network segment.
    pub calculate_network_segments: bool,

    /// Directions to process.  Empty means every destination set.
    pub directions: Vec<Direction>,

    /// Source names a business may snap onto.  Empty means all sources.
    pub snappable_sources: Vec<String>,

    /// Source names a business may never snap onto.
    pub restricted_sources: Vec<String>,

    /// Worker thread count passed to Rayon.  `None` uses all logical cores.
    pub num_threads: Option<usize>,

    /// Emit a progress line every N completed rows.
    pub progress_interval: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            proximity_tolerance:        5.0,
            cutoff:                     1.0,
            power:                      1.0,
            map_units_per_mile:         5_280.0,
            calculate_network_segments: false,
            directions:                 Vec::new(),
            snappable_sources:          Vec::new(),
            restricted_sources:         Vec::new(),
            num_threads:                None,
            progress_interval:          100,
        }
    }
}

impl AnalysisConfig {
    /// Reject values that would make the run meaningless.
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.proximity_tolerance.is_finite() && self.proximity_tolerance > 0.0) {
            return Err(CoreError::Config(format!(
                "proximity_tolerance must be positive, got {}",
                self.proximity_tolerance
            )));
        }
        if !(self.map_units_per_mile.is_finite() && self.map_units_per_mile > 0.0) {
            return Err(CoreError::Config(format!(
                "map_units_per_mile must be positive, got {}",
                self.map_units_per_mile
            )));
        }
        if !self.cutoff.is_finite() || !self.power.is_finite() {
            return Err(CoreError::Config(format!(
                "cutoff and power must be finite, got {} and {}",
                self.cutoff, self.power
            )));
        }
        if self.progress_interval == 0 {
            return Err(CoreError::Config("progress_interval must be at least 1".into()));
        }
        if self.num_threads == Some(0) {
            return Err(CoreError::Config("num_threads must be at least 1".into()));
        }
        Ok(())
    }

    /// Source names whose arcs must be marked non-snappable, given every
    /// source name present in the network.
    ///
    /// This is `restricted_sources`, plus every source outside
    /// `snappable_sources` when that allow-list is non-empty.
    pub fn restricted_set<'a>(
        &self,
        all_sources: impl IntoIterator<Item = &'a str>,
    ) -> BTreeSet<String> {
        let mut restricted: BTreeSet<String> = self.restricted_sources.iter().cloned().collect();
        if !self.snappable_sources.is_empty() {
            restricted.extend(
                all_sources
                    .into_iter()
                    .filter(|s| !self.snappable_sources.iter().any(|a| a == s))
                    .map(str::to_owned),
            );
        }
        restricted
    }

    /// Whether `direction` is selected by the `directions` filter.
    pub fn includes_direction(&self, direction: &Direction) -> bool {
        self.directions.is_empty() || self.directions.contains(direction)
    }
}
