//! Planar map coordinates and distance helpers.
//!
//! All inputs share one projected coordinate system whose linear unit is the
//! "map unit" (feet for the state-plane data this analysis was built for).
//! Distances are plain Euclidean; conversion to miles happens in the
//! weighting step via `AnalysisConfig::map_units_per_mile`.

/// A projected `(x, y)` coordinate in map units.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapPoint {
    pub x: f64,
    pub y: f64,
}

impl MapPoint {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared distance.  Cheaper than [`distance`](Self::distance) for comparisons.
    #[inline]
    pub fn distance_2(self, other: MapPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Straight-line distance in map units.
    #[inline]
    pub fn distance(self, other: MapPoint) -> f64 {
        self.distance_2(other).sqrt()
    }

    /// Squared distance from `self` to the closed segment `a`–`b`.
    ///
    /// Degenerate segments (`a == b`) reduce to point distance.
    pub fn distance_2_to_segment(self, a: MapPoint, b: MapPoint) -> f64 {
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let len_2 = dx * dx + dy * dy;
        if len_2 == 0.0 {
            return self.distance_2(a);
        }
        let t = (((self.x - a.x) * dx + (self.y - a.y) * dy) / len_2).clamp(0.0, 1.0);
        self.distance_2(MapPoint::new(a.x + t * dx, a.y + t * dy))
    }

    /// Distance from `self` to the closed segment `a`–`b`.
    #[inline]
    pub fn distance_to_segment(self, a: MapPoint, b: MapPoint) -> f64 {
        self.distance_2_to_segment(a, b).sqrt()
    }

    /// `[x, y]` array form used as an R-tree point.
    #[inline]
    pub fn to_array(self) -> [f64; 2] {
        [self.x, self.y]
    }
}

impl std::fmt::Display for MapPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}
