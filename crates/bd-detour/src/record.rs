//! Per-(business, bridge, direction) detour records.
//!
//! A [`DetourRecord`] is flat so it round-trips through CSV unchanged: a
//! restarted run reloads finished directions from the sink instead of
//! re-solving them.

use serde::{Deserialize, Serialize};

use bd_core::{BridgeId, BusinessId, Direction};

// ── DetourKey ─────────────────────────────────────────────────────────────────

/// Identity of a detour record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DetourKey {
    pub business:  BusinessId,
    pub bridge:    BridgeId,
    pub direction: Direction,
}

// ── DetourOutcome ─────────────────────────────────────────────────────────────

/// What happened when the bridge was barred.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetourOutcome {
    /// An alternative route exists; `detour_cost` and `detour_time` are set.
    Detoured,
    /// No destination is reachable without the bridge.
    CutOff,
    /// The barred solve failed internally; see `reason`.
    Unknown,
}

impl DetourOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            DetourOutcome::Detoured => "detoured",
            DetourOutcome::CutOff   => "cut_off",
            DetourOutcome::Unknown  => "unknown",
        }
    }

    /// Inverse of [`as_str`](Self::as_str).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "detoured" => Some(DetourOutcome::Detoured),
            "cut_off"  => Some(DetourOutcome::CutOff),
            "unknown"  => Some(DetourOutcome::Unknown),
            _          => None,
        }
    }
}

// ── DetourRecord ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetourRecord {
    pub business_id: BusinessId,
    pub bridge_id:   BridgeId,
    pub direction:   Direction,

    pub outcome: DetourOutcome,

    /// Unconstrained cost to the nearest destination.
    pub base_cost: f64,

    /// Cost with the bridge barred.  `None` unless `outcome` is `Detoured`.
    pub detour_cost: Option<f64>,

    /// `detour_cost - base_cost`.  `None` exactly when `detour_cost` is.
    pub detour_time: Option<f64>,

    /// Straight-line business → bridge distance in miles.
    pub distance_miles: f64,

    /// The business's per-direction truck intensity.
    pub truck_int: f64,

    /// `None` when the weighting is undefined (zero distance).
    pub dw_intensity: Option<f64>,

    /// Error text for `Unknown` outcomes.
    pub reason: Option<String>,
}

impl DetourRecord {
    /// A record for an alternative route of `detour_cost`.
    pub fn detoured(key: DetourKey, base_cost: f64, detour_cost: f64) -> Self {
        Self {
            detour_cost: Some(detour_cost),
            detour_time: Some(detour_cost - base_cost),
            ..Self::blank(key, DetourOutcome::Detoured, base_cost)
        }
    }

    /// A record for a business left without any route.
    pub fn cut_off(key: DetourKey, base_cost: f64) -> Self {
        Self::blank(key, DetourOutcome::CutOff, base_cost)
    }

    /// A record whose barred solve failed.
    pub fn unknown(key: DetourKey, base_cost: f64, reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::blank(key, DetourOutcome::Unknown, base_cost)
        }
    }

    fn blank(key: DetourKey, outcome: DetourOutcome, base_cost: f64) -> Self {
        Self {
            business_id:    key.business,
            bridge_id:      key.bridge,
            direction:      key.direction,
            outcome,
            base_cost,
            detour_cost:    None,
            detour_time:    None,
            distance_miles: 0.0,
            truck_int:      0.0,
            dw_intensity:   None,
            reason:         None,
        }
    }

    /// Attach the crossing's weighting inputs.
    pub fn with_weights(mut self, distance_miles: f64, truck_int: f64, dw_intensity: Option<f64>) -> Self {
        self.distance_miles = distance_miles;
        self.truck_int = truck_int;
        self.dw_intensity = dw_intensity;
        self
    }

    pub fn key(&self) -> DetourKey {
        DetourKey {
            business:  self.business_id,
            bridge:    self.bridge_id.clone(),
            direction: self.direction.clone(),
        }
    }

    /// `detour_time × truck_int`.
    pub fn job_detour_time(&self) -> Option<f64> {
        self.detour_time.map(|t| t * self.truck_int)
    }

    /// `detour_time × dw_intensity`.
    pub fn dw_job_detour_time(&self) -> Option<f64> {
        Some(self.detour_time? * self.dw_intensity?)
    }
}
