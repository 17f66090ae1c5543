//! Roll detour records up into per-bridge and per-segment metrics.
//!
//! Aggregation always starts from zero: every bridge (and, with segment
//! aggregation, every segment) gets an entry for every direction, so
//! untouched ones report zeros rather than going missing.  Grand totals are
//! the field-wise sum of the per-direction values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use bd_core::{Bridge, BridgeId, Direction, SegmentId};
use bd_network::RoadNetwork;

use crate::record::{DetourOutcome, DetourRecord};
use crate::{DetourError, DetourResult};

// ── Bridge metrics ────────────────────────────────────────────────────────────

/// Metrics of one bridge in one direction (or summed over all of them).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionMetrics {
    /// Businesses whose baseline route crosses the bridge.
    pub traversals:         u64,
    /// Σ truck intensity over those businesses.
    pub job_traversals:     f64,
    /// Σ distance-weighted intensity; undefined weights are skipped.
    pub dw_job_traversals:  f64,
    /// Businesses with a finite detour.
    pub detours:            u64,
    pub detour_time:        f64,
    pub job_detour_time:    f64,
    pub dw_job_detour_time: f64,
    /// Businesses left without any route when the bridge is closed.
    pub cut_off:            u64,
    /// Records whose barred solve failed.
    pub unknown:            u64,
    pub invalid_weights:    u64,
}

impl DirectionMetrics {
    pub fn add_record(&mut self, r: &DetourRecord) {
        self.traversals += 1;
        self.job_traversals += r.truck_int;
        match r.dw_intensity {
            Some(dw) => self.dw_job_traversals += dw,
            None => self.invalid_weights += 1,
        }
        match r.outcome {
            DetourOutcome::Detoured => {
                self.detours += 1;
                self.detour_time += r.detour_time.unwrap_or(0.0);
                self.job_detour_time += r.job_detour_time().unwrap_or(0.0);
                self.dw_job_detour_time += r.dw_job_detour_time().unwrap_or(0.0);
            }
            DetourOutcome::CutOff => self.cut_off += 1,
            DetourOutcome::Unknown => self.unknown += 1,
        }
    }

    /// Field-wise `self += other`.
    pub fn accumulate(&mut self, other: &Self) {
        self.traversals += other.traversals;
        self.job_traversals += other.job_traversals;
        self.dw_job_traversals += other.dw_job_traversals;
        self.detours += other.detours;
        self.detour_time += other.detour_time;
        self.job_detour_time += other.job_detour_time;
        self.dw_job_detour_time += other.dw_job_detour_time;
        self.cut_off += other.cut_off;
        self.unknown += other.unknown;
        self.invalid_weights += other.invalid_weights;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BridgeMetrics {
    pub bridge:       BridgeId,
    pub by_direction: BTreeMap<Direction, DirectionMetrics>,
    pub total:        DirectionMetrics,
}

impl BridgeMetrics {
    fn zeroed(bridge: BridgeId, directions: &[Direction]) -> Self {
        Self {
            bridge,
            by_direction: directions.iter().map(|d| (d.clone(), DirectionMetrics::default())).collect(),
            total: DirectionMetrics::default(),
        }
    }

    /// Metrics for `direction`; zero if the direction was never run.
    pub fn direction(&self, direction: &Direction) -> DirectionMetrics {
        self.by_direction.get(direction).cloned().unwrap_or_default()
    }
}

/// Aggregate detour records into one [`BridgeMetrics`] per bridge.
///
/// Every bridge in `bridges` is present in the result, with a zero entry for
/// every direction in `directions`.
///
/// # Errors
///
/// [`DetourError::UnknownBridge`] if a record names a bridge outside
/// `bridges`.
pub fn aggregate_bridges<'r>(
    bridges:    &[Bridge],
    directions: &[Direction],
    records:    impl IntoIterator<Item = &'r DetourRecord>,
) -> DetourResult<BTreeMap<BridgeId, BridgeMetrics>> {
    let mut out: BTreeMap<BridgeId, BridgeMetrics> = bridges
        .iter()
        .map(|b| (b.id.clone(), BridgeMetrics::zeroed(b.id.clone(), directions)))
        .collect();

    for r in records {
        let metrics = out.get_mut(&r.bridge_id).ok_or_else(|| DetourError::UnknownBridge {
            bridge:    r.bridge_id.clone(),
            direction: r.direction.clone(),
        })?;
        metrics.by_direction.entry(r.direction.clone()).or_default().add_record(r);
    }

    for metrics in out.values_mut() {
        let mut total = DirectionMetrics::default();
        for m in metrics.by_direction.values() {
            total.accumulate(m);
        }
        metrics.total = total;
    }
    Ok(out)
}

// ── Segment metrics ───────────────────────────────────────────────────────────

/// Baseline traversals of one segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentCounts {
    pub traversals:     u64,
    pub job_traversals: f64,
}

impl SegmentCounts {
    pub fn accumulate(&mut self, other: &Self) {
        self.traversals += other.traversals;
        self.job_traversals += other.job_traversals;
    }
}

/// Per-direction traversal counts, indexed by `SegmentId`.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentTally {
    counts: Vec<SegmentCounts>,
}

impl SegmentTally {
    pub fn new(segment_count: usize) -> Self {
        Self { counts: vec![SegmentCounts::default(); segment_count] }
    }

    /// Count one route.  A segment traversed by several arcs of the route
    /// (both halves of a split street, say) is counted once.
    pub fn add_route(&mut self, segments: &[SegmentId], truck_int: f64) {
        let mut distinct = segments.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        for seg in distinct {
            if let Some(c) = self.counts.get_mut(seg.index()) {
                c.traversals += 1;
                c.job_traversals += truck_int;
            }
        }
    }

    pub fn get(&self, segment: SegmentId) -> SegmentCounts {
        self.counts.get(segment.index()).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SegmentMetrics {
    pub segment:      SegmentId,
    pub source:       String,
    pub source_oid:   i64,
    pub by_direction: BTreeMap<Direction, SegmentCounts>,
    pub total:        SegmentCounts,
}

impl SegmentMetrics {
    /// Source name followed by object id, e.g. `Network_LocalStreets1042`.
    pub fn key(&self) -> String {
        format!("{}{}", self.source, self.source_oid)
    }
}

/// One [`SegmentMetrics`] per network segment, in `SegmentId` order.
pub fn aggregate_segments(
    network: &RoadNetwork,
    tallies: &[(Direction, SegmentTally)],
) -> Vec<SegmentMetrics> {
    network
        .segments
        .iter()
        .enumerate()
        .map(|(i, seg)| {
            let id = SegmentId(i as u32);
            let by_direction: BTreeMap<Direction, SegmentCounts> =
                tallies.iter().map(|(d, t)| (d.clone(), t.get(id))).collect();
            let mut total = SegmentCounts::default();
            for c in by_direction.values() {
                total.accumulate(c);
            }
            SegmentMetrics {
                segment: id,
                source: seg.source.clone(),
                source_oid: seg.source_oid,
                by_direction,
                total,
            }
        })
        .collect()
}
