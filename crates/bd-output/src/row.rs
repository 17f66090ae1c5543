//! Flat rows shared by every backend.
//!
//! Each bridge (or segment) expands to one row per direction plus one total
//! row whose `direction` is empty.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use bd_core::{BridgeId, Direction};
use bd_detour::{BridgeMetrics, DirectionMetrics, SegmentCounts, SegmentMetrics};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BridgeMetricsRow {
    pub bridge_id:          String,
    /// `None` on the total row.
    pub direction:          Option<String>,
    pub traversals:         u64,
    pub job_traversals:     f64,
    pub dw_job_traversals:  f64,
    pub detours:            u64,
    pub detour_time:        f64,
    pub job_detour_time:    f64,
    pub dw_job_detour_time: f64,
    pub cut_off:            u64,
    pub unknown:            u64,
    pub invalid_weights:    u64,
}

impl BridgeMetricsRow {
    fn new(bridge: &BridgeId, direction: Option<&Direction>, m: &DirectionMetrics) -> Self {
        Self {
            bridge_id:          bridge.to_string(),
            direction:          direction.map(Direction::to_string),
            traversals:         m.traversals,
            job_traversals:     m.job_traversals,
            dw_job_traversals:  m.dw_job_traversals,
            detours:            m.detours,
            detour_time:        m.detour_time,
            job_detour_time:    m.job_detour_time,
            dw_job_detour_time: m.dw_job_detour_time,
            cut_off:            m.cut_off,
            unknown:            m.unknown,
            invalid_weights:    m.invalid_weights,
        }
    }
}

/// Expand bridge metrics into rows, bridge by bridge.
pub fn bridge_rows(metrics: &BTreeMap<BridgeId, BridgeMetrics>) -> Vec<BridgeMetricsRow> {
    let mut rows = Vec::new();
    for (id, m) in metrics {
        for (direction, dm) in &m.by_direction {
            rows.push(BridgeMetricsRow::new(id, Some(direction), dm));
        }
        rows.push(BridgeMetricsRow::new(id, None, &m.total));
    }
    rows
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentMetricsRow {
    /// `source` followed by `source_oid`.
    pub segment_key:    String,
    pub source:         String,
    pub source_oid:     i64,
    pub direction:      Option<String>,
    pub traversals:     u64,
    pub job_traversals: f64,
}

impl SegmentMetricsRow {
    fn new(m: &SegmentMetrics, direction: Option<&Direction>, c: &SegmentCounts) -> Self {
        Self {
            segment_key:    m.key(),
            source:         m.source.clone(),
            source_oid:     m.source_oid,
            direction:      direction.map(Direction::to_string),
            traversals:     c.traversals,
            job_traversals: c.job_traversals,
        }
    }
}

pub fn segment_rows(metrics: &[SegmentMetrics]) -> Vec<SegmentMetricsRow> {
    let mut rows = Vec::new();
    for m in metrics {
        for (direction, c) in &m.by_direction {
            rows.push(SegmentMetricsRow::new(m, Some(direction), c));
        }
        rows.push(SegmentMetricsRow::new(m, None, &m.total));
    }
    rows
}
