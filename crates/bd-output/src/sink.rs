//! The `ResultSink` trait implemented by all backends.

use std::collections::BTreeMap;

use bd_core::{BridgeId, Direction};
use bd_detour::{BridgeMetrics, DetourRecord, SegmentMetrics};

use crate::OutputResult;

/// Persistence boundary of an analysis run.
///
/// Detour records are stored one direction at a time; a direction counts as
/// complete once `write_detour_records` returns, which is what
/// [`load_direction`](Self::load_direction) keys on when a run resumes.
pub trait ResultSink {
    /// Store every record of `direction`, replacing anything stored for it
    /// before.
    fn write_detour_records(&mut self, direction: &Direction, records: &[DetourRecord]) -> OutputResult<()>;

    fn write_bridge_metrics(&mut self, metrics: &BTreeMap<BridgeId, BridgeMetrics>) -> OutputResult<()>;

    fn write_segment_metrics(&mut self, metrics: &[SegmentMetrics]) -> OutputResult<()>;

    /// Records of a previously completed direction, or `None` if it was
    /// never completed.
    fn load_direction(&self, direction: &Direction) -> OutputResult<Option<Vec<DetourRecord>>>;

    /// Flush and close all underlying handles.
    ///
    /// Idempotent; safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
