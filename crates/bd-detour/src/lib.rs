//! `bd-detour`: detour orchestration and impact aggregation.
//!
//! # Pipeline
//!
//! ```text
//! for direction in destination sets:
//!   DetourEngine::run_direction   → Vec<DetourRecord> (+ SegmentTally)
//! aggregate_bridges(all records)  → BridgeId → BridgeMetrics
//! aggregate_segments(tallies)     → Vec<SegmentMetrics>
//! ```
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                 |
//! |------------|--------------------------------------------------------|
//! | `parallel` | Solves businesses on Rayon's thread pool.              |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use bd_detour::{DetourEngine, LogProgress, aggregate_bridges};
//! use bd_network::{BridgeIndex, DijkstraSolver};
//!
//! let index  = BridgeIndex::build(&network, &bridges, config.proximity_tolerance);
//! let engine = DetourEngine::new(&network, &index, DijkstraSolver, &config);
//! let origins = engine.snap_businesses(&businesses);
//! let run = engine.run_direction(&destinations[0], &origins, &LogProgress::new(100))?;
//! let metrics = aggregate_bridges(&bridges, &[run.direction.clone()], &run.records)?;
//! ```

pub mod aggregate;
pub mod engine;
pub mod error;
pub mod observer;
pub mod record;
pub mod weighting;

#[cfg(test)]
mod tests;

pub use aggregate::{
    BridgeMetrics, DirectionMetrics, SegmentCounts, SegmentMetrics, SegmentTally,
    aggregate_bridges, aggregate_segments,
};
pub use engine::{DetourEngine, DirectionRun, Origin, RunStats};
pub use error::{DetourError, DetourResult};
pub use observer::{LogProgress, NoopProgress, ProgressObserver};
pub use record::{DetourKey, DetourOutcome, DetourRecord};
pub use weighting::{InvalidWeightError, distance_weighted_intensity, map_distance_miles};
