//! `bd-core`: foundational types for the bridge-detour analysis.
//!
//! This crate is a dependency of every other `bd-*` crate.  It intentionally
//! has no `bd-*` dependencies and minimal external ones (only `thiserror`,
//! plus optional `serde`).
//!
//! # What lives here
//!
//! | Module     | Contents                                                    |
//! |------------|-------------------------------------------------------------|
//! | [`ids`]    | `NodeId`, `EdgeId`, `SegmentId`, `BusinessId`, `BridgeId`, `Direction` |
//! | [`geo`]    | `MapPoint`, planar distance and point-to-segment distance   |
//! | [`model`]  | `Business`, `Bridge`, `DestinationSet`                      |
//! | [`config`] | `AnalysisConfig`                                            |
//! | [`error`]  | `CoreError`, `CoreResult`                                   |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod model;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::AnalysisConfig;
pub use error::{CoreError, CoreResult};
pub use geo::MapPoint;
pub use ids::{BridgeId, BusinessId, Direction, EdgeId, NodeId, SegmentId};
pub use model::{Bridge, Business, DestinationSet};
