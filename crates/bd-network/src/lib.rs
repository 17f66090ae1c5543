//! `bd-network`: road network, barrier-constrained routing, and bridge
//! crossing detection.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                   |
//! |--------------|------------------------------------------------------------|
//! | [`network`]  | `RoadNetwork` (CSR + R-tree), `RoadNetworkBuilder`, `Segment` |
//! | [`solver`]   | `Solver` trait, `DijkstraSolver`, `Barriers`, `Targets`, `PathOutcome` |
//! | [`crossing`] | `BridgeIndex`: bridge ↔ arc association                    |
//! | [`provider`] | `NetworkProvider` trait, `CsvProvider`                     |
//! | [`error`]    | `NetworkError`, `SolverError`                              |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on `bd-core` types.        |

pub mod crossing;
pub mod error;
pub mod network;
pub mod provider;
pub mod solver;


pub use crossing::BridgeIndex;
pub use error::{NetworkError, NetworkResult, SolverError, SolverResult};
pub use network::{InputEdge, RoadNetwork, RoadNetworkBuilder, Segment};
pub use provider::{CsvProvider, NetworkProvider};
pub use solver::{Barriers, DijkstraSolver, PathOutcome, Route, Solver, Targets};
