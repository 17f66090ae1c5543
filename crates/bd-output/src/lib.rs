//! `bd-output`: result sinks for the bridge-detour analysis.
//!
//! Two backends are provided, the second behind a Cargo feature:
//!
//! | Feature   | Backend | Files created                                                  |
//! |-----------|---------|----------------------------------------------------------------|
//! | *(none)*  | CSV     | `detours_<direction>.csv`, `bridge_metrics.csv`, `segment_metrics.csv` |
//! | `sqlite`  | SQLite  | `detours.db`                                                   |
//!
//! Both implement [`ResultSink`], and both can hand back the records of a
//! completed direction so an interrupted run resumes where it stopped.
//!
//! # Usage
//!
//! ```rust,ignore
//! use bd_output::{CsvSink, ResultSink};
//!
//! let mut sink = CsvSink::new(Path::new("./output"))?;
//! let records = match sink.load_direction(&direction)? {
//!     Some(done) => done,
//!     None => {
//!         let run = engine.run_direction(&set, &origins, &progress)?;
//!         sink.write_detour_records(&direction, &run.records)?;
//!         run.records
//!     }
//! };
//! sink.finish()?;
//! ```

pub mod csv;
pub mod error;
pub mod row;
pub mod sink;

#[cfg(feature = "sqlite")]
pub mod sqlite;


pub use csv::CsvSink;
pub use error::{OutputError, OutputResult};
pub use row::{BridgeMetricsRow, SegmentMetricsRow, bridge_rows, segment_rows};
pub use sink::ResultSink;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSink;
