//! CSV output backend.
//!
//! Creates, in the configured output directory:
//! - `detours_<direction>.csv`, one per completed direction
//! - `bridge_metrics.csv`
//! - `segment_metrics.csv` (segment aggregation only)
//!
//! A direction file is written under a `.partial` name and renamed once
//! complete, so an interrupted run never leaves a file that looks finished.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use csv::Writer;
use log::{debug, info};
use serde::Serialize;

use bd_core::{BridgeId, Direction};
use bd_detour::{BridgeMetrics, DetourRecord, SegmentMetrics};

use crate::row::{bridge_rows, segment_rows};
use crate::sink::ResultSink;
use crate::{OutputError, OutputResult};

/// Writes results as CSV files in one directory.
pub struct CsvSink {
    dir:      PathBuf,
    finished: bool,
}

impl CsvSink {
    /// Use `dir` for output, creating it if needed.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self { dir: dir.to_path_buf(), finished: false })
    }

    /// Path of the detour file for `direction`.
    pub fn detour_path(&self, direction: &Direction) -> PathBuf {
        self.dir.join(format!("detours_{}.csv", file_stem(direction)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Direction name reduced to characters safe in a file name.
///
/// ASCII letters, digits and `-` pass through; every other byte, `_`
/// included, becomes `_XX` (upper-case hex).  Distinct names therefore never
/// share a file.
fn file_stem(direction: &Direction) -> String {
    let mut stem = String::with_capacity(direction.as_str().len());
    for b in direction.as_str().bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' {
            stem.push(b as char);
        } else {
            stem.push_str(&format!("_{b:02X}"));
        }
    }
    stem
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> OutputResult<()> {
    let mut w = Writer::from_path(path)?;
    for row in rows {
        w.serialize(row)?;
    }
    w.flush()?;
    Ok(())
}

impl ResultSink for CsvSink {
    fn write_detour_records(&mut self, direction: &Direction, records: &[DetourRecord]) -> OutputResult<()> {
        let path = self.detour_path(direction);
        let partial = path.with_extension("csv.partial");
        write_rows(&partial, records)?;
        fs::rename(&partial, &path)?;
        info!("wrote {} detour records to {}", records.len(), path.display());
        Ok(())
    }

    fn write_bridge_metrics(&mut self, metrics: &BTreeMap<BridgeId, BridgeMetrics>) -> OutputResult<()> {
        let path = self.dir.join("bridge_metrics.csv");
        write_rows(&path, &bridge_rows(metrics))?;
        info!("wrote metrics for {} bridges to {}", metrics.len(), path.display());
        Ok(())
    }

    fn write_segment_metrics(&mut self, metrics: &[SegmentMetrics]) -> OutputResult<()> {
        let path = self.dir.join("segment_metrics.csv");
        write_rows(&path, &segment_rows(metrics))?;
        info!("wrote metrics for {} segments to {}", metrics.len(), path.display());
        Ok(())
    }

    fn load_direction(&self, direction: &Direction) -> OutputResult<Option<Vec<DetourRecord>>> {
        let path = self.detour_path(direction);
        if !path.exists() {
            return Ok(None);
        }
        let mut rdr = csv::Reader::from_path(&path)?;
        let records = rdr.deserialize().collect::<Result<Vec<DetourRecord>, _>>()?;
        if let Some(stray) = records.iter().find(|r| &r.direction != direction) {
            return Err(OutputError::Corrupt(format!(
                "{} holds a record for direction {}, expected {direction}",
                path.display(),
                stray.direction
            )));
        }
        debug!("reloaded {} records from {}", records.len(), path.display());
        Ok(Some(records))
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        // Every file is complete as soon as its write call returns; drop any
        // partial file left by an earlier interrupted run.
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "partial") {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}
