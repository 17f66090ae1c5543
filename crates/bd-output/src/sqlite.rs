//! SQLite output backend (feature `sqlite`).
//!
//! Creates a single `detours.db` file in the configured output directory
//! with tables `detours`, `completed_directions`, `bridge_metrics` and
//! `segment_metrics`.  A direction's records and its completion marker are
//! written in one transaction.

use std::collections::BTreeMap;
use std::path::Path;

use log::info;
use rusqlite::{Connection, OptionalExtension};

use bd_core::{BridgeId, BusinessId, Direction};
use bd_detour::{BridgeMetrics, DetourOutcome, DetourRecord, SegmentMetrics};

use crate::row::{bridge_rows, segment_rows};
use crate::sink::ResultSink;
use crate::{OutputError, OutputResult};

/// One `detours` row as stored.
struct StoredRow {
    business_id:    u32,
    bridge_id:      String,
    outcome:        String,
    base_cost:      f64,
    detour_cost:    Option<f64>,
    detour_time:    Option<f64>,
    distance_miles: f64,
    truck_int:      f64,
    dw_intensity:   Option<f64>,
    reason:         Option<String>,
}

/// Writes results to an SQLite database.
pub struct SqliteSink {
    conn:     Connection,
    finished: bool,
}

impl SqliteSink {
    /// Open (or create) `detours.db` in `dir` and initialise the schema.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        std::fs::create_dir_all(dir)?;
        let conn = Connection::open(dir.join("detours.db"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS detours (
                 business_id    INTEGER NOT NULL,
                 bridge_id      TEXT    NOT NULL,
                 direction      TEXT    NOT NULL,
                 outcome        TEXT    NOT NULL,
                 base_cost      REAL    NOT NULL,
                 detour_cost    REAL,
                 detour_time    REAL,
                 distance_miles REAL    NOT NULL,
                 truck_int      REAL    NOT NULL,
                 dw_intensity   REAL,
                 reason         TEXT
             );
             CREATE INDEX IF NOT EXISTS detours_direction ON detours (direction);
             CREATE TABLE IF NOT EXISTS completed_directions (
                 direction TEXT PRIMARY KEY
             );
             CREATE TABLE IF NOT EXISTS bridge_metrics (
                 bridge_id          TEXT    NOT NULL,
                 direction          TEXT,
                 traversals         INTEGER NOT NULL,
                 job_traversals     REAL    NOT NULL,
                 dw_job_traversals  REAL    NOT NULL,
                 detours            INTEGER NOT NULL,
                 detour_time        REAL    NOT NULL,
                 job_detour_time    REAL    NOT NULL,
                 dw_job_detour_time REAL    NOT NULL,
                 cut_off            INTEGER NOT NULL,
                 unknown            INTEGER NOT NULL,
                 invalid_weights    INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS segment_metrics (
                 segment_key    TEXT    NOT NULL,
                 source         TEXT    NOT NULL,
                 source_oid     INTEGER NOT NULL,
                 direction      TEXT,
                 traversals     INTEGER NOT NULL,
                 job_traversals REAL    NOT NULL
             );",
        )?;

        Ok(Self { conn, finished: false })
    }
}

impl ResultSink for SqliteSink {
    fn write_detour_records(&mut self, direction: &Direction, records: &[DetourRecord]) -> OutputResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM detours WHERE direction = ?1", [direction.as_str()])?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO detours \
                 (business_id, bridge_id, direction, outcome, base_cost, detour_cost, \
                  detour_time, distance_miles, truck_int, dw_intensity, reason) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for r in records {
                stmt.execute(rusqlite::params![
                    r.business_id.0,
                    r.bridge_id.as_str(),
                    r.direction.as_str(),
                    r.outcome.as_str(),
                    r.base_cost,
                    r.detour_cost,
                    r.detour_time,
                    r.distance_miles,
                    r.truck_int,
                    r.dw_intensity,
                    r.reason,
                ])?;
            }
        }
        tx.execute(
            "INSERT OR REPLACE INTO completed_directions (direction) VALUES (?1)",
            [direction.as_str()],
        )?;
        tx.commit()?;
        info!("stored {} detour records for {direction}", records.len());
        Ok(())
    }

    fn write_bridge_metrics(&mut self, metrics: &BTreeMap<BridgeId, BridgeMetrics>) -> OutputResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM bridge_metrics", [])?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO bridge_metrics \
                 (bridge_id, direction, traversals, job_traversals, dw_job_traversals, detours, \
                  detour_time, job_detour_time, dw_job_detour_time, cut_off, unknown, invalid_weights) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for row in bridge_rows(metrics) {
                stmt.execute(rusqlite::params![
                    row.bridge_id,
                    row.direction,
                    row.traversals as i64,
                    row.job_traversals,
                    row.dw_job_traversals,
                    row.detours as i64,
                    row.detour_time,
                    row.job_detour_time,
                    row.dw_job_detour_time,
                    row.cut_off as i64,
                    row.unknown as i64,
                    row.invalid_weights as i64,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_segment_metrics(&mut self, metrics: &[SegmentMetrics]) -> OutputResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM segment_metrics", [])?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO segment_metrics \
                 (segment_key, source, source_oid, direction, traversals, job_traversals) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for row in segment_rows(metrics) {
                stmt.execute(rusqlite::params![
                    row.segment_key,
                    row.source,
                    row.source_oid,
                    row.direction,
                    row.traversals as i64,
                    row.job_traversals,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_direction(&self, direction: &Direction) -> OutputResult<Option<Vec<DetourRecord>>> {
        let completed = self
            .conn
            .query_row(
                "SELECT 1 FROM completed_directions WHERE direction = ?1",
                [direction.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        if completed.is_none() {
            return Ok(None);
        }

        let mut stmt = self.conn.prepare(
            "SELECT business_id, bridge_id, outcome, base_cost, detour_cost, detour_time, \
                    distance_miles, truck_int, dw_intensity, reason \
             FROM detours WHERE direction = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map([direction.as_str()], |row| {
            Ok(StoredRow {
                business_id:    row.get(0)?,
                bridge_id:      row.get(1)?,
                outcome:        row.get(2)?,
                base_cost:      row.get(3)?,
                detour_cost:    row.get(4)?,
                detour_time:    row.get(5)?,
                distance_miles: row.get(6)?,
                truck_int:      row.get(7)?,
                dw_intensity:   row.get(8)?,
                reason:         row.get(9)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            let row = row?;
            let outcome = DetourOutcome::parse(&row.outcome)
                .ok_or_else(|| OutputError::Corrupt(format!("unknown outcome {:?}", row.outcome)))?;
            records.push(DetourRecord {
                business_id:    BusinessId(row.business_id),
                bridge_id:      BridgeId::new(row.bridge_id),
                direction:      direction.clone(),
                outcome,
                base_cost:      row.base_cost,
                detour_cost:    row.detour_cost,
                detour_time:    row.detour_time,
                distance_miles: row.distance_miles,
                truck_int:      row.truck_int,
                dw_intensity:   row.dw_intensity,
                reason:         row.reason,
            });
        }
        Ok(Some(records))
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn
            .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
