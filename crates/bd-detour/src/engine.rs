//! The detour orchestrator.
//!
//! # Per-direction run
//!
//! ```text
//! targets = snap(destination points)
//! for each business (parallel with the `parallel` feature):
//!   ① Baseline : shortest path with no barriers.  Unreachable → warn, skip.
//!   ② Crossings: bridges within tolerance of any traversed arc.
//!   ③ Barred   : one re-solve per crossed bridge with that bridge barred:
//!                   Reached      → Detoured { detour_cost, detour_time }
//!                   Unreachable  → CutOff
//!                   SolverError  → Unknown (logged, run continues)
//! merge rows in business order
//! ```
//!
//! The network and bridge index are shared read-only; every solver call gets
//! its own barrier set, so rows are independent and the merge is the only
//! sequential step.

use log::{debug, error, warn};

use bd_core::{AnalysisConfig, Business, DestinationSet, Direction, NodeId, SegmentId};
use bd_network::{Barriers, BridgeIndex, PathOutcome, Route, RoadNetwork, Solver, Targets};

use crate::aggregate::SegmentTally;
use crate::observer::{NoopProgress, ProgressObserver};
use crate::record::{DetourKey, DetourOutcome, DetourRecord};
use crate::weighting::{distance_weighted_intensity, map_distance_miles};
use crate::{DetourError, DetourResult};

// ── Public result types ───────────────────────────────────────────────────────

/// A business joined to the network.
#[derive(Clone, Debug, PartialEq)]
pub struct Origin {
    pub business: Business,
    pub node:     NodeId,
}

/// Counters for one direction run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub businesses:            usize,
    pub unreachable_baselines: usize,
    /// Baselines abandoned because the solver failed.
    pub baseline_errors:       usize,
    /// Businesses whose baseline crosses at least one bridge.
    pub crossing_businesses:   usize,
    pub records:               usize,
    pub cut_off:               usize,
    pub unknown:               usize,
    pub invalid_weights:       usize,
}

/// Everything one direction run produced.
#[derive(Clone, Debug)]
pub struct DirectionRun {
    pub direction: Direction,
    /// In business order, then bridge order.
    pub records:   Vec<DetourRecord>,
    /// Present when segment aggregation is enabled.
    pub segments:  Option<SegmentTally>,
    pub stats:     RunStats,
}

// ── Per-business row ──────────────────────────────────────────────────────────

enum Baseline {
    Reached,
    Unreachable,
    Failed,
}

struct BusinessRow {
    baseline:        Baseline,
    records:         Vec<DetourRecord>,
    segments:        Vec<SegmentId>,
    truck_int:       f64,
    invalid_weights: usize,
}

impl BusinessRow {
    fn empty(baseline: Baseline, truck_int: f64) -> Self {
        Self { baseline, records: Vec::new(), segments: Vec::new(), truck_int, invalid_weights: 0 }
    }
}

// ── DetourEngine ──────────────────────────────────────────────────────────────

/// Runs baseline and barred solves for every business of a direction.
pub struct DetourEngine<'a, S: Solver> {
    network:  &'a RoadNetwork,
    bridges:  &'a BridgeIndex,
    solver:   S,
    config:   &'a AnalysisConfig,
    /// Barrier set per bridge index, built once.
    barriers: Vec<Barriers>,
}

impl<'a, S: Solver> DetourEngine<'a, S> {
    pub fn new(
        network: &'a RoadNetwork,
        bridges: &'a BridgeIndex,
        solver:  S,
        config:  &'a AnalysisConfig,
    ) -> Self {
        let barriers = (0..bridges.len()).map(|i| bridges.barriers_for(i)).collect();
        Self { network, bridges, solver, config, barriers }
    }

    /// Snap each business onto the nearest node with a snappable arc.
    ///
    /// Businesses that cannot snap are logged and dropped.
    pub fn snap_businesses(&self, businesses: &[Business]) -> Vec<Origin> {
        businesses
            .iter()
            .filter_map(|b| match self.network.snap_to_snappable_node(b.pos) {
                Some(node) => Some(Origin { business: b.clone(), node }),
                None => {
                    warn!("business {} cannot snap to any snappable street; skipped", b.id);
                    None
                }
            })
            .collect()
    }

    /// Snap a destination set onto the network, keeping point order.
    pub fn targets_for(&self, set: &DestinationSet) -> DetourResult<Targets> {
        let targets = Targets::new(set.points.iter().filter_map(|&p| self.network.snap_to_node(p)));
        if targets.is_empty() {
            return Err(DetourError::NoDestinations(set.direction.clone()));
        }
        Ok(targets)
    }

    /// Baseline, crossing detection and barred re-solves for every origin.
    ///
    /// # Errors
    ///
    /// [`DetourError::NoDestinations`] if no destination of `set` snaps.
    /// Per-record failures never surface here; they become `Unknown` records.
    pub fn run_direction(
        &self,
        set:      &DestinationSet,
        origins:  &[Origin],
        observer: &dyn ProgressObserver,
    ) -> DetourResult<DirectionRun> {
        let direction = &set.direction;
        let targets = self.targets_for(set)?;
        observer.on_direction_start(direction, origins.len());

        let rows = self.solve_all(origins, &targets, direction, true, observer);

        let mut stats = RunStats { businesses: origins.len(), ..RunStats::default() };
        let mut records = Vec::new();
        let mut tally = self
            .config
            .calculate_network_segments
            .then(|| SegmentTally::new(self.network.segment_count()));

        for row in rows {
            match row.baseline {
                Baseline::Reached => {}
                Baseline::Unreachable => stats.unreachable_baselines += 1,
                Baseline::Failed => stats.baseline_errors += 1,
            }
            if let Some(tally) = tally.as_mut() {
                tally.add_route(&row.segments, row.truck_int);
            }
            if !row.records.is_empty() {
                stats.crossing_businesses += 1;
            }
            stats.invalid_weights += row.invalid_weights;
            for r in &row.records {
                match r.outcome {
                    DetourOutcome::CutOff => stats.cut_off += 1,
                    DetourOutcome::Unknown => stats.unknown += 1,
                    DetourOutcome::Detoured => {}
                }
            }
            records.extend(row.records);
        }
        stats.records = records.len();

        observer.on_direction_end(direction, &stats);
        Ok(DirectionRun { direction: direction.clone(), records, segments: tally, stats })
    }

    /// Baseline-only pass that rebuilds the segment tally of a direction,
    /// for runs that resume with that direction's records already stored.
    pub fn trace_segments(&self, set: &DestinationSet, origins: &[Origin]) -> DetourResult<SegmentTally> {
        let targets = self.targets_for(set)?;
        let rows = self.solve_all(origins, &targets, &set.direction, false, &NoopProgress);
        let mut tally = SegmentTally::new(self.network.segment_count());
        for row in rows {
            tally.add_route(&row.segments, row.truck_int);
        }
        Ok(tally)
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn solve_all(
        &self,
        origins:   &[Origin],
        targets:   &Targets,
        direction: &Direction,
        barred:    bool,
        observer:  &dyn ProgressObserver,
    ) -> Vec<BusinessRow> {
        let solve = |origin: &Origin| {
            let row = self.solve_row(origin, targets, direction, barred);
            observer.on_business_done(direction, row.records.len());
            row
        };

        #[cfg(not(feature = "parallel"))]
        {
            origins.iter().map(solve).collect()
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            // `collect` on an indexed parallel iterator keeps input order.
            origins.par_iter().map(solve).collect()
        }
    }

    fn solve_row(
        &self,
        origin:    &Origin,
        targets:   &Targets,
        direction: &Direction,
        barred:    bool,
    ) -> BusinessRow {
        let business = &origin.business;
        let route = match self.solver.shortest_path(self.network, origin.node, targets, &Barriers::none()) {
            Ok(PathOutcome::Reached(route)) => route,
            Ok(PathOutcome::Unreachable) => {
                warn!("{direction}: business {} has no route to any destination", business.id);
                return BusinessRow::empty(Baseline::Unreachable, business.truck_int);
            }
            Err(e) => {
                error!("{direction}: baseline for business {} failed: {e}", business.id);
                return BusinessRow::empty(Baseline::Failed, business.truck_int);
            }
        };

        let mut row = BusinessRow::empty(Baseline::Reached, business.truck_int);
        if self.config.calculate_network_segments || !barred {
            row.segments = route.edges.iter().map(|e| self.network.edge_segment[e.index()]).collect();
        }
        if barred {
            self.barred_runs(origin, targets, direction, &route, &mut row);
        }
        row
    }

    fn barred_runs(
        &self,
        origin:    &Origin,
        targets:   &Targets,
        direction: &Direction,
        route:     &Route,
        row:       &mut BusinessRow,
    ) {
        let business = &origin.business;
        let crossed = self.bridges.crossed_indices(&route.edges);
        debug!(
            "{direction}: business {} base cost {} crosses {} bridges",
            business.id,
            route.cost,
            crossed.len()
        );

        for idx in crossed {
            let bridge = self.bridges.bridge(idx);
            let key = DetourKey {
                business:  business.id,
                bridge:    bridge.id.clone(),
                direction: direction.clone(),
            };

            let miles = map_distance_miles(business.pos, bridge.pos, self.config.map_units_per_mile);
            let dw = match distance_weighted_intensity(
                business.truck_int,
                miles,
                self.config.cutoff,
                self.config.power,
            ) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("{direction}: business {} / bridge {}: {e}", business.id, bridge.id);
                    row.invalid_weights += 1;
                    None
                }
            };

            let record = match self.solver.shortest_path(self.network, origin.node, targets, &self.barriers[idx]) {
                Ok(PathOutcome::Reached(detour)) => DetourRecord::detoured(key, route.cost, detour.cost),
                Ok(PathOutcome::Unreachable) => DetourRecord::cut_off(key, route.cost),
                Err(e) => {
                    error!(
                        "{direction}: barred solve for business {} / bridge {} failed: {e}",
                        business.id, bridge.id
                    );
                    DetourRecord::unknown(key, route.cost, e.to_string())
                }
            };
            row.records.push(record.with_weights(miles, business.truck_int, dw));
        }
    }
}
