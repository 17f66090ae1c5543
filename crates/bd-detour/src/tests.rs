//! Unit tests for bd-detour.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use bd_core::{AnalysisConfig, Bridge, Business, BusinessId, DestinationSet, Direction, MapPoint};
use bd_network::{
    Barriers, BridgeIndex, DijkstraSolver, InputEdge, PathOutcome, RoadNetwork, RoadNetworkBuilder,
    Solver, SolverError, SolverResult, Targets,
};

use crate::{DetourEngine, DetourOutcome, DirectionRun, NoopProgress, ProgressObserver, RunStats};

// ── Helpers ───────────────────────────────────────────────────────────────────

const MILE: f64 = 5_280.0;

/// Line A–B–C, two miles between neighbours, cost 1 per hop.  With
/// `with_detour`, an A–C road of cost 5 bows far away from B.
fn scenario(with_detour: bool) -> RoadNetwork {
    let mut b = RoadNetworkBuilder::new();
    let a = b.add_node(MapPoint::new(0.0, 0.0));
    let bn = b.add_node(MapPoint::new(2.0 * MILE, 0.0));
    let c = b.add_node(MapPoint::new(4.0 * MILE, 0.0));
    let s1 = b.add_segment("Network_LocalStreets", 1);
    let s2 = b.add_segment("Network_LocalStreets", 2);
    let s3 = b.add_segment("Network_LocalStreets", 3);
    b.add_road(a, bn, 1.0, s1);
    b.add_road(bn, c, 1.0, s2);
    if with_detour {
        b.add_edge(InputEdge {
            from:          a,
            to:            c,
            cost:          5.0,
            segment:       s3,
            bidirectional: true,
            shape:         vec![MapPoint::new(0.0, 10.0 * MILE), MapPoint::new(4.0 * MILE, 10.0 * MILE)],
        });
    }
    b.build(&BTreeSet::new()).unwrap()
}

fn bridge_at_b() -> Vec<Bridge> {
    vec![Bridge::new("B", MapPoint::new(2.0 * MILE, 0.0))]
}

fn east() -> DestinationSet {
    DestinationSet::new("East", vec![MapPoint::new(4.0 * MILE, 0.0)])
}

fn business(id: u32, pos: MapPoint, truck_int: f64) -> Business {
    Business::new(BusinessId(id), pos, truck_int).divide_intensity(1)
}

fn run_with<S: Solver>(
    network:    &RoadNetwork,
    bridges:    &[Bridge],
    businesses: &[Business],
    solver:     S,
    config:     &AnalysisConfig,
) -> DirectionRun {
    let index = BridgeIndex::build(network, bridges, config.proximity_tolerance);
    let engine = DetourEngine::new(network, &index, solver, config);
    let origins = engine.snap_businesses(businesses);
    engine.run_direction(&east(), &origins, &NoopProgress).unwrap()
}

fn run(network: &RoadNetwork, bridges: &[Bridge], businesses: &[Business]) -> DirectionRun {
    run_with(network, bridges, businesses, DijkstraSolver, &AnalysisConfig::default())
}

/// Delegates baselines to Dijkstra and fails every barred solve.
struct FailBarred;

impl Solver for FailBarred {
    fn shortest_path(
        &self,
        network:  &RoadNetwork,
        origin:   bd_core::NodeId,
        targets:  &Targets,
        barriers: &Barriers,
    ) -> SolverResult<PathOutcome> {
        if barriers.is_empty() {
            DijkstraSolver.shortest_path(network, origin, targets, barriers)
        } else {
            Err(SolverError::NoTargets)
        }
    }
}

/// Fails every solve.
struct AlwaysFail;

impl Solver for AlwaysFail {
    fn shortest_path(
        &self,
        _network:  &RoadNetwork,
        origin:    bd_core::NodeId,
        _targets:  &Targets,
        _barriers: &Barriers,
    ) -> SolverResult<PathOutcome> {
        Err(SolverError::OriginNotFound(origin))
    }
}

// ── Weighting ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod weighting_tests {
    use bd_core::MapPoint;

    use crate::{InvalidWeightError, distance_weighted_intensity, map_distance_miles};

    #[test]
    fn two_miles_halves_intensity() {
        assert_eq!(distance_weighted_intensity(10.0, 2.0, 1.0, 1.0), Ok(5.0));
    }

    #[test]
    fn power_and_cutoff_apply() {
        assert_eq!(distance_weighted_intensity(8.0, 2.0, 3.0, 2.0), Ok(6.0));
    }

    #[test]
    fn zero_or_negative_distance_is_invalid() {
        assert_eq!(
            distance_weighted_intensity(10.0, 0.0, 1.0, 1.0),
            Err(InvalidWeightError { distance_miles: 0.0 })
        );
        assert!(distance_weighted_intensity(10.0, -1.0, 1.0, 1.0).is_err());
        assert!(distance_weighted_intensity(10.0, f64::NAN, 1.0, 1.0).is_err());
    }

    #[test]
    fn map_distance_converts_to_miles() {
        let d = map_distance_miles(MapPoint::new(0.0, 0.0), MapPoint::new(3_000.0, 4_000.0), 5_000.0);
        assert!((d - 1.0).abs() < 1e-12);
    }
}

// ── Records ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod record_tests {
    use bd_core::{BusinessId, Direction};

    use crate::{DetourKey, DetourOutcome, DetourRecord};

    fn key() -> DetourKey {
        DetourKey { business: BusinessId(1), bridge: "B".into(), direction: Direction::from("East") }
    }

    #[test]
    fn detoured_derives_detour_time() {
        let r = DetourRecord::detoured(key(), 2.0, 5.0).with_weights(2.0, 10.0, Some(5.0));
        assert_eq!(r.outcome, DetourOutcome::Detoured);
        assert_eq!(r.detour_time, Some(3.0));
        assert_eq!(r.job_detour_time(), Some(30.0));
        assert_eq!(r.dw_job_detour_time(), Some(15.0));
        assert_eq!(r.key(), key());
    }

    #[test]
    fn cut_off_has_no_detour_values() {
        let r = DetourRecord::cut_off(key(), 2.0).with_weights(2.0, 10.0, Some(5.0));
        assert_eq!(r.outcome, DetourOutcome::CutOff);
        assert_eq!(r.detour_cost, None);
        assert_eq!(r.detour_time, None);
        assert_eq!(r.job_detour_time(), None);
        assert_eq!(r.dw_job_detour_time(), None);
    }

    #[test]
    fn missing_weight_leaves_dw_job_detour_unknown() {
        let r = DetourRecord::detoured(key(), 2.0, 5.0).with_weights(0.0, 10.0, None);
        assert_eq!(r.job_detour_time(), Some(30.0));
        assert_eq!(r.dw_job_detour_time(), None);
    }

    #[test]
    fn unknown_keeps_reason() {
        let r = DetourRecord::unknown(key(), 2.0, "boom");
        assert_eq!(r.outcome, DetourOutcome::Unknown);
        assert_eq!(r.reason.as_deref(), Some("boom"));
    }
}

// ── Engine scenarios ──────────────────────────────────────────────────────────

#[cfg(test)]
mod engine_tests {
    use super::*;

    #[test]
    fn closing_only_bridge_cuts_business_off() {
        let net = scenario(false);
        let run = run(&net, &bridge_at_b(), &[business(1, MapPoint::new(0.0, 0.0), 10.0)]);

        assert_eq!(run.records.len(), 1);
        let r = &run.records[0];
        assert_eq!(r.bridge_id.as_str(), "B");
        assert_eq!(r.base_cost, 2.0);
        assert_eq!(r.outcome, DetourOutcome::CutOff);
        assert_eq!(r.detour_cost, None);
        assert_eq!(r.detour_time, None);
        assert_eq!(run.stats.cut_off, 1);
    }

    #[test]
    fn alternate_road_gives_detour_of_three() {
        let net = scenario(true);
        let run = run(&net, &bridge_at_b(), &[business(1, MapPoint::new(0.0, 0.0), 10.0)]);

        assert_eq!(run.records.len(), 1);
        let r = &run.records[0];
        assert_eq!(r.outcome, DetourOutcome::Detoured);
        assert_eq!(r.base_cost, 2.0);
        assert_eq!(r.detour_cost, Some(5.0));
        assert_eq!(r.detour_time, Some(3.0));
        assert!((r.distance_miles - 2.0).abs() < 1e-12);
        assert_eq!(r.truck_int, 10.0);
        assert_eq!(r.job_detour_time(), Some(30.0));
        let dw = r.dw_intensity.unwrap();
        assert!((dw - 5.0).abs() < 1e-12);
        assert!((r.dw_job_detour_time().unwrap() - 15.0).abs() < 1e-12);
    }

    #[test]
    fn detour_time_is_never_negative() {
        let net = scenario(true);
        let businesses: Vec<Business> = (0..5)
            .map(|i| business(i, MapPoint::new(i as f64 * 100.0, 0.0), 1.0))
            .collect();
        let run = run(&net, &bridge_at_b(), &businesses);
        assert!(!run.records.is_empty());
        for r in &run.records {
            let (Some(cost), Some(time)) = (r.detour_cost, r.detour_time) else { continue };
            assert_eq!(time, cost - r.base_cost);
            assert!(time >= 0.0);
        }
    }

    #[test]
    fn no_crossings_no_records() {
        let net = scenario(true);
        let far = vec![Bridge::new("far", MapPoint::new(2.0 * MILE, 3.0 * MILE))];
        let run = run(&net, &far, &[business(1, MapPoint::new(0.0, 0.0), 10.0)]);
        assert!(run.records.is_empty());
        assert_eq!(run.stats.crossing_businesses, 0);
        assert_eq!(run.stats.unreachable_baselines, 0);
    }

    #[test]
    fn business_at_destination_has_no_records() {
        let net = scenario(false);
        let run = run(&net, &bridge_at_b(), &[business(1, MapPoint::new(4.0 * MILE, 0.0), 10.0)]);
        assert!(run.records.is_empty());
    }

    #[test]
    fn unreachable_baseline_is_skipped() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_node(MapPoint::new(0.0, 0.0));
        let bn = b.add_node(MapPoint::new(2.0 * MILE, 0.0));
        let c = b.add_node(MapPoint::new(4.0 * MILE, 0.0));
        let island = b.add_node(MapPoint::new(0.0, 8.0 * MILE));
        let island2 = b.add_node(MapPoint::new(1.0, 8.0 * MILE));
        let s = b.add_segment("Network_LocalStreets", 1);
        b.add_road(a, bn, 1.0, s);
        b.add_road(bn, c, 1.0, s);
        b.add_road(island, island2, 1.0, s);
        let net = b.build(&BTreeSet::new()).unwrap();

        let businesses = [
            business(1, MapPoint::new(0.0, 8.0 * MILE), 1.0),
            business(2, MapPoint::new(0.0, 0.0), 1.0),
        ];
        let run = run(&net, &bridge_at_b(), &businesses);
        assert_eq!(run.stats.unreachable_baselines, 1);
        assert_eq!(run.records.len(), 1);
        assert_eq!(run.records[0].business_id, BusinessId(2));
    }

    #[test]
    fn failed_barred_solve_degrades_to_unknown() {
        let net = scenario(true);
        let run = run_with(
            &net,
            &bridge_at_b(),
            &[business(1, MapPoint::new(0.0, 0.0), 10.0)],
            FailBarred,
            &AnalysisConfig::default(),
        );
        assert_eq!(run.records.len(), 1);
        let r = &run.records[0];
        assert_eq!(r.outcome, DetourOutcome::Unknown);
        assert!(r.reason.is_some());
        assert_eq!(r.detour_cost, None);
        assert_eq!(run.stats.unknown, 1);
    }

    #[test]
    fn failed_baseline_skips_business() {
        let net = scenario(true);
        let run = run_with(
            &net,
            &bridge_at_b(),
            &[business(1, MapPoint::new(0.0, 0.0), 10.0)],
            AlwaysFail,
            &AnalysisConfig::default(),
        );
        assert!(run.records.is_empty());
        assert_eq!(run.stats.baseline_errors, 1);
    }

    #[test]
    fn empty_destination_set_is_an_error() {
        let net = scenario(true);
        let config = AnalysisConfig::default();
        let index = BridgeIndex::build(&net, &bridge_at_b(), config.proximity_tolerance);
        let engine = DetourEngine::new(&net, &index, DijkstraSolver, &config);
        let empty = DestinationSet::new("North", Vec::new());
        assert!(matches!(
            engine.run_direction(&empty, &[], &NoopProgress),
            Err(crate::DetourError::NoDestinations(_))
        ));
    }

    #[test]
    fn records_follow_business_order() {
        let net = scenario(true);
        let businesses: Vec<Business> = (0..20)
            .rev()
            .map(|i| business(i, MapPoint::new(i as f64 * 10.0, 0.0), 1.0))
            .collect();
        let run = run(&net, &bridge_at_b(), &businesses);
        let ids: Vec<u32> = run.records.iter().map(|r| r.business_id.0).collect();
        let expected: Vec<u32> = (0..20).rev().collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn invalid_weight_is_recorded_not_fatal() {
        // Business sitting on the bridge: zero distance.
        let net = scenario(true);
        let bridges = vec![Bridge::new("A", MapPoint::new(0.0, 0.0))];
        let run = run(&net, &bridges, &[business(1, MapPoint::new(0.0, 0.0), 10.0)]);
        assert_eq!(run.records.len(), 1);
        assert_eq!(run.records[0].dw_intensity, None);
        assert_eq!(run.stats.invalid_weights, 1);
    }

    #[test]
    fn segment_tally_counts_each_route_once() {
        let net = scenario(true);
        let config = AnalysisConfig { calculate_network_segments: true, ..Default::default() };
        let businesses = [
            business(1, MapPoint::new(0.0, 0.0), 10.0),
            business(2, MapPoint::new(2.0 * MILE, 0.0), 4.0),
        ];
        let run = run_with(&net, &bridge_at_b(), &businesses, DijkstraSolver, &config);
        let tally = run.segments.as_ref().unwrap();
        assert_eq!(tally.len(), 3);

        let s1 = tally.get(bd_core::SegmentId(0));
        let s2 = tally.get(bd_core::SegmentId(1));
        let s3 = tally.get(bd_core::SegmentId(2));
        assert_eq!((s1.traversals, s1.job_traversals), (1, 10.0));
        assert_eq!((s2.traversals, s2.job_traversals), (2, 14.0));
        assert_eq!(s3.traversals, 0);

        // The baseline-only trace reproduces the same tally.
        let index = BridgeIndex::build(&net, &bridge_at_b(), config.proximity_tolerance);
        let engine = DetourEngine::new(&net, &index, DijkstraSolver, &config);
        let origins = engine.snap_businesses(&businesses);
        assert_eq!(&engine.trace_segments(&east(), &origins).unwrap(), tally);
    }

    #[test]
    fn segments_disabled_by_default() {
        let net = scenario(true);
        let run = run(&net, &bridge_at_b(), &[business(1, MapPoint::new(0.0, 0.0), 1.0)]);
        assert!(run.segments.is_none());
    }

    #[derive(Default)]
    struct Counting {
        started:  AtomicUsize,
        rows:     AtomicUsize,
        records:  AtomicUsize,
        finished: AtomicUsize,
    }

    impl ProgressObserver for Counting {
        fn on_direction_start(&self, _d: &Direction, _businesses: usize) {
            self.started.fetch_add(1, Ordering::Relaxed);
        }
        fn on_business_done(&self, _d: &Direction, records: usize) {
            self.rows.fetch_add(1, Ordering::Relaxed);
            self.records.fetch_add(records, Ordering::Relaxed);
        }
        fn on_direction_end(&self, _d: &Direction, _stats: &RunStats) {
            self.finished.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn observer_sees_every_row() {
        let net = scenario(true);
        let config = AnalysisConfig::default();
        let index = BridgeIndex::build(&net, &bridge_at_b(), config.proximity_tolerance);
        let engine = DetourEngine::new(&net, &index, DijkstraSolver, &config);
        let businesses: Vec<Business> =
            (0..7).map(|i| business(i, MapPoint::new(i as f64, 0.0), 1.0)).collect();
        let origins = engine.snap_businesses(&businesses);
        let obs = Counting::default();
        let run = engine.run_direction(&east(), &origins, &obs).unwrap();

        assert_eq!(obs.started.load(Ordering::Relaxed), 1);
        assert_eq!(obs.rows.load(Ordering::Relaxed), 7);
        assert_eq!(obs.records.load(Ordering::Relaxed), run.records.len());
        assert_eq!(obs.finished.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn log_progress_accepts_callbacks() {
        let net = scenario(true);
        let config = AnalysisConfig::default();
        let index = BridgeIndex::build(&net, &bridge_at_b(), config.proximity_tolerance);
        let engine = DetourEngine::new(&net, &index, DijkstraSolver, &config);
        let origins = engine.snap_businesses(&[business(1, MapPoint::new(0.0, 0.0), 1.0)]);
        let run = engine
            .run_direction(&east(), &origins, &crate::LogProgress::new(1))
            .unwrap();
        assert_eq!(run.stats.records, 1);
    }
}

// ── Aggregation ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod aggregate_tests {
    use bd_core::{Bridge, BridgeId, BusinessId, Direction, MapPoint};

    use crate::{
        DetourError, DetourKey, DetourRecord, DirectionMetrics, SegmentTally, aggregate_bridges,
        aggregate_segments,
    };

    fn dirs() -> Vec<Direction> {
        vec![Direction::from("East"), Direction::from("North")]
    }

    fn bridges() -> Vec<Bridge> {
        vec![
            Bridge::new("B1", MapPoint::new(0.0, 0.0)),
            Bridge::new("B2", MapPoint::new(1.0, 0.0)),
        ]
    }

    fn key(business: u32, bridge: &str, direction: &str) -> DetourKey {
        DetourKey {
            business:  BusinessId(business),
            bridge:    bridge.into(),
            direction: direction.into(),
        }
    }

    #[test]
    fn no_records_yields_zero_entries() {
        let metrics = aggregate_bridges(&bridges(), &dirs(), &Vec::<DetourRecord>::new()).unwrap();
        assert_eq!(metrics.len(), 2);
        for m in metrics.values() {
            assert_eq!(m.total, DirectionMetrics::default());
            assert_eq!(m.by_direction.len(), 2);
            assert!(m.by_direction.values().all(|d| *d == DirectionMetrics::default()));
        }
    }

    #[test]
    fn sums_per_direction_and_total() {
        let records = vec![
            DetourRecord::detoured(key(1, "B1", "East"), 2.0, 5.0).with_weights(2.0, 10.0, Some(5.0)),
            DetourRecord::detoured(key(2, "B1", "East"), 1.0, 2.0).with_weights(1.0, 4.0, Some(4.0)),
            DetourRecord::cut_off(key(1, "B1", "North"), 3.0).with_weights(2.0, 10.0, Some(5.0)),
            DetourRecord::unknown(key(3, "B1", "North"), 3.0, "x").with_weights(1.0, 1.0, None),
        ];
        let metrics = aggregate_bridges(&bridges(), &dirs(), &records).unwrap();
        let b1 = &metrics[&BridgeId::from("B1")];

        let e = b1.direction(&Direction::from("East"));
        assert_eq!(e.traversals, 2);
        assert_eq!(e.detours, 2);
        assert_eq!(e.detour_time, 4.0);
        assert_eq!(e.job_detour_time, 34.0);
        assert_eq!(e.dw_job_detour_time, 19.0);
        assert_eq!(e.job_traversals, 14.0);
        assert_eq!(e.dw_job_traversals, 9.0);

        let n = b1.direction(&Direction::from("North"));
        assert_eq!(n.traversals, 2);
        assert_eq!(n.cut_off, 1);
        assert_eq!(n.unknown, 1);
        assert_eq!(n.invalid_weights, 1);
        assert_eq!(n.detour_time, 0.0);

        let mut sum = DirectionMetrics::default();
        for m in b1.by_direction.values() {
            sum.accumulate(m);
        }
        assert_eq!(b1.total, sum);
        assert_eq!(b1.total.traversals, 4);

        let b2 = &metrics[&BridgeId::from("B2")];
        assert_eq!(b2.total, DirectionMetrics::default());
    }

    #[test]
    fn absent_direction_counts_as_zero() {
        let records =
            vec![DetourRecord::detoured(key(1, "B1", "East"), 2.0, 5.0).with_weights(2.0, 10.0, Some(5.0))];
        let only_east = vec![Direction::from("East")];
        let metrics = aggregate_bridges(&bridges(), &only_east, &records).unwrap();
        let b1 = &metrics[&BridgeId::from("B1")];
        assert_eq!(b1.direction(&Direction::from("West")), DirectionMetrics::default());
        assert_eq!(b1.total.detour_time, 3.0);
    }

    #[test]
    fn unknown_bridge_is_rejected() {
        let records = vec![DetourRecord::cut_off(key(1, "ghost", "East"), 1.0)];
        assert!(matches!(
            aggregate_bridges(&bridges(), &dirs(), &records),
            Err(DetourError::UnknownBridge { .. })
        ));
    }

    #[test]
    fn segment_metrics_cover_every_segment() {
        let net = super::scenario(true);
        let mut east = SegmentTally::new(net.segment_count());
        east.add_route(&[bd_core::SegmentId(0), bd_core::SegmentId(0), bd_core::SegmentId(1)], 2.0);
        let mut north = SegmentTally::new(net.segment_count());
        north.add_route(&[bd_core::SegmentId(1)], 3.0);

        let metrics = aggregate_segments(
            &net,
            &[(Direction::from("East"), east), (Direction::from("North"), north)],
        );
        assert_eq!(metrics.len(), 3);
        assert_eq!(metrics[0].key(), "Network_LocalStreets1");
        assert_eq!(metrics[0].total.traversals, 1);
        assert_eq!(metrics[0].total.job_traversals, 2.0);
        assert_eq!(metrics[1].total.traversals, 2);
        assert_eq!(metrics[1].total.job_traversals, 5.0);
        assert_eq!(metrics[2].total.traversals, 0);
        assert_eq!(metrics[2].by_direction.len(), 2);
    }
}
