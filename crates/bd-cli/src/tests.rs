//! Tests for argument handling and the per-direction loop.

// ── Arguments and config ──────────────────────────────────────────────────────

#[cfg(test)]
mod cli_tests {
    use std::io::Write;

    use clap::Parser;

    use bd_core::{AnalysisConfig, Direction};

    use crate::cli::Cli;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(["bridge-detour", "-i", "in", "-o", "out"].iter().chain(args))
    }

    #[test]
    fn defaults_without_flags() {
        let config = parse(&[]).analysis_config().unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&[
            "--tolerance", "10", "--power", "2", "--segments",
            "--direction", "North", "--direction", "East",
            "--snappable", "Network_LocalStreets", "-j", "4",
        ]);
        let config = cli.analysis_config().unwrap();
        assert_eq!(config.proximity_tolerance, 10.0);
        assert_eq!(config.power, 2.0);
        assert!(config.calculate_network_segments);
        assert_eq!(config.directions, vec![Direction::from("North"), Direction::from("East")]);
        assert_eq!(config.snappable_sources, vec!["Network_LocalStreets".to_string()]);
        assert_eq!(config.num_threads, Some(4));
    }

    #[test]
    fn config_file_then_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "cutoff": 3.0, "power": 0.5, "progress_interval": 10 }}"#).unwrap();
        let path = file.path().to_str().unwrap().to_owned();
        let config = parse(&["--config", &path, "--power", "1.5"]).analysis_config().unwrap();
        assert_eq!(config.cutoff, 3.0);
        assert_eq!(config.power, 1.5);
        assert_eq!(config.progress_interval, 10);
        assert_eq!(config.map_units_per_mile, 5_280.0);
    }

    #[test]
    fn invalid_override_rejected() {
        assert!(parse(&["--tolerance", "0"]).analysis_config().is_err());
        assert!(parse(&["-j", "0"]).analysis_config().is_err());
    }
}

// ── Resume ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod run_tests {
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tempfile::TempDir;

    use bd_core::{AnalysisConfig, Bridge, Business, BusinessId, DestinationSet, Direction, MapPoint};
    use bd_detour::{DetourEngine, DetourOutcome, DetourRecord, ProgressObserver};
    use bd_network::{BridgeIndex, DijkstraSolver, RoadNetwork, RoadNetworkBuilder};
    use bd_output::{CsvSink, ResultSink};

    use crate::run::run_directions;

    /// Counts directions that were actually solved.
    #[derive(Default)]
    struct SolvedDirections(AtomicUsize);

    impl ProgressObserver for SolvedDirections {
        fn on_direction_start(&self, _direction: &Direction, _businesses: usize) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl SolvedDirections {
        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// A(0,0) - B(100,0) - C(200,0), cost 1 per hop, plus a cost-5 A-C road
    /// that stays far from the bridge at B.
    struct Fixture {
        network: RoadNetwork,
        index:   BridgeIndex,
        config:  AnalysisConfig,
        sets:    Vec<DestinationSet>,
        biz:     Vec<Business>,
    }

    impl Fixture {
        fn new(segments: bool) -> Self {
            let mut b = RoadNetworkBuilder::new();
            let a = b.add_node(MapPoint::new(0.0, 0.0));
            let bn = b.add_node(MapPoint::new(100.0, 0.0));
            let c = b.add_node(MapPoint::new(200.0, 0.0));
            let s1 = b.add_segment("Network_LocalStreets", 1);
            let s2 = b.add_segment("Network_LocalStreets", 2);
            let s3 = b.add_segment("Network_LocalStreets", 3);
            b.add_road(a, bn, 1.0, s1);
            b.add_road(bn, c, 1.0, s2);
            b.add_edge(bd_network::InputEdge {
                from:          a,
                to:            c,
                cost:          5.0,
                segment:       s3,
                bidirectional: true,
                shape:         vec![MapPoint::new(0.0, 500.0), MapPoint::new(200.0, 500.0)],
            });
            let network = b.build(&BTreeSet::new()).unwrap();

            let config = AnalysisConfig { calculate_network_segments: segments, ..Default::default() };
            let bridges = vec![Bridge::new("B", MapPoint::new(100.0, 0.0))];
            let index = BridgeIndex::build(&network, &bridges, config.proximity_tolerance);
            let sets = vec![
                DestinationSet::new("East", vec![MapPoint::new(200.0, 0.0)]),
                DestinationSet::new("West", vec![MapPoint::new(0.0, 0.0)]),
            ];
            let biz = vec![Business::new(BusinessId(1), MapPoint::new(0.0, 0.0), 10.0)];
            Self { network, index, config, sets, biz }
        }

        fn engine(&self) -> DetourEngine<'_, DijkstraSolver> {
            DetourEngine::new(&self.network, &self.index, DijkstraSolver, &self.config)
        }
    }

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    #[test]
    fn second_run_reuses_stored_directions() {
        let fx = Fixture::new(false);
        let engine = fx.engine();
        let origins = engine.snap_businesses(&fx.biz);
        let dir = tmp();
        let mut sink = CsvSink::new(dir.path()).unwrap();

        let first_obs = SolvedDirections::default();
        let first = run_directions(&engine, &fx.sets, &origins, &mut sink, false, false, &first_obs).unwrap();
        assert_eq!(first_obs.count(), 2);
        assert!(first.reused.is_empty());
        assert_eq!(first.records.len(), 1);
        assert_eq!(first.records[0].outcome, DetourOutcome::Detoured);
        assert_eq!(first.records[0].detour_time, Some(3.0));

        let second_obs = SolvedDirections::default();
        let second = run_directions(&engine, &fx.sets, &origins, &mut sink, false, false, &second_obs).unwrap();
        assert_eq!(second_obs.count(), 0);
        assert_eq!(second.reused, vec![Direction::from("East"), Direction::from("West")]);
        assert_eq!(second.records, first.records);
    }

    #[test]
    fn stored_records_win_over_recomputing() {
        let fx = Fixture::new(false);
        let engine = fx.engine();
        let origins = engine.snap_businesses(&fx.biz);
        let dir = tmp();
        let mut sink = CsvSink::new(dir.path()).unwrap();
        let east = Direction::from("East");
        sink.write_detour_records(&east, &Vec::<DetourRecord>::new()).unwrap();

        let obs = SolvedDirections::default();
        let out = run_directions(&engine, &fx.sets, &origins, &mut sink, false, false, &obs).unwrap();
        assert_eq!(obs.count(), 1);
        assert_eq!(out.reused, vec![east]);
        assert!(out.records.is_empty());
    }

    #[test]
    fn fresh_ignores_stored_directions() {
        let fx = Fixture::new(false);
        let engine = fx.engine();
        let origins = engine.snap_businesses(&fx.biz);
        let dir = tmp();
        let mut sink = CsvSink::new(dir.path()).unwrap();
        let east = Direction::from("East");
        sink.write_detour_records(&east, &Vec::<DetourRecord>::new()).unwrap();

        let obs = SolvedDirections::default();
        let out = run_directions(&engine, &fx.sets, &origins, &mut sink, true, false, &obs).unwrap();
        assert_eq!(obs.count(), 2);
        assert!(out.reused.is_empty());
        assert_eq!(out.records.len(), 1);
        // The recomputed direction replaced the stored one.
        assert_eq!(sink.load_direction(&east).unwrap().unwrap(), out.records);
    }

    #[test]
    fn resumed_run_rebuilds_segment_tallies() {
        let fx = Fixture::new(true);
        let engine = fx.engine();
        let origins = engine.snap_businesses(&fx.biz);
        let dir = tmp();
        let mut sink = CsvSink::new(dir.path()).unwrap();

        let first = run_directions(&engine, &fx.sets, &origins, &mut sink, false, true, &SolvedDirections::default())
            .unwrap();
        let second = run_directions(&engine, &fx.sets, &origins, &mut sink, false, true, &SolvedDirections::default())
            .unwrap();

        assert_eq!(second.reused.len(), 2);
        assert_eq!(first.tallies.len(), 2);
        assert_eq!(second.tallies, first.tallies);
    }

    #[test]
    fn without_segments_no_tallies() {
        let fx = Fixture::new(false);
        let engine = fx.engine();
        let origins = engine.snap_businesses(&fx.biz);
        let dir = tmp();
        let mut sink = CsvSink::new(dir.path()).unwrap();

        let out = run_directions(&engine, &fx.sets, &origins, &mut sink, false, false, &SolvedDirections::default())
            .unwrap();
        assert!(out.tallies.is_empty());
    }
}
