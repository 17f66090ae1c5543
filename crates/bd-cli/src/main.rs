//! bridge-detour: detour impact of weight-restricted bridges on freight routes.
//!
//! Run with `--help` for the input layout and flags.
//!
//! ```sh
//! bridge-detour -i data/ -o out/ --segments
//! RUST_LOG=bd_detour=debug bridge-detour -i data/ -o out/ --fresh
//! ```

mod cli;
mod run;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use bd_core::{BridgeId, Direction};
use bd_detour::{BridgeMetrics, DetourEngine, LogProgress, aggregate_bridges, aggregate_segments};
use bd_network::{BridgeIndex, CsvProvider, DijkstraSolver, NetworkProvider};
use bd_output::{CsvSink, ResultSink};

use cli::Cli;
use run::{DirectionResults, run_directions};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── 1. Logging ────────────────────────────────────────────────────────
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();

    // ── 2. Configuration ──────────────────────────────────────────────────
    let config = cli.analysis_config()?;

    // ── 3. Worker pool ────────────────────────────────────────────────────
    let mut pool = rayon::ThreadPoolBuilder::new();
    if let Some(n) = config.num_threads {
        pool = pool.num_threads(n);
    }
    pool.build_global().context("configuring worker threads")?;
    info!("using {} worker threads", rayon::current_num_threads());

    // ── 4. Inputs ─────────────────────────────────────────────────────────
    let provider = CsvProvider::new(&cli.input);
    let network = provider.load_network(&config).context("loading road network")?;
    let all_sets = provider.list_destination_sets().context("loading destinations")?;
    let bridges = provider.list_bridges().context("loading bridges")?;
    // Intensity is spread over every destination set in the input, whether
    // or not the direction filter selects it.
    let direction_count = all_sets.len();
    let businesses: Vec<_> = provider
        .list_businesses()
        .context("loading businesses")?
        .into_iter()
        .map(|b| b.divide_intensity(direction_count))
        .collect();
    info!(
        "{} businesses, {} bridges, {} destination sets",
        businesses.len(),
        bridges.len(),
        all_sets.len()
    );

    for wanted in &config.directions {
        if !all_sets.iter().any(|s| &s.direction == wanted) {
            warn!("direction {wanted} has no destination set; ignored");
        }
    }
    let sets: Vec<_> = all_sets
        .into_iter()
        .filter(|s| config.includes_direction(&s.direction))
        .collect();
    let directions: Vec<Direction> = sets.iter().map(|s| s.direction.clone()).collect();

    // ── 5. Engine and sink ────────────────────────────────────────────────
    let index = BridgeIndex::build(&network, &bridges, config.proximity_tolerance);
    let on_network = (0..index.len()).filter(|&i| !index.edges_near(i).is_empty()).count();
    info!("{on_network} of {} bridges lie on the network", index.len());
    let engine = DetourEngine::new(&network, &index, DijkstraSolver, &config);
    let origins = engine.snap_businesses(&businesses);
    if origins.len() < businesses.len() {
        warn!("{} businesses could not be snapped", businesses.len() - origins.len());
    }

    let mut sink = open_sink(&cli)?;
    let progress = LogProgress::new(config.progress_interval);

    // ── 6. Directions ─────────────────────────────────────────────────────
    let DirectionResults { records, tallies, .. } = run_directions(
        &engine,
        &sets,
        &origins,
        &mut *sink,
        cli.fresh,
        config.calculate_network_segments,
        &progress,
    )?;

    // ── 7. Aggregation ────────────────────────────────────────────────────
    let metrics = aggregate_bridges(&bridges, &directions, &records)?;
    sink.write_bridge_metrics(&metrics)?;

    if config.calculate_network_segments {
        let segments = aggregate_segments(&network, &tallies);
        sink.write_segment_metrics(&segments)?;
    }
    sink.finish()?;

    // ── 8. Summary ────────────────────────────────────────────────────────
    info!("done: {} detour records over {} directions", records.len(), directions.len());
    if let Some((bridge, time)) = heaviest_bridge(&metrics) {
        info!("largest job-weighted detour time: bridge {bridge} at {time:.2}");
    }
    Ok(())
}

fn open_sink(cli: &Cli) -> Result<Box<dyn ResultSink>> {
    if cli.sqlite {
        #[cfg(feature = "sqlite")]
        {
            let sink = bd_output::SqliteSink::new(&cli.output)
                .with_context(|| format!("opening database in {}", cli.output.display()))?;
            return Ok(Box::new(sink));
        }
        #[cfg(not(feature = "sqlite"))]
        anyhow::bail!("--sqlite needs a build with the `sqlite` feature");
    }
    let sink = CsvSink::new(&cli.output)
        .with_context(|| format!("creating output directory {}", cli.output.display()))?;
    Ok(Box::new(sink))
}

/// Bridge with the largest total job-weighted detour time, if any detoured.
fn heaviest_bridge(metrics: &BTreeMap<BridgeId, BridgeMetrics>) -> Option<(&BridgeId, f64)> {
    metrics
        .iter()
        .map(|(id, m)| (id, m.total.job_detour_time))
        .filter(|&(_, t)| t > 0.0)
        .max_by(|a, b| a.1.total_cmp(&b.1))
}
